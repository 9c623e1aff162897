//! Image-side glue for the ASCII art pipeline: decoding, preprocessing and
//! the per-image generate call that strings preprocessing, feature capture
//! and rendering together.

use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView};
use log::debug;
use ml::extractor::{extract, FeatureCaptureError};
use ml::models::{InternalDataRepresentation, VggFeatures};
use ml::weight_loader::{NpzWeightLoader, WeightError};
use ndarray::Axis;
use ndarray_npy::{read_npy, ReadNpyError};
use nshare::ToNdarray3;
use render::{render, Ramp, RenderError};
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;

/// Per-channel means of the pixel distribution the pretrained network was
/// trained on.
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel standard deviations, paired with [`CHANNEL_MEAN`].
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];
/// Rendered character cells are taller than wide; scaling the row count by
/// this factor keeps the art from stretching vertically.
pub const ASPECT_CORRECTION: f32 = 0.55;

#[derive(Error, Debug)]
pub enum ImageDecodeError {
    #[error("Could not open image. Filesystem reported error\n {0}.")]
    FileError(#[from] std::io::Error),
    #[error("Could not decode image into RGB data.\n {0}.")]
    FormatError(#[from] image::ImageError),
}

/// Everything that can go wrong for a single input; the batch driver treats
/// any variant as "skip this file and move on".
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] ImageDecodeError),
    #[error(transparent)]
    Capture(#[from] FeatureCaptureError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Could not read tensor input.\n {0}.")]
    TensorError(#[from] ReadNpyError),
    #[error("Target width must be at least one character.")]
    InvalidWidth,
    #[error("Could not write output file.\n {0}.")]
    OutputError(#[from] std::io::Error),
}

/// Decodes the image at the given path.
pub fn load_image(path: &Path) -> Result<DynamicImage, ImageDecodeError> {
    let img = ImageReader::open(path)?.decode()?;
    Ok(img)
}

/// Computes the character-grid height for an image resized to
/// `target_width` columns, never less than one row.
pub fn corrected_height(original_width: u32, original_height: u32, target_width: u32) -> u32 {
    let rows = (target_width as f32 * original_height as f32 / original_width as f32
        * ASPECT_CORRECTION)
        .round() as u32;
    rows.max(1)
}

/// Resizes the image to the target character width and converts it into the
/// normalized (3, height, width) tensor the network expects.
pub fn resize_and_normalize(img: &DynamicImage, target_width: u32) -> InternalDataRepresentation {
    debug_assert!(target_width > 0, "Target width of 0 passed");

    let new_height = corrected_height(img.width(), img.height(), target_width);
    let resized = img.resize_exact(target_width, new_height, FilterType::Triangle);

    // we get the image in PT layout (C,H,W), scaled to [0,1], then shift it
    // into the distribution the weights were trained against
    let mut tensor = resized.to_rgb8().into_ndarray3().map(|x| *x as f32 / 255.0);
    for (channel, (mean, std_dev)) in CHANNEL_MEAN.iter().zip(CHANNEL_STD.iter()).enumerate() {
        let mut plane = tensor.index_axis_mut(Axis(0), channel);
        plane.mapv_inplace(|x| (x - mean) / std_dev);
    }
    tensor
}

/// Runs the full pipeline on an already decoded image.
pub fn generate(
    network: &VggFeatures,
    img: &DynamicImage,
    ramp: &Ramp,
    width: u32,
    layer_index: usize,
) -> Result<String, PipelineError> {
    if width == 0 {
        return Err(PipelineError::InvalidWidth);
    }
    let tensor = resize_and_normalize(img, width);
    let volume = extract(network, &tensor, layer_index)?;
    debug!("rendering activation volume of shape {:?}", volume.dim());
    Ok(render(&volume, ramp)?)
}

/// Runs the full pipeline on an input file.
///
/// Image files are decoded and preprocessed; a `.npy` file is taken as an
/// already preprocessed (3, height, width) tensor and fed to the network
/// as-is, ignoring `width`.
pub fn generate_from_path(
    network: &VggFeatures,
    path: &Path,
    ramp: &Ramp,
    width: u32,
    layer_index: usize,
) -> Result<String, PipelineError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("npy") => {
            let tensor: InternalDataRepresentation = read_npy(path)?;
            let volume = extract(network, &tensor, layer_index)?;
            Ok(render(&volume, ramp)?)
        }
        _ => {
            let img = load_image(path)?;
            generate(network, &img, ramp, width, layer_index)
        }
    }
}

/// Loads the feature-stack prefix needed to observe `layer_index` from an
/// npz weight archive. A failure here is fatal at startup; there are no
/// retries.
pub fn load_network(weights: &Path, layer_index: usize) -> Result<VggFeatures, WeightError> {
    let mut loader = NpzWeightLoader::from_path(weights)?;
    VggFeatures::from_loader(&mut loader, layer_index + 1)
}
