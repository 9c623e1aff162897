//! This crate ties in all the parts of the project and provides a clean
//! command line interface to render images into ASCII art with a pretrained
//! convolutional network.

use env_logger::Builder;
use glyphnet::{generate_from_path, load_network, PipelineError};
use ml::models::VggFeatures;
use quicli::prelude::*;
use render::Ramp;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Renders a single image into ASCII art
#[derive(Debug, StructOpt)]
struct GenerateOpts {
    /// Path to the image (or preprocessed .npy tensor) to render
    #[structopt(parse(from_os_str))]
    image: PathBuf,
    /// Path to the npz archive with the pretrained feature weights
    #[structopt(short = "m", long = "weights", parse(from_os_str))]
    weights: PathBuf,
    /// Output path, prints to stdout if not available
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,
    /// Width of the rendered art in characters
    #[structopt(short = "w", long = "width", default_value = "120")]
    width: u32,
    /// Index of the feature layer whose activations are rendered
    #[structopt(short = "l", long = "layer", default_value = "2")]
    layer: usize,
    /// Uses the dark-background preset ramp instead of the light one
    #[structopt(short = "d", long = "dark")]
    dark: bool,
    /// Custom glyph ramp, ordered from low to high intensity
    #[structopt(short = "r", long = "ramp")]
    ramp: Option<String>,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Renders every image in a directory
#[derive(Debug, StructOpt)]
struct BatchOpts {
    /// Directory to scan for images
    #[structopt(parse(from_os_str))]
    directory: PathBuf,
    /// Path to the npz archive with the pretrained feature weights
    #[structopt(short = "m", long = "weights", parse(from_os_str))]
    weights: PathBuf,
    /// Directory for the rendered text files, defaults to the input directory
    #[structopt(short = "o", long = "output-dir", parse(from_os_str))]
    output_dir: Option<PathBuf>,
    /// Width of the rendered art in characters
    #[structopt(short = "w", long = "width", default_value = "120")]
    width: u32,
    /// Index of the feature layer whose activations are rendered
    #[structopt(short = "l", long = "layer", default_value = "2")]
    layer: usize,
    /// Uses the dark-background preset ramp instead of the light one
    #[structopt(short = "d", long = "dark")]
    dark: bool,
    /// Custom glyph ramp, ordered from low to high intensity
    #[structopt(short = "r", long = "ramp")]
    ramp: Option<String>,
    #[structopt(flatten)]
    verbosity: Verbosity,
}

/// Render images into ASCII art using a pretrained neural network.
#[derive(Debug, StructOpt)]
#[structopt(name = "Glyphnet")]
enum Glyphnet {
    #[structopt(name = "generate", about = "Renders a single image into ASCII art.")]
    Generate(GenerateOpts),
    #[structopt(
        name = "batch",
        about = "Renders every image in a directory, skipping files that cannot \
        be processed and reporting per-file results."
    )]
    Batch(BatchOpts),
}

/// Trait for the subcommands that glyphnet uses
trait GlyphnetOpts {
    /// Performs the subcommand
    fn run(&self) -> CliResult;
    /// Returns the verbosity command
    fn get_verbosity(&self) -> &Verbosity;
    /// Sets up logging
    fn setup_env_logger(&self) -> CliResult {
        let mut builder = Builder::from_default_env();

        builder
            .filter(None, self.get_verbosity().log_level().to_level_filter())
            .init();

        Ok(())
    }
}

/// Picks the preset ramp for the background mode, unless a custom ramp
/// string was given.
fn selected_ramp(custom: &Option<String>, dark: bool) -> Result<Ramp, render::RenderError> {
    match custom {
        Some(r) => Ramp::new(r),
        None => Ok(Ramp::for_mode(dark)),
    }
}

/// Output file for an input image, matching the "ASCII_<name>.txt" scheme.
fn output_file_name(image: &Path) -> PathBuf {
    let stem = image.file_stem().and_then(OsStr::to_str).unwrap_or("image");
    PathBuf::from(format!("ASCII_{}.txt", stem))
}

/// Files the batch driver picks up, by extension.
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl GlyphnetOpts for GenerateOpts {
    // Renders one image
    fn run(&self) -> CliResult {
        let network = load_network(&self.weights, self.layer)?;
        let ramp = selected_ramp(&self.ramp, self.dark)?;

        let art = generate_from_path(&network, &self.image, &ramp, self.width, self.layer)?;
        match &self.output {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(art.as_bytes())?;
            }
            None => println!("{}", art),
        }
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl BatchOpts {
    // Renders one file and writes its output; every per-image failure mode
    // surfaces through the single returned Result.
    fn process_file(
        &self,
        network: &VggFeatures,
        ramp: &Ramp,
        path: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let art = generate_from_path(network, path, ramp, self.width, self.layer)?;
        let output_path = output_dir.join(output_file_name(path));
        let mut file = File::create(&output_path)?;
        file.write_all(art.as_bytes())?;
        Ok(output_path)
    }
}

impl GlyphnetOpts for BatchOpts {
    // Renders a whole directory; one bad image never aborts the rest
    fn run(&self) -> CliResult {
        let network = load_network(&self.weights, self.layer)?;
        let ramp = selected_ramp(&self.ramp, self.dark)?;

        let output_dir = self.output_dir.as_ref().unwrap_or(&self.directory);
        fs::create_dir_all(output_dir)?;

        let mut rendered = 0;
        let mut failed = 0;
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if !is_image_file(&path) {
                continue;
            }
            let name = path
                .file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("<non-utf8 name>")
                .to_owned();
            println!("Processing '{}'...", name);

            match self.process_file(&network, &ramp, &path, output_dir) {
                Ok(output_path) => {
                    println!("Saved ASCII art to '{}'", output_path.display());
                    rendered += 1;
                }
                Err(e) => {
                    println!("Failed on '{}': {}", name, e);
                    failed += 1;
                }
            }
        }

        if rendered == 0 && failed == 0 {
            println!("No images found in '{}'.", self.directory.display());
        } else {
            println!("{} rendered, {} failed.", rendered, failed);
        }
        Ok(())
    }

    fn get_verbosity(&self) -> &Verbosity {
        &self.verbosity
    }
}

impl GlyphnetOpts for Glyphnet {
    fn run(&self) -> CliResult {
        match self {
            Glyphnet::Generate(c) => c.run(),
            Glyphnet::Batch(c) => c.run(),
        }
    }

    fn get_verbosity(&self) -> &Verbosity {
        match self {
            Glyphnet::Generate(c) => c.get_verbosity(),
            Glyphnet::Batch(c) => c.get_verbosity(),
        }
    }
}

fn main() -> CliResult {
    let args = Glyphnet::from_args();
    args.setup_env_logger()?;
    args.run()
}
