use crate::{
    activation_functions::ReluLayer,
    pooling::MaxPoolLayer,
    weight_loader::{WeightError, WeightLoader},
    ImagePrecision,
};
use convolutions_rs::convolutions::ConvolutionLayer;
use convolutions_rs::Padding;
use log::debug;
use ndarray::*;

/// Activations are passed between layers in Pytorch layout
/// (channels, height, width), matching the order in which the
/// pretrained weights were exported.
pub type InternalDataRepresentation = Array3<ImagePrecision>;

/// General model trait for networks that can run an observed forward pass.
///
/// The observer is invoked once per layer, with the layer's index and its
/// freshly produced activation, the instant the activation exists. Capture
/// state belongs to the observer (a stack-local closure), never to the
/// network, so observed passes on a shared network cannot cross-talk.
pub trait FeatureModel {
    fn forward_observed(
        &self,
        input: &InternalDataRepresentation,
        observe: &mut dyn FnMut(usize, &InternalDataRepresentation),
    ) -> InternalDataRepresentation;

    fn forward_pass(&self, input: &InternalDataRepresentation) -> InternalDataRepresentation {
        self.forward_observed(input, &mut |_, _| {})
    }
}

/// One entry of a feature-stack architecture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSpec {
    Conv {
        input_channels: usize,
        output_channels: usize,
    },
    Relu,
    MaxPool,
}

/// Architecture table of the VGG-19 feature stack, as exported from
/// torchvision (`features.{i}.weight` / `features.{i}.bias` naming).
/// All convolutions are 3x3, stride 1, same-padded, with bias; all pools
/// are 2x2 with stride 2.
pub const VGG19_FEATURES: &[LayerSpec] = &[
    LayerSpec::Conv { input_channels: 3, output_channels: 64 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 64, output_channels: 64 },
    LayerSpec::Relu,
    LayerSpec::MaxPool,
    LayerSpec::Conv { input_channels: 64, output_channels: 128 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 128, output_channels: 128 },
    LayerSpec::Relu,
    LayerSpec::MaxPool,
    LayerSpec::Conv { input_channels: 128, output_channels: 256 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 256, output_channels: 256 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 256, output_channels: 256 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 256, output_channels: 256 },
    LayerSpec::Relu,
    LayerSpec::MaxPool,
    LayerSpec::Conv { input_channels: 256, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 512, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 512, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 512, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::MaxPool,
    LayerSpec::Conv { input_channels: 512, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 512, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 512, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::Conv { input_channels: 512, output_channels: 512 },
    LayerSpec::Relu,
    LayerSpec::MaxPool,
];

/// Kernel size shared by every convolution in the table.
const VGG_KERNEL_SIZE: usize = 3;

/// A single instantiated layer of the feature stack.
pub enum FeatureLayer {
    Conv(ConvolutionLayer<ImagePrecision>),
    Relu(ReluLayer),
    MaxPool(MaxPoolLayer),
}

impl FeatureLayer {
    pub fn apply(&self, input: &InternalDataRepresentation) -> InternalDataRepresentation {
        match self {
            FeatureLayer::Conv(layer) => layer.convolve(input),
            FeatureLayer::Relu(layer) => layer.activate(input),
            FeatureLayer::MaxPool(layer) => layer.pool(input),
        }
    }
}

/// A prefix of the pretrained VGG-19 feature stack, in evaluation mode
/// (this crate has no training mode; weights are immutable after load).
///
/// Constructed once at startup and passed by reference into every pipeline
/// invocation. The struct is never mutated after construction, so it can be
/// shared freely across sequential calls.
pub struct VggFeatures {
    layers: Vec<FeatureLayer>,
}

impl VggFeatures {
    /// Builds a network directly from instantiated layers.
    /// Mostly useful for tests and synthetic stacks.
    pub fn from_layers(layers: Vec<FeatureLayer>) -> VggFeatures {
        VggFeatures { layers }
    }

    /// Loads the first `depth` entries of the VGG-19 feature table from the
    /// given weight loader. Loading only the prefix up to the layer that
    /// will be observed keeps memory proportional to what the forward pass
    /// actually uses.
    pub fn from_loader<L: WeightLoader>(
        loader: &mut L,
        depth: usize,
    ) -> Result<VggFeatures, WeightError> {
        if depth == 0 || depth > VGG19_FEATURES.len() {
            return Err(WeightError::WeightDepthError(depth, VGG19_FEATURES.len()));
        }

        let mut layers = Vec::with_capacity(depth);
        for (index, spec) in VGG19_FEATURES.iter().take(depth).enumerate() {
            let layer = match *spec {
                LayerSpec::Conv {
                    input_channels,
                    output_channels,
                } => {
                    let weight = loader.get_weight(
                        &format!("features.{}.weight", index),
                        (
                            output_channels,
                            input_channels,
                            VGG_KERNEL_SIZE,
                            VGG_KERNEL_SIZE,
                        ),
                    )?;
                    let bias =
                        loader.get_weight(&format!("features.{}.bias", index), output_channels)?;
                    debug!(
                        "loaded conv layer {} ({} -> {} channels)",
                        index, input_channels, output_channels
                    );
                    FeatureLayer::Conv(ConvolutionLayer::new(weight, Some(bias), 1, Padding::Same))
                }
                LayerSpec::Relu => FeatureLayer::Relu(ReluLayer::new()),
                LayerSpec::MaxPool => FeatureLayer::MaxPool(MaxPoolLayer::new(2, 2)),
            };
            layers.push(layer);
        }
        Ok(VggFeatures { layers })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl FeatureModel for VggFeatures {
    fn forward_observed(
        &self,
        input: &InternalDataRepresentation,
        observe: &mut dyn FnMut(usize, &InternalDataRepresentation),
    ) -> InternalDataRepresentation {
        let mut current = input.clone();
        for (index, layer) in self.layers.iter().enumerate() {
            current = layer.apply(&current);
            observe(index, &current);
        }
        current
    }
}
