//! Captures the activation volume of a single layer out of a forward pass.
//!
//! This is the moral equivalent of a forward hook on the pretrained network,
//! reworked as a scoped observation: the capture buffer is a local of
//! [`extract`] and the observer is dropped when the call returns, so nothing
//! stays attached to the network afterwards and concurrent callers sharing
//! one network cannot see each other's captures.

use crate::models::{FeatureModel, InternalDataRepresentation};
use log::debug;
use thiserror::Error;

pub type ExtractionResult<T> = Result<T, FeatureCaptureError>;

#[derive(Error, Debug)]
pub enum FeatureCaptureError {
    #[error("Layer {index} never produced an activation ({layers_run} layers ran)")]
    TapNeverFired { index: usize, layers_run: usize },
}

/// Runs one inference-only forward pass and returns the activation volume
/// the layer at `layer_index` produced.
///
/// The pass always runs to the end of the (loaded prefix of the) network;
/// activations past the requested layer are computed and dropped. If the
/// requested layer never ran, e.g. because the index lies beyond the loaded
/// stack, a [`FeatureCaptureError`] reports how deep the pass actually went.
pub fn extract<M: FeatureModel + ?Sized>(
    network: &M,
    input: &InternalDataRepresentation,
    layer_index: usize,
) -> ExtractionResult<InternalDataRepresentation> {
    let mut captured: Option<InternalDataRepresentation> = None;
    let mut layers_run = 0;

    network.forward_observed(input, &mut |index, activation| {
        layers_run = layers_run.max(index + 1);
        if index == layer_index && captured.is_none() {
            debug!(
                "captured activation volume of shape {:?} at layer {}",
                activation.dim(),
                index
            );
            captured = Some(activation.clone());
        }
    });

    captured.ok_or(FeatureCaptureError::TapNeverFired {
        index: layer_index,
        layers_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation_functions::ReluLayer;
    use crate::models::{FeatureLayer, VggFeatures};
    use convolutions_rs::convolutions::ConvolutionLayer;
    use convolutions_rs::Padding;
    use ndarray::Array;

    fn two_layer_net() -> VggFeatures {
        // 1x1 convolution negating its single input channel, then ReLU.
        let kernel = Array::from_elem((1, 1, 1, 1), -1.0);
        VggFeatures::from_layers(vec![
            FeatureLayer::Conv(ConvolutionLayer::new(kernel, None, 1, Padding::Valid)),
            FeatureLayer::Relu(ReluLayer::new()),
        ])
    }

    #[test]
    fn test_extract_captures_requested_layer() {
        let net = two_layer_net();
        let input = Array::from_elem((1, 2, 3), 2.0);

        // Pre-activation output of the convolution.
        let conv_out = extract(&net, &input, 0).unwrap();
        assert_eq!(conv_out, Array::from_elem((1, 2, 3), -2.0));

        // Post-ReLU everything is clamped to zero.
        let relu_out = extract(&net, &input, 1).unwrap();
        assert_eq!(relu_out, Array::<f32, _>::zeros((1, 2, 3)));
    }

    #[test]
    fn test_extract_out_of_range_layer() {
        let net = two_layer_net();
        let input = Array::from_elem((1, 2, 2), 1.0);

        let err = extract(&net, &input, 7).unwrap_err();
        match err {
            FeatureCaptureError::TapNeverFired { index, layers_run } => {
                assert_eq!(index, 7);
                assert_eq!(layers_run, 2);
            }
        }
    }

    #[test]
    fn test_extract_is_reentrant() {
        let net = two_layer_net();
        let input = Array::from_elem((1, 3, 3), 1.5);

        // No capture state survives a call; repeated extraction from the
        // same shared network yields identical volumes.
        let first = extract(&net, &input, 0).unwrap();
        let second = extract(&net, &input, 0).unwrap();
        assert_eq!(first, second);

        // A failed extraction leaves the network just as clean.
        assert!(extract(&net, &input, 9).is_err());
        let third = extract(&net, &input, 0).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_extract_last_layer_matches_forward_pass() {
        let net = two_layer_net();
        let input = Array::from_elem((1, 2, 2), -3.0);

        let tail = extract(&net, &input, 1).unwrap();
        assert_eq!(tail, net.forward_pass(&input));
    }
}
