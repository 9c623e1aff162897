//! Activation functions for the feature stack. The pretrained network we
//! mirror only interleaves its convolutions with ReLU, so that is all that
//! lives here.
//!
//! The activation is exposed as a layer as well as a free function.
use ndarray::*;

use crate::{models::InternalDataRepresentation, ImagePrecision};

/// Relu implementation
pub fn relu<D: Dimension>(data: &Array<ImagePrecision, D>) -> Array<ImagePrecision, D> {
    data.mapv(|x| if x > 0. { x } else { 0. })
}

/// Relu implementation.
pub struct ReluLayer {}

impl ReluLayer {
    pub fn new() -> Self {
        Self {}
    }

    pub fn activate(&self, x: &InternalDataRepresentation) -> InternalDataRepresentation {
        x.map(|a| a.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu() {
        let x = Array::from_shape_vec((1, 2, 2), vec![1., -2., 3., -4.]).unwrap();
        let out = Array::from_shape_vec((1, 2, 2), vec![1., 0., 3., 0.]).unwrap();
        let relu_layer = ReluLayer::new();
        assert_eq!(relu_layer.activate(&x), out);
    }

    #[test]
    fn test_relu_free_function() {
        let x = array![[-1., 0.5], [2., -0.]];
        assert_eq!(relu(&x), array![[0., 0.5], [2., 0.]]);
    }
}
