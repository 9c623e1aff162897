use crate::models::InternalDataRepresentation;
use ndarray::*;

/// Rust implementation of a 2d max pooling layer.
/// Pools every channel independently over non-overlapping (or strided)
/// square windows, flooring the output size like the pretrained network does.
pub struct MaxPoolLayer {
    size: usize,
    stride: usize,
}

impl MaxPoolLayer {
    pub fn new(size: usize, stride: usize) -> MaxPoolLayer {
        debug_assert!(size > 0, "Pool window of 0 passed");
        debug_assert!(stride > 0, "Stride of 0 passed");
        MaxPoolLayer { size, stride }
    }

    /// Performs max pooling on the given activation data.
    /// We expect the data in Pytorch layout (channels, height, width).
    pub fn pool(&self, x: &InternalDataRepresentation) -> InternalDataRepresentation {
        let num_channels = x.len_of(Axis(0));
        let height = x.len_of(Axis(1));
        let width = x.len_of(Axis(2));

        // Inputs smaller than the window pool down to nothing.
        let new_height = if height >= self.size {
            (height - self.size) / self.stride + 1
        } else {
            0
        };
        let new_width = if width >= self.size {
            (width - self.size) / self.stride + 1
        } else {
            0
        };

        let mut out: InternalDataRepresentation =
            Array::zeros((num_channels, new_height, new_width));

        for c in 0..num_channels {
            for i in 0..new_height {
                let i_with_stride = i * self.stride;
                for j in 0..new_width {
                    let j_with_stride = j * self.stride;
                    let window = x.slice(s![
                        c,
                        i_with_stride..(i_with_stride + self.size),
                        j_with_stride..(j_with_stride + self.size)
                    ]);
                    out[[c, i, j]] = window.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_pool_2x2() {
        let x = array![[
            [1., 2., 5., 6.],
            [3., 4., 7., 8.],
            [-1., -2., 0., 0.],
            [-3., -4., 0., 9.]
        ]];
        let pool = MaxPoolLayer::new(2, 2);
        assert_eq!(pool.pool(&x), array![[[4., 8.], [-1., 9.]]]);
    }

    #[test]
    fn test_max_pool_floors_odd_inputs() {
        let x = Array::from_shape_vec((2, 5, 3), (0..30).map(|v| v as f32).collect()).unwrap();
        let pool = MaxPoolLayer::new(2, 2);
        let pooled = pool.pool(&x);
        assert_eq!(pooled.dim(), (2, 2, 1));
        // Last row and column are dropped, so the window maxima sit on row ends.
        assert_eq!(pooled[[0, 0, 0]], 4.);
        assert_eq!(pooled[[0, 1, 0]], 10.);
    }

    #[test]
    fn test_max_pool_window_larger_than_input() {
        let x = Array::zeros((1, 1, 1));
        let pool = MaxPoolLayer::new(2, 2);
        assert_eq!(pool.pool(&x).dim(), (1, 0, 0));
    }
}
