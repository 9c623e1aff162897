//! Reduction of an activation volume to rows of glyphs.
//!
//! The pipeline is mean over channels -> min-max normalization -> linear
//! indexing into the ramp. The degenerate case of a uniform activation map
//! (a blank input drives every cell to the same value) is caught as a typed
//! error by [`normalize`] and resolved here by filling the map with 0.5, so
//! the whole output collapses to the mid-ramp glyph instead of dividing by
//! zero.

use crate::{ramp::Ramp, render_errors::RenderError, RenderResult};
use log::warn;
use ml::{models::InternalDataRepresentation, ImagePrecision};
use ndarray::*;

/// Reduces a (channels, height, width) activation volume to a single-channel
/// intensity map by arithmetic mean over the channel axis.
pub fn intensity_map(
    volume: &InternalDataRepresentation,
) -> RenderResult<Array2<ImagePrecision>> {
    volume.mean_axis(Axis(0)).ok_or(RenderError::EmptyVolume)
}

/// Min-max normalizes the map into [0, 1].
///
/// Maps whose values span less than `f32::EPSILON` are uniform for our
/// purposes; normalizing them is undefined and reported as
/// [`RenderError::DegenerateNormalization`] rather than silently producing
/// NaN cells.
pub fn normalize(map: &Array2<ImagePrecision>) -> RenderResult<Array2<ImagePrecision>> {
    let min_val = map.fold(f32::INFINITY, |m, &v| m.min(v));
    let max_val = map.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let range = max_val - min_val;

    if !range.is_finite() || range <= f32::EPSILON {
        return Err(RenderError::DegenerateNormalization);
    }
    Ok(map.mapv(|v| (v - min_val) / range))
}

/// Renders an activation volume as ASCII art with the given ramp.
///
/// One text row per map row, rows joined with newlines, trailing whitespace
/// stripped from the final result. Pure function: identical inputs yield
/// identical text.
pub fn render(volume: &InternalDataRepresentation, ramp: &Ramp) -> RenderResult<String> {
    let map = intensity_map(volume)?;
    let normalized = match normalize(&map) {
        Ok(n) => n,
        Err(RenderError::DegenerateNormalization) => {
            warn!("activation map is uniform, falling back to the mid-ramp glyph");
            Array::from_elem(map.raw_dim(), 0.5)
        }
        Err(e) => return Err(e),
    };

    let (height, width) = normalized.dim();
    let mut text = String::with_capacity(height * (width + 1));
    for row in normalized.outer_iter() {
        for &value in row.iter() {
            text.push(ramp.glyph_for(value));
        }
        text.push('\n');
    }
    Ok(text.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_volume(channels: usize, height: usize, width: usize) -> InternalDataRepresentation {
        Array::from_shape_fn((channels, height, width), |(c, i, j)| {
            (c + i * width + j) as f32
        })
    }

    #[test]
    fn test_intensity_map_is_channel_mean() {
        let volume = array![[[0., 2.], [4., 6.]], [[2., 4.], [6., 8.]]];
        let map = intensity_map(&volume).unwrap();
        assert_eq!(map, array![[1., 3.], [5., 7.]]);
    }

    #[test]
    fn test_intensity_map_rejects_zero_channels() {
        let volume: InternalDataRepresentation = Array::zeros((0, 2, 2));
        assert_eq!(
            intensity_map(&volume).unwrap_err(),
            RenderError::EmptyVolume
        );
    }

    #[test]
    fn test_normalize_spans_unit_interval() {
        let map = array![[2., 4.], [6., 10.]];
        let normalized = normalize(&map).unwrap();
        assert_eq!(normalized, array![[0., 0.25], [0.5, 1.]]);
    }

    #[test]
    fn test_normalize_uniform_map_is_degenerate() {
        let map = Array2::from_elem((3, 3), 1.5);
        assert_eq!(
            normalize(&map).unwrap_err(),
            RenderError::DegenerateNormalization
        );
    }

    #[test]
    fn test_render_output_shape() {
        let volume = gradient_volume(2, 3, 5);
        let ramp = Ramp::new("0123456789").unwrap();
        let text = render(&volume, &ramp).unwrap();

        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert_eq!(line.chars().count(), 5);
        }
    }

    #[test]
    fn test_render_only_emits_ramp_glyphs() {
        let volume = gradient_volume(3, 4, 4);
        let ramp = Ramp::new(".:x@").unwrap();
        let text = render(&volume, &ramp).unwrap();

        for c in text.chars().filter(|&c| c != '\n') {
            assert!(".:x@".contains(c), "unexpected glyph {:?}", c);
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let volume = gradient_volume(2, 4, 6);
        let ramp = Ramp::new(crate::LIGHT_BACKGROUND_RAMP).unwrap();
        assert_eq!(
            render(&volume, &ramp).unwrap(),
            render(&volume, &ramp).unwrap()
        );
    }

    #[test]
    fn test_render_uniform_volume_uses_mid_ramp_glyph() {
        let volume = Array::from_elem((4, 2, 3), 7.0);
        let ramp = Ramp::new(crate::LIGHT_BACKGROUND_RAMP).unwrap();
        let text = render(&volume, &ramp).unwrap();

        // floor(0.5 * 9) = 4 -> '='
        assert_eq!(text, "===\n===");
    }

    #[test]
    fn test_render_single_column() {
        let volume = Array::from_shape_vec((1, 3, 1), vec![0., 1., 2.]).unwrap();
        let ramp = Ramp::new("ab").unwrap();
        let text = render(&volume, &ramp).unwrap();
        assert_eq!(text, "a\na\nb");
    }

    #[test]
    fn test_render_extremes_hit_ramp_ends() {
        let volume = Array::from_shape_vec((1, 1, 2), vec![-5., 5.]).unwrap();
        let ramp = Ramp::new("0123456789").unwrap();
        assert_eq!(render(&volume, &ramp).unwrap(), "09");
    }
}
