use crate::{render_errors::RenderError, RenderResult};
use log::warn;

/// Preset ramp for light backgrounds: dark pixels come out as blanks.
pub const LIGHT_BACKGROUND_RAMP: &str = " .:-=+*#%@";
/// Preset ramp for dark backgrounds: dark pixels come out as heavy glyphs.
pub const DARK_BACKGROUND_RAMP: &str = "@%#*+=:. ";

/// An ordered sequence of glyphs representing an intensity gradient.
/// Low intensity maps to the first glyph, high intensity to the last.
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    glyphs: Vec<char>,
}

impl Ramp {
    /// Validates and builds a ramp from the given characters.
    /// A ramp needs at least one glyph; with fewer than two the output
    /// carries no gradient, which we allow but warn about.
    pub fn new(ramp: &str) -> RenderResult<Ramp> {
        let glyphs: Vec<char> = ramp.chars().collect();
        if glyphs.is_empty() {
            return Err(RenderError::EmptyRamp);
        }
        if glyphs.len() < 2 {
            warn!(
                "ramp {:?} has a single glyph, output will show no gradient",
                ramp
            );
        }
        Ok(Ramp { glyphs })
    }

    /// Returns the preset ramp for the given background mode.
    pub fn for_mode(dark_background: bool) -> Ramp {
        let preset = if dark_background {
            DARK_BACKGROUND_RAMP
        } else {
            LIGHT_BACKGROUND_RAMP
        };
        Ramp {
            glyphs: preset.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Maps a normalized intensity to a glyph by linear index.
    /// The intensity is clamped to [0, 1] and the index to the ramp bounds,
    /// which also guards values of exactly 1.0 against falling off the end.
    pub fn glyph_for(&self, intensity: f32) -> char {
        let clamped = intensity.max(0.0).min(1.0);
        let index = (clamped * (self.glyphs.len() - 1) as f32).floor() as usize;
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }
}
