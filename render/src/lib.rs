//! This crate turns captured activation volumes into ASCII art.
//!
//! For this purpose it provides the character ramp abstraction together with
//! the channel reduction, normalization and glyph-mapping steps under the
//! "renderer" module. Everything here is a pure function of its inputs.

pub mod ramp;
pub mod render_errors;
pub mod renderer;

pub use ramp::{Ramp, DARK_BACKGROUND_RAMP, LIGHT_BACKGROUND_RAMP};
pub use render_errors::RenderError;
pub use renderer::{intensity_map, normalize, render};

/// Returned from the renderer, as rendering might fail
pub type RenderResult<T> = std::result::Result<T, render_errors::RenderError>;
