//! Render configuration supplied by the settings boundary.
//!
//! A [`RenderConfig`] is replaced as a whole object; the render core only ever reads it.

pub mod model;
pub mod presets;
