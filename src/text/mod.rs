//! Font resolution and shaping via `parley`.

pub mod engine;
