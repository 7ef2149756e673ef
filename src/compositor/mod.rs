//! Per-frame scroll loop: offset accumulation, tiling and the paint sequence.

pub mod frame;
pub mod scroll;
