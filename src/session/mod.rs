//! Frame-driven animation: scheduling, config hand-off and the per-tick pipeline.

pub mod animation;
pub mod scheduler;
