//! Surface implementations.
//!
//! [`recording::RecordingSurface`] captures paint commands without rasterizing;
//! [`cpu::CpuSurface`] rasterizes with `vello_cpu` and hands out RGBA8 frames.

pub mod backend;
pub(crate) mod blur;
pub(crate) mod composite;
pub mod cpu;
pub mod recording;
