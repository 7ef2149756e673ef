//! Recording of presented frames into a video file.

pub mod ffmpeg;
pub mod recorder;
pub mod sink;
pub mod tap;
