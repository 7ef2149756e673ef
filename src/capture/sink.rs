use std::sync::{Arc, Mutex};

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LoopError, LoopResult};
use crate::render::backend::FrameRGBA;

/// Configuration handed to a [`FrameSink`] when a capture starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Frame width in physical pixels.
    pub width: u32,
    /// Frame height in physical pixels.
    pub height: u32,
    pub fps: Fps,
}

/// Consumer of presented frames.
///
/// `push_frame` is called with strictly increasing indices between `begin` and `end`.
pub trait FrameSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> LoopResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LoopResult<()>;
    fn end(&mut self) -> LoopResult<()>;
}

/// Lets a caller keep a handle on a sink after giving it to a tap.
impl<S: FrameSink> FrameSink for Arc<Mutex<S>> {
    fn begin(&mut self, cfg: SinkConfig) -> LoopResult<()> {
        lock_sink(self)?.begin(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LoopResult<()> {
        lock_sink(self)?.push_frame(idx, frame)
    }

    fn end(&mut self) -> LoopResult<()> {
        lock_sink(self)?.end()
    }
}

fn lock_sink<S>(sink: &Mutex<S>) -> LoopResult<std::sync::MutexGuard<'_, S>> {
    sink.lock()
        .map_err(|_| LoopError::encode("frame sink lock poisoned"))
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> LoopResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LoopResult<()> {
        if self.cfg.is_none() {
            return Err(LoopError::encode("in-memory sink not started"));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> LoopResult<()> {
        self.ended = true;
        Ok(())
    }
}
