use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::capture::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LoopError, LoopResult};
use crate::render::backend::FrameRGBA;

struct Attached {
    sink: Box<dyn FrameSink>,
    next: FrameIndex,
}

/// Broadcast point between the animation loop and an optional capture sink.
///
/// The loop publishes every presented frame whether or not anything is attached. A sink that
/// fails is detached so the animation keeps running.
#[derive(Clone, Default)]
pub struct FrameTap {
    slot: Arc<Mutex<Option<Attached>>>,
}

impl std::fmt::Debug for FrameTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTap")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl FrameTap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Attached>> {
        // A panic while holding the lock leaves at worst a half-fed sink; keep going.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// Start `sink` and route subsequent frames to it.
    pub fn attach(&self, mut sink: Box<dyn FrameSink>, cfg: SinkConfig) -> LoopResult<()> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(LoopError::encode("a capture sink is already attached"));
        }
        sink.begin(cfg)?;
        debug!(width = cfg.width, height = cfg.height, "capture sink attached");
        *slot = Some(Attached {
            sink,
            next: FrameIndex(0),
        });
        Ok(())
    }

    /// Remove the attached sink without finalizing it.
    pub fn detach(&self) -> Option<Box<dyn FrameSink>> {
        self.lock().take().map(|a| a.sink)
    }

    /// Remove the attached sink and finalize it. Returns `false` when nothing was attached.
    pub fn finish(&self) -> LoopResult<bool> {
        match self.detach() {
            Some(mut sink) => {
                sink.end()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Hand `frame` to the attached sink, if any.
    pub fn publish(&self, frame: &FrameRGBA) {
        let mut slot = self.lock();
        let Some(attached) = slot.as_mut() else {
            return;
        };
        let idx = attached.next;
        match attached.sink.push_frame(idx, frame) {
            Ok(()) => attached.next = idx.next(),
            Err(err) => {
                warn!(error = %err, frame = idx.0, "capture sink failed, detaching");
                if let Some(mut failed) = slot.take()
                    && let Err(err) = failed.sink.end()
                {
                    warn!(error = %err, "failed to finalize detached capture sink");
                }
            }
        }
    }
}
