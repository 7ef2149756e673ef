use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use tracing::{info, warn};

use crate::capture::ffmpeg::{CaptureCodec, FfmpegSink, FfmpegSinkOpts};
use crate::capture::sink::{FrameSink, SinkConfig};
use crate::capture::tap::FrameTap;
use crate::foundation::error::LoopResult;

/// Builds the sink for one recording writing to the given path.
pub type SinkFactory = Box<dyn Fn(&Path, CaptureCodec) -> Box<dyn FrameSink> + Send>;

struct Active {
    partial: PathBuf,
}

/// Start/stop control over capturing a running loop into a file.
///
/// While active, every frame the loop publishes is encoded into a partial file in `out_dir`.
/// Stopping finalizes the encoder and renames the result to `infinity-loop-<unix millis>.<ext>`.
pub struct Recorder {
    tap: FrameTap,
    out_dir: PathBuf,
    codec: CaptureCodec,
    make_sink: SinkFactory,
    active: Option<Active>,
}

impl Recorder {
    /// Recorder backed by the system `ffmpeg`, using the best codec it offers.
    pub fn new(tap: FrameTap, out_dir: impl Into<PathBuf>) -> Self {
        Self::with_sink_factory(
            tap,
            out_dir,
            CaptureCodec::detect(),
            Box::new(|path, codec| Box::new(FfmpegSink::new(FfmpegSinkOpts::new(path, codec)))),
        )
    }

    pub fn with_sink_factory(
        tap: FrameTap,
        out_dir: impl Into<PathBuf>,
        codec: CaptureCodec,
        make_sink: SinkFactory,
    ) -> Self {
        Self {
            tap,
            out_dir: out_dir.into(),
            codec,
            make_sink,
            active: None,
        }
    }

    /// Override the detected codec. Ignored while a recording is active.
    pub fn with_codec(mut self, codec: CaptureCodec) -> Self {
        if self.active.is_none() {
            self.codec = codec;
        }
        self
    }

    pub fn codec(&self) -> CaptureCodec {
        self.codec
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Begin capturing. Returns `false` without side effects when already recording.
    pub fn start(&mut self, cfg: SinkConfig) -> LoopResult<bool> {
        if self.active.is_some() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.out_dir).with_context(|| {
            format!(
                "failed to create recording directory '{}'",
                self.out_dir.display()
            )
        })?;
        let partial = self.out_dir.join(format!(
            ".infinity-loop-{}.partial.{}",
            unix_millis(),
            self.codec.extension()
        ));
        let sink = (self.make_sink)(&partial, self.codec);
        self.tap.attach(sink, cfg)?;
        info!(path = %partial.display(), "recording started");
        self.active = Some(Active { partial });
        Ok(true)
    }

    /// Finish capturing and return the final file. Returns `None` when not recording.
    ///
    /// When the sink already failed mid-recording (and was detached), whatever was written
    /// to the partial file is still kept.
    pub fn stop(&mut self) -> LoopResult<Option<PathBuf>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        if !self.tap.finish()? {
            warn!("capture sink was detached before stop");
        }
        if !active.partial.exists() {
            warn!(path = %active.partial.display(), "recording produced no file");
            return Ok(None);
        }
        let path = self.out_dir.join(format!(
            "infinity-loop-{}.{}",
            unix_millis(),
            self.codec.extension()
        ));
        std::fs::rename(&active.partial, &path).with_context(|| {
            format!(
                "failed to move '{}' to '{}'",
                active.partial.display(),
                path.display()
            )
        })?;
        info!(path = %path.display(), "recording saved");
        Ok(Some(path))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.active.is_some()
            && let Err(err) = self.stop()
        {
            warn!(error = %err, "failed to finalize recording on drop");
        }
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Fps, FrameIndex};
    use crate::foundation::error::LoopError;
    use crate::render::backend::FrameRGBA;
    use std::io::Write as _;

    /// Writes one byte per frame to the target path.
    struct ByteSink {
        path: PathBuf,
        file: Option<std::fs::File>,
    }

    impl FrameSink for ByteSink {
        fn begin(&mut self, _cfg: SinkConfig) -> LoopResult<()> {
            self.file = Some(std::fs::File::create(&self.path).map_err(anyhow::Error::from)?);
            Ok(())
        }

        fn push_frame(&mut self, _idx: FrameIndex, _frame: &FrameRGBA) -> LoopResult<()> {
            let file = self
                .file
                .as_mut()
                .ok_or_else(|| LoopError::encode("not started"))?;
            file.write_all(&[1]).map_err(anyhow::Error::from)?;
            Ok(())
        }

        fn end(&mut self) -> LoopResult<()> {
            self.file = None;
            Ok(())
        }
    }

    fn recorder(tap: FrameTap, dir: &Path) -> Recorder {
        Recorder::with_sink_factory(
            tap,
            dir,
            CaptureCodec::Vp9Webm,
            Box::new(|path, _| {
                Box::new(ByteSink {
                    path: path.to_path_buf(),
                    file: None,
                })
            }),
        )
    }

    fn cfg() -> SinkConfig {
        SinkConfig {
            width: 1,
            height: 1,
            fps: Fps::default(),
        }
    }

    fn frame() -> FrameRGBA {
        FrameRGBA {
            width: 1,
            height: 1,
            data: vec![0, 0, 0, 255],
            premultiplied: true,
        }
    }

    #[test]
    fn codec_override_changes_extension() {
        let dir = tempfile::tempdir().unwrap();
        let tap = FrameTap::new();
        let mut rec = recorder(tap.clone(), dir.path()).with_codec(CaptureCodec::H264Mp4);
        rec.start(cfg()).unwrap();
        tap.publish(&frame());
        let path = rec.stop().unwrap().unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = recorder(FrameTap::new(), dir.path());
        assert_eq!(rec.stop().unwrap(), None);
    }

    #[test]
    fn start_twice_keeps_the_first_recording() {
        let dir = tempfile::tempdir().unwrap();
        let tap = FrameTap::new();
        let mut rec = recorder(tap.clone(), dir.path());
        assert!(rec.start(cfg()).unwrap());
        assert!(!rec.start(cfg()).unwrap());
        assert!(rec.is_recording());
    }

    #[test]
    fn stop_saves_named_file_with_all_frames() {
        let dir = tempfile::tempdir().unwrap();
        let tap = FrameTap::new();
        let mut rec = recorder(tap.clone(), dir.path());
        rec.start(cfg()).unwrap();
        for _ in 0..5 {
            tap.publish(&frame());
        }
        let path = rec.stop().unwrap().expect("saved file");
        assert!(!rec.is_recording());
        assert!(!tap.is_attached());

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("infinity-loop-"), "{name}");
        assert!(name.ends_with(".webm"), "{name}");
        let millis = &name["infinity-loop-".len()..name.len() - ".webm".len()];
        assert!(millis.parse::<u128>().is_ok(), "{name}");
        assert_eq!(std::fs::read(&path).unwrap().len(), 5);

        // Only the final file remains.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn frames_outside_a_recording_are_not_captured() {
        let dir = tempfile::tempdir().unwrap();
        let tap = FrameTap::new();
        let mut rec = recorder(tap.clone(), dir.path());
        tap.publish(&frame());
        rec.start(cfg()).unwrap();
        tap.publish(&frame());
        let path = rec.stop().unwrap().unwrap();
        tap.publish(&frame());
        assert_eq!(std::fs::read(path).unwrap().len(), 1);
    }
}
