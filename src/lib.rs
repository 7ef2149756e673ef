#![forbid(unsafe_code)]
//! `loopline` renders text that scrolls horizontally forever without a visible seam.
//!
//! The render core is split in two:
//! - [`layout`] turns a [`RenderConfig`] into line placement and the width of one repeating
//!   unit.
//! - [`compositor`] advances the scroll offset each tick, wrapping it by exactly one unit,
//!   and paints every visible copy of the text block onto a [`Surface`].
//!
//! Around it sit a CPU raster surface ([`CpuSurface`]), a frame-driven session
//! ([`AnimationLoop`]), video capture ([`Recorder`]) and a phrase suggestion client.

pub mod capture;
pub mod compositor;
pub mod config;
pub mod foundation;
pub mod layout;
pub mod render;
pub mod session;
pub mod suggest;
pub mod text;

pub use capture::ffmpeg::{CaptureCodec, FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use capture::recorder::Recorder;
pub use capture::sink::{FrameSink, InMemorySink, SinkConfig};
pub use capture::tap::FrameTap;
pub use compositor::frame::{
    OUTLINE_STROKE_WIDTH, PaintMode, PaintStyle, Shadow, Surface, render_frame,
};
pub use compositor::scroll::{ScrollState, advance_offset, repetitions};
pub use config::model::{Direction, RenderConfig, TextTransform};
pub use config::presets::{FONTS, FontPreset, font_by_name};
pub use foundation::color::Color;
pub use foundation::core::{Fps, FrameIndex, SurfaceDesc};
pub use foundation::error::{LoopError, LoopResult};
pub use layout::metrics::{
    FALLBACK_UNIT_WIDTH, FixedAdvanceMeasurer, LayoutResult, TextMeasurer, TextStyle,
    compute_layout,
};
pub use render::backend::FrameRGBA;
pub use render::cpu::CpuSurface;
pub use render::recording::{RecordingSurface, SurfaceCommand};
pub use session::animation::{AnimationLoop, ConfigInbox, LoopHandle, RunStats, spawn_loop};
pub use session::scheduler::{CancelToken, CountedTicker, IntervalTicker, Ticker};
pub use suggest::client::{
    FALLBACK_PHRASES, GeminiSuggester, Mood, PendingSuggestion, PhraseSuggester,
    SuggestionRequest, apply_first_phrase, request_in_background, suggest_or_fallback,
};
pub use text::engine::TextEngine;
