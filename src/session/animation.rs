use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::capture::tap::FrameTap;
use crate::compositor::frame::{Surface, render_frame};
use crate::compositor::scroll::ScrollState;
use crate::config::model::RenderConfig;
use crate::foundation::core::{FrameIndex, SurfaceDesc};
use crate::foundation::error::{LoopError, LoopResult};
use crate::layout::metrics::{LayoutResult, compute_layout};
use crate::session::scheduler::{CancelToken, Ticker};

#[derive(Debug, Default)]
struct Pending {
    config: Option<RenderConfig>,
    resize: Option<SurfaceDesc>,
}

/// Hand-off slot for changes made while a loop is running.
///
/// Only the latest submission of each kind is kept; the loop picks changes up at the start
/// of its next tick.
#[derive(Clone, Debug, Default)]
pub struct ConfigInbox {
    slot: Arc<Mutex<Pending>>,
}

impl ConfigInbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the whole configuration.
    pub fn submit(&self, config: RenderConfig) {
        self.lock().config = Some(config);
    }

    /// Ask the loop to re-attach its surface at a new size.
    pub fn request_resize(&self, desc: SurfaceDesc) {
        self.lock().resize = Some(desc);
    }

    pub fn take(&self) -> Option<RenderConfig> {
        self.lock().config.take()
    }

    pub fn take_resize(&self) -> Option<SurfaceDesc> {
        self.lock().resize.take()
    }
}

/// Summary of a finished [`AnimationLoop::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
}

/// One animation session: a configuration, a surface and the scroll offset between them.
///
/// The offset starts at `0` and returns to `0` whenever the configuration is replaced by a
/// different one or the surface is resized.
pub struct AnimationLoop<S: Surface> {
    surface: S,
    config: RenderConfig,
    state: ScrollState,
    last_layout: Option<LayoutResult>,
    frame: FrameIndex,
    inbox: ConfigInbox,
    tap: FrameTap,
}

impl<S: Surface> AnimationLoop<S> {
    pub fn new(config: RenderConfig, surface: S) -> Self {
        Self::with_channels(config, surface, ConfigInbox::new(), FrameTap::new())
    }

    pub fn with_channels(
        config: RenderConfig,
        surface: S,
        inbox: ConfigInbox,
        tap: FrameTap,
    ) -> Self {
        Self {
            surface,
            config,
            state: ScrollState::new(),
            last_layout: None,
            frame: FrameIndex(0),
            inbox,
            tap,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Index of the next frame to be produced.
    pub fn frame_index(&self) -> FrameIndex {
        self.frame
    }

    pub fn inbox(&self) -> ConfigInbox {
        self.inbox.clone()
    }

    pub fn tap(&self) -> FrameTap {
        self.tap.clone()
    }

    /// Layout used by the most recent tick, if any since the last restart.
    pub fn last_layout(&self) -> Option<&LayoutResult> {
        self.last_layout.as_ref()
    }

    /// Swap in a new configuration. An identical config keeps the running offset.
    pub fn set_config(&mut self, config: RenderConfig) {
        if config == self.config {
            return;
        }
        debug!(text = %config.text, speed = config.speed, "config replaced, restarting scroll");
        self.config = config;
        self.restart();
    }

    /// Re-attach the surface at a new size.
    pub fn resize(&mut self, desc: SurfaceDesc) -> LoopResult<()> {
        self.surface.resize(desc)?;
        debug!(
            width = desc.width,
            height = desc.height,
            scale = desc.scale,
            "surface resized, restarting scroll"
        );
        self.restart();
        Ok(())
    }

    fn restart(&mut self) {
        self.state = ScrollState::new();
        self.last_layout = None;
    }

    fn apply_pending(&mut self) {
        if let Some(desc) = self.inbox.take_resize()
            && let Err(err) = self.resize(desc)
        {
            warn!(error = %err, "resize rejected, keeping current surface");
        }
        if let Some(config) = self.inbox.take() {
            self.set_config(config);
        }
    }

    /// Produce one frame: pick up pending changes, lay out, paint, present, publish.
    ///
    /// Layout is measured again on every tick since metrics depend on surface state.
    pub fn tick(&mut self) -> FrameIndex {
        self.apply_pending();

        let desc = self.surface.desc();
        let layout = compute_layout(
            &self.config,
            desc.logical_width(),
            desc.logical_height(),
            &mut self.surface,
        );
        self.state = render_frame(&self.config, &layout, self.state, &mut self.surface);
        self.last_layout = Some(layout);

        if let Some(frame) = self.surface.present() {
            self.tap.publish(&frame);
        }

        let idx = self.frame;
        self.frame = idx.next();
        idx
    }

    /// Tick until `ticker` stops or `cancel` fires.
    #[tracing::instrument(skip_all)]
    pub fn run<T: Ticker + ?Sized>(&mut self, ticker: &mut T, cancel: &CancelToken) -> RunStats {
        let mut stats = RunStats::default();
        while ticker.wait_for_tick(cancel) {
            self.tick();
            stats.ticks += 1;
        }
        debug!(ticks = stats.ticks, "animation loop ended");
        stats
    }
}

/// Handle to a loop running on its own thread.
///
/// Dropping the handle cancels the loop and waits for the thread.
pub struct LoopHandle {
    cancel: CancelToken,
    inbox: ConfigInbox,
    tap: FrameTap,
    join: Option<JoinHandle<LoopResult<RunStats>>>,
}

impl LoopHandle {
    pub fn inbox(&self) -> &ConfigInbox {
        &self.inbox
    }

    pub fn tap(&self) -> &FrameTap {
        &self.tap
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }

    /// Cancel the loop and wait for it to exit.
    pub fn stop(mut self) -> LoopResult<RunStats> {
        self.cancel.cancel();
        self.wait()
    }

    /// Wait for the loop to end on its own.
    pub fn join(mut self) -> LoopResult<RunStats> {
        self.wait()
    }

    fn wait(&mut self) -> LoopResult<RunStats> {
        let Some(join) = self.join.take() else {
            return Ok(RunStats::default());
        };
        join.join()
            .map_err(|_| LoopError::render("animation thread panicked"))?
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Run an [`AnimationLoop`] on a dedicated thread.
///
/// The surface is built on that thread by `make_surface`, so it does not need to be `Send`.
pub fn spawn_loop<S, F, T>(config: RenderConfig, make_surface: F, mut ticker: T) -> LoopResult<LoopHandle>
where
    S: Surface + 'static,
    F: FnOnce() -> LoopResult<S> + Send + 'static,
    T: Ticker + Send + 'static,
{
    let cancel = CancelToken::new();
    let inbox = ConfigInbox::new();
    let tap = FrameTap::new();

    let (thread_cancel, thread_inbox, thread_tap) = (cancel.clone(), inbox.clone(), tap.clone());
    let join = std::thread::Builder::new()
        .name("loopline-animation".to_owned())
        .spawn(move || {
            let surface = make_surface()?;
            let mut animation =
                AnimationLoop::with_channels(config, surface, thread_inbox, thread_tap);
            Ok(animation.run(&mut ticker, &thread_cancel))
        })
        .context("failed to spawn animation thread")?;

    Ok(LoopHandle {
        cancel,
        inbox,
        tap,
        join: Some(join),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Direction;
    use crate::render::recording::RecordingSurface;
    use crate::session::scheduler::{CountedTicker, IntervalTicker};

    fn desc(w: u32, h: u32) -> SurfaceDesc {
        SurfaceDesc::new(w, h, 1.0).unwrap()
    }

    fn config(text: &str, speed: f64) -> RenderConfig {
        RenderConfig {
            text: text.to_owned(),
            speed,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn tick_advances_offset_and_frame_index() {
        let mut anim = AnimationLoop::new(config("HELLO", 2.0), RecordingSurface::new(desc(800, 400)));
        assert_eq!(anim.tick(), FrameIndex(0));
        assert_eq!(anim.tick(), FrameIndex(1));
        assert_eq!(anim.state().offset, -4.0);
        assert_eq!(anim.frame_index(), FrameIndex(2));
        assert_eq!(anim.surface().frames_presented(), 2);
    }

    #[test]
    fn new_config_resets_offset() {
        let mut anim = AnimationLoop::new(config("HELLO", 2.0), RecordingSurface::new(desc(800, 400)));
        for _ in 0..5 {
            anim.tick();
        }
        anim.inbox().submit(config("WORLD", 3.0));
        anim.tick();
        assert_eq!(anim.config().text, "WORLD");
        assert_eq!(anim.state().offset, -3.0);
    }

    #[test]
    fn identical_config_keeps_offset() {
        let mut anim = AnimationLoop::new(config("HELLO", 2.0), RecordingSurface::new(desc(800, 400)));
        anim.tick();
        anim.set_config(config("HELLO", 2.0));
        anim.tick();
        assert_eq!(anim.state().offset, -4.0);
    }

    #[test]
    fn resize_resets_offset_and_layout() {
        let mut anim = AnimationLoop::new(config("HELLO", 2.0), RecordingSurface::new(desc(800, 400)));
        anim.tick();
        let before = anim.last_layout().unwrap().start_y;
        anim.inbox().request_resize(desc(800, 200));
        anim.tick();
        assert_eq!(anim.state().offset, -2.0);
        assert!(anim.last_layout().unwrap().start_y < before);
    }

    #[test]
    fn invalid_resize_request_keeps_the_loop_running() {
        let mut anim = AnimationLoop::new(config("HELLO", 2.0), RecordingSurface::new(desc(10, 10)));
        anim.tick();
        anim.inbox().request_resize(SurfaceDesc {
            width: 0,
            height: 10,
            scale: 1.0,
        });
        let stats = anim.run(&mut CountedTicker::new(100), &CancelToken::new());
        assert_eq!(stats.ticks, 100);
        assert_eq!(anim.frame_index(), FrameIndex(101));
        assert_eq!(anim.surface().desc(), desc(10, 10));
        // The rejected resize does not restart the scroll: 101 ticks of 2px, unit 360px.
        assert_eq!(anim.state().offset, -202.0);
    }

    /// Counts calls and returns a width that changes after the first few.
    struct ShiftingMeasurer {
        calls: Arc<Mutex<usize>>,
    }

    impl crate::layout::metrics::TextMeasurer for ShiftingMeasurer {
        fn measure(&mut self, text: &str, _style: &crate::layout::metrics::TextStyle) -> f64 {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            let per_char = if *calls > 3 { 20.0 } else { 10.0 };
            text.chars().count() as f64 * per_char
        }
    }

    #[test]
    fn layout_is_measured_every_tick() {
        let calls = Arc::new(Mutex::new(0));
        let surface = RecordingSurface::with_measurer(
            desc(800, 200),
            ShiftingMeasurer {
                calls: Arc::clone(&calls),
            },
        );
        let mut anim = AnimationLoop::new(config("AB", 1.0), surface);
        for _ in 0..5 {
            anim.tick();
        }
        assert_eq!(*calls.lock().unwrap(), 5);
        // "AB " measured with the later metrics.
        assert_eq!(anim.last_layout().unwrap().unit_width, 60.0);
    }

    #[test]
    fn run_counts_ticks() {
        let mut anim = AnimationLoop::new(
            RenderConfig {
                direction: Direction::Right,
                ..config("HI", 1.0)
            },
            RecordingSurface::new(desc(300, 100)),
        );
        let stats = anim.run(&mut CountedTicker::new(25), &CancelToken::new());
        assert_eq!(stats, RunStats { ticks: 25 });
        assert!(anim.state().offset < 0.0);
    }

    #[test]
    fn spawned_loop_runs_to_completion() {
        let handle = spawn_loop(
            config("HELLO", 2.0),
            || Ok(RecordingSurface::new(desc(320, 200))),
            CountedTicker::new(40),
        )
        .unwrap();
        assert_eq!(handle.join().unwrap().ticks, 40);
    }

    #[test]
    fn spawned_loop_stops_on_cancel() {
        let handle = spawn_loop(
            RenderConfig::default(),
            || Ok(RecordingSurface::new(desc(320, 200))),
            IntervalTicker::default(),
        )
        .unwrap();
        handle.inbox().submit(config("LIVE", 5.0));
        std::thread::sleep(std::time::Duration::from_millis(50));
        let stats = handle.stop().unwrap();
        assert!(stats.ticks >= 1);
    }

    #[test]
    fn surface_factory_error_is_reported() {
        let handle = spawn_loop(
            RenderConfig::default(),
            || -> LoopResult<RecordingSurface> { Err(LoopError::render("no surface")) },
            CountedTicker::new(1),
        )
        .unwrap();
        assert!(handle.join().is_err());
    }
}
