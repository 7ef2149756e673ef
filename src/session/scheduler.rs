use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::core::Fps;

/// Longest single sleep while waiting for a tick, so cancellation is noticed promptly.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Shared cancellation flag for a running loop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of frame ticks.
///
/// The wait between ticks is the loop's only suspension point.
pub trait Ticker {
    /// Block until the next tick. Returns `false` when the loop should end.
    fn wait_for_tick(&mut self, cancel: &CancelToken) -> bool;
}

/// Fixed-rate ticker standing in for the display refresh signal.
///
/// Late ticks are not bunched up: after a slow frame the schedule restarts from now.
#[derive(Clone, Debug)]
pub struct IntervalTicker {
    interval: Duration,
    next: Option<Instant>,
}

impl IntervalTicker {
    pub fn new(fps: Fps) -> Self {
        Self {
            interval: fps.frame_interval(),
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new(Fps::default())
    }
}

impl Ticker for IntervalTicker {
    fn wait_for_tick(&mut self, cancel: &CancelToken) -> bool {
        let now = Instant::now();
        let deadline = self.next.unwrap_or(now);

        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
        }

        let now = Instant::now();
        let mut next = deadline + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next = Some(next);
        true
    }
}

/// Fires a fixed number of ticks back to back, without sleeping.
#[derive(Clone, Copy, Debug)]
pub struct CountedTicker {
    remaining: u64,
}

impl CountedTicker {
    pub fn new(ticks: u64) -> Self {
        Self { remaining: ticks }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Ticker for CountedTicker {
    fn wait_for_tick(&mut self, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() || self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counted_ticker_fires_exactly_n_times() {
        let cancel = CancelToken::new();
        let mut t = CountedTicker::new(3);
        let mut n = 0;
        while t.wait_for_tick(&cancel) {
            n += 1;
        }
        assert_eq!(n, 3);
        assert_eq!(t.remaining(), 0);
    }

    #[test]
    fn cancelled_tickers_stop() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(!CountedTicker::new(10).wait_for_tick(&cancel));
        assert!(!IntervalTicker::default().wait_for_tick(&cancel));
    }

    #[test]
    fn interval_ticker_paces_ticks() {
        let cancel = CancelToken::new();
        let mut t = IntervalTicker::new(Fps::new(200, 1).unwrap());
        let start = Instant::now();
        for _ in 0..4 {
            assert!(t.wait_for_tick(&cancel));
        }
        // First tick is immediate, three more intervals of 5ms follow.
        assert!(start.elapsed() >= Duration::from_millis(14));
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let a = CancelToken::new();
        let b = a.clone();
        b.cancel();
        assert!(a.is_cancelled());
    }
}
