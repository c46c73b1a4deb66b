//! Simulated progress and session observation.
//!
//! The conversion request is a single opaque round trip with no native
//! progress channel. [`ProgressEstimator`] fabricates plausible feedback
//! instead: a ticker that climbs by a fixed step and stops at a ceiling
//! below 100, so completion is only ever reported by the real response.
//!
//! [`SessionObserver`] is the hook a host uses to mirror session changes
//! (progress bars, status lines, logs).
//!
//! # Example
//!
//! ```rust
//! use fconverter::SessionObserver;
//! use std::sync::atomic::{AtomicU8, Ordering};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl SessionObserver for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::config::WorkflowConfig;
use crate::mode::ConversionMode;
use crate::session::Phase;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Called by the orchestrator after each applied transition.
///
/// Every method has a default no-op implementation so implementors only
/// override what they need. Calls happen on the task that owns the
/// orchestrator, never concurrently.
pub trait SessionObserver: Send + Sync {
    /// The active mode changed (directly or after a confirmed switch).
    fn on_mode_change(&self, mode: ConversionMode) {
        let _ = mode;
    }

    /// A validated file was staged.
    fn on_file_staged(&self, name: &str, size_bytes: u64) {
        let _ = (name, size_bytes);
    }

    /// The displayed percentage changed.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// The workflow entered a new phase.
    fn on_phase_change(&self, phase: &Phase) {
        let _ = phase;
    }

    /// A response for an outdated conversion was discarded.
    fn on_stale_response(&self, generation: u64) {
        let _ = generation;
    }
}

/// Default observer for callers that don't need events.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the type stored in the orchestrator.
pub type ObserverHandle = Arc<dyn SessionObserver>;

/// Floor for the tick interval; tokio refuses a zero period.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Produces a capped, monotonically increasing percentage on a fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEstimator {
    interval: Duration,
    step: u8,
    ceiling: u8,
}

impl ProgressEstimator {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            interval: config.tick_interval().max(MIN_TICK_INTERVAL),
            step: config.progress_step.max(1),
            ceiling: config.progress_ceiling.min(99),
        }
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }

    /// The value after one tick from `current`.
    pub fn advance(&self, current: u8) -> u8 {
        current.saturating_add(self.step).min(self.ceiling)
    }

    /// Start ticking on the current tokio runtime.
    ///
    /// `on_tick` receives each new percentage and returns `false` to stop
    /// early (e.g. the receiving side has gone away). The ticker also stops
    /// by itself once it reaches the ceiling. The first tick fires one
    /// interval after the call.
    pub fn spawn<F>(&self, mut on_tick: F) -> Ticker
    where
        F: FnMut(u8) -> bool + Send + 'static,
    {
        let estimator = *self;
        let handle = tokio::spawn(async move {
            let mut clock = interval_at(Instant::now() + estimator.interval, estimator.interval);
            clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut percent = 0u8;
            loop {
                clock.tick().await;
                percent = estimator.advance(percent);
                if !on_tick(percent) || percent >= estimator.ceiling {
                    break;
                }
            }
        });
        Ticker { handle }
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(&WorkflowConfig::default())
    }
}

/// Owned handle to a running ticker. Dropping it stops the ticker.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Stop the ticker; no further ticks are produced after this returns.
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn advance_is_clamped_to_ceiling() {
        let est = ProgressEstimator::default();
        assert_eq!(est.advance(0), 10);
        assert_eq!(est.advance(80), 90);
        assert_eq!(est.advance(90), 90);
        assert_eq!(est.advance(250), 90);
    }

    #[test]
    fn ceiling_never_reaches_completion() {
        let config = WorkflowConfig {
            tick_interval_ms: 10,
            progress_step: 40,
            progress_ceiling: 100,
        };
        let est = ProgressEstimator::new(&config);
        assert_eq!(est.ceiling(), 99);
        assert_eq!(est.advance(80), 99);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_ticks() {
        let config = WorkflowConfig {
            tick_interval_ms: 0,
            ..WorkflowConfig::default()
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ticker = ProgressEstimator::new(&config).spawn(move |p| {
            sink.lock().unwrap().push(p);
            true
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ticker.is_finished());
        assert_eq!(seen.lock().unwrap().last(), Some(&90));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_climbs_to_ceiling_and_stops() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ticker = ProgressEstimator::default().spawn(move |p| {
            sink.lock().unwrap().push(p);
            true
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(ticker.is_finished());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![10, 20, 30, 40, 50, 60, 70, 80, 90]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let last = Arc::new(AtomicU8::new(0));
        let sink = Arc::clone(&last);
        let _ticker = ProgressEstimator::default().spawn(move |p| {
            sink.store(p, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(last.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(last.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_ticker_produces_nothing_more() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let ticker = ProgressEstimator::default().spawn(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(450)).await;
        ticker.cancel();
        let at_cancel = count.load(Ordering::SeqCst);
        assert_eq!(at_cancel, 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_stops_when_callback_declines() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let ticker = ProgressEstimator::default().spawn(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
            false
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(ticker.is_finished());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs: ObserverHandle = Arc::new(NoopObserver);
        obs.on_mode_change(ConversionMode::DocxToPdf);
        obs.on_file_staged("a.docx", 10);
        obs.on_progress(40);
        obs.on_phase_change(&Phase::Converting);
        obs.on_stale_response(3);
    }
}
