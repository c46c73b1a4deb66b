//! The conversion workflow state machine.
//!
//! ## States
//!
//! ```text
//!            select_file            convert
//!   Idle ───────────────▶ Idle ───────────────▶ Converting ──┬─▶ Succeeded
//!    ▲    (file staged)                                      └─▶ Failed
//!    └──────────────────────────── reset ───────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! The orchestrator has a single owner and is only mutated through
//! `&mut self`. While converting, two tasks run on the tokio runtime: the
//! progress ticker and the request. Neither touches the session; each sends
//! events tagged with the conversion's *generation* back over a channel, and
//! the owner applies them with [`Orchestrator::poll_events`],
//! [`Orchestrator::next_event`] or [`Orchestrator::run_until_settled`].
//!
//! Every `convert` and every `reset` bumps the generation. A request that
//! settles under an older generation is discarded, so a late answer can
//! never resurrect a session the user has already reset or re-submitted.
//! The ticker is owned and aborted as soon as the request settles; a tick
//! already queued by then is discarded because the phase has moved on.

use crate::client::ConversionService;
use crate::config::WorkflowConfig;
use crate::error::{ConvertError, StaleResponse, WorkflowError};
use crate::guard::{self, ModeChange};
use crate::intake::CandidateFile;
use crate::mode::ConversionMode;
use crate::progress::{NoopObserver, ObserverHandle, ProgressEstimator, Ticker};
use crate::session::{ConversionResult, Phase, SessionState};
use crate::validate;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Messages from the ticker and request tasks to the owner.
#[derive(Debug)]
enum WorkflowEvent {
    Tick {
        generation: u64,
        percent: u8,
    },
    Settled {
        generation: u64,
        outcome: Result<ConversionResult, ConvertError>,
    },
}

/// What applying one event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Simulated progress advanced to this value.
    Progress(u8),
    /// The current conversion reached Succeeded or Failed.
    Settled,
    /// The event belonged to an outdated conversion and was ignored.
    Discarded,
}

/// Owns the [`SessionState`] and performs every transition on it.
pub struct Orchestrator {
    service: Arc<dyn ConversionService>,
    state: SessionState,
    estimator: ProgressEstimator,
    observer: ObserverHandle,
    generation: u64,
    /// Requests spawned but not yet settled, stale ones included.
    outstanding: usize,
    ticker: Option<Ticker>,
    events_tx: mpsc::UnboundedSender<WorkflowEvent>,
    events_rx: mpsc::UnboundedReceiver<WorkflowEvent>,
}

impl Orchestrator {
    /// A fresh session: idle, `image_to_pdf`, nothing staged.
    pub fn new(service: Arc<dyn ConversionService>, config: &WorkflowConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            service,
            state: SessionState::new(),
            estimator: ProgressEstimator::new(config),
            observer: Arc::new(NoopObserver),
            generation: 0,
            outstanding: 0,
            ticker: None,
            events_tx,
            events_rx,
        }
    }

    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> ConversionMode {
        self.state.mode
    }

    pub fn phase(&self) -> &Phase {
        &self.state.phase
    }

    /// Identifier of the most recent convert/reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Mode switching ───────────────────────────────────────────────────

    /// Ask to switch mode; may require [`Self::confirm_mode_switch`].
    pub fn request_mode_change(
        &mut self,
        new_mode: ConversionMode,
    ) -> Result<ModeChange, WorkflowError> {
        let change = guard::request_mode_change(&mut self.state, new_mode)?;
        match change {
            ModeChange::Applied(mode) => {
                info!("Mode set to {}", mode);
                self.observer.on_mode_change(mode);
            }
            ModeChange::NeedsConfirmation { from, to } => {
                debug!("Switch {} → {} awaits confirmation", from, to);
            }
            ModeChange::Unchanged => {}
        }
        Ok(change)
    }

    /// Discard all work and apply the parked mode.
    pub fn confirm_mode_switch(&mut self) -> Result<ConversionMode, WorkflowError> {
        let mode = guard::confirm(&mut self.state)?;
        self.reset();
        self.state.mode = mode;
        info!("Mode switched to {} (session reset)", mode);
        self.observer.on_mode_change(mode);
        Ok(mode)
    }

    /// Keep the current mode and all work; close the prompt.
    pub fn cancel_mode_switch(&mut self) -> Result<(), WorkflowError> {
        let dropped = guard::cancel(&mut self.state)?;
        debug!("Switch to {} cancelled", dropped);
        Ok(())
    }

    // ── File selection ───────────────────────────────────────────────────

    /// Validate and stage `file`, replacing any staged file and clearing a
    /// previous result or error.
    ///
    /// On rejection the session is untouched and the reason is returned to
    /// the caller as [`WorkflowError::Rejected`].
    pub fn select_file(&mut self, file: CandidateFile) -> Result<(), WorkflowError> {
        self.ensure_no_pending_switch()?;
        if self.state.phase.is_converting() {
            return Err(WorkflowError::AlreadyConverting);
        }
        validate::validate(&file, self.state.mode)?;

        info!(
            "Staged {} ({} bytes) for {}",
            file.name(),
            file.size_bytes(),
            self.state.mode
        );
        self.observer.on_file_staged(file.name(), file.size_bytes());
        self.state.staged_file = Some(file);
        self.set_progress(0);
        self.set_phase(Phase::Idle);
        Ok(())
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// Start converting the staged file.
    ///
    /// Spawns the progress ticker and the request on the current tokio
    /// runtime and returns the new generation. While a conversion is in
    /// flight this is a no-op returning [`WorkflowError::AlreadyConverting`].
    pub fn convert(&mut self) -> Result<u64, WorkflowError> {
        self.ensure_no_pending_switch()?;
        if self.state.phase.is_converting() {
            debug!("convert() ignored: conversion #{} in flight", self.generation);
            return Err(WorkflowError::AlreadyConverting);
        }
        let file = self
            .state
            .staged_file
            .clone()
            .ok_or(WorkflowError::NoStagedFile)?;
        let mode = self.state.mode;

        self.stop_ticker();
        self.generation += 1;
        let generation = self.generation;
        info!("Conversion #{}: {} as {}", generation, file.name(), mode);

        self.set_phase(Phase::Converting);
        self.set_progress(0);

        let tick_tx = self.events_tx.clone();
        self.ticker = Some(self.estimator.spawn(move |percent| {
            tick_tx
                .send(WorkflowEvent::Tick {
                    generation,
                    percent,
                })
                .is_ok()
        }));

        let service = Arc::clone(&self.service);
        let settle_tx = self.events_tx.clone();
        self.outstanding += 1;
        tokio::spawn(async move {
            let request = async {
                let reference = service.submit(&file, mode).await?;
                Ok::<_, ConvertError>(ConversionResult {
                    location: service.resolve_location(&reference),
                    output_filename: reference.output_filename,
                    file_size: reference.file_size,
                })
            };
            // A panicking service still has to settle the conversion.
            let outcome = AssertUnwindSafe(request)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(ConvertError::Internal(format!(
                        "conversion service panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                });
            // The receiver only disappears with the orchestrator.
            let _ = settle_tx.send(WorkflowEvent::Settled {
                generation,
                outcome,
            });
        });

        Ok(generation)
    }

    /// Return to a clean idle session. Always allowed.
    ///
    /// Any request still in flight is abandoned; its answer will be
    /// discarded when it arrives. An open confirmation prompt is closed.
    pub fn reset(&mut self) {
        self.stop_ticker();
        self.generation += 1;
        self.state.clear();
        debug!("Session reset (generation #{})", self.generation);
        self.observer.on_progress(0);
        self.observer.on_phase_change(&self.state.phase);
    }

    // ── Event pump ───────────────────────────────────────────────────────

    /// Apply every event that has already arrived, without waiting.
    ///
    /// Returns how many events were applied (discarded ones included).
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next event and apply it.
    ///
    /// Returns `None` when nothing is outstanding and no event is queued,
    /// i.e. when waiting would never finish.
    pub async fn next_event(&mut self) -> Option<Update> {
        let event = if self.outstanding == 0 {
            self.events_rx.try_recv().ok()?
        } else {
            self.events_rx.recv().await?
        };
        Some(self.apply(event))
    }

    /// Pump events until the current conversion has settled.
    pub async fn run_until_settled(&mut self) -> &Phase {
        while self.state.phase.is_converting() {
            if self.next_event().await.is_none() {
                break;
            }
        }
        &self.state.phase
    }

    fn apply(&mut self, event: WorkflowEvent) -> Update {
        match event {
            WorkflowEvent::Tick {
                generation,
                percent,
            } => {
                if generation != self.generation || !self.state.phase.is_converting() {
                    return Update::Discarded;
                }
                let percent = percent.min(self.estimator.ceiling());
                if percent > self.state.progress_percent {
                    self.set_progress(percent);
                }
                Update::Progress(self.state.progress_percent)
            }
            WorkflowEvent::Settled {
                generation,
                outcome,
            } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                if generation != self.generation || !self.state.phase.is_converting() {
                    let stale = StaleResponse {
                        generation,
                        current: self.generation,
                    };
                    debug!("{}", stale);
                    self.observer.on_stale_response(generation);
                    return Update::Discarded;
                }

                self.stop_ticker();
                match outcome {
                    Ok(result) => {
                        info!("Conversion #{} succeeded: {}", generation, result.location);
                        self.set_progress(100);
                        self.set_phase(Phase::Succeeded { result });
                    }
                    Err(e) => {
                        warn!("Conversion #{} failed: {}", generation, e);
                        self.set_progress(0);
                        self.set_phase(Phase::Failed {
                            message: e.user_message(),
                        });
                    }
                }
                Update::Settled
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn ensure_no_pending_switch(&self) -> Result<(), WorkflowError> {
        match self.state.pending_mode_switch {
            Some(pending) => Err(WorkflowError::ConfirmationPending { pending }),
            None => Ok(()),
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn set_progress(&mut self, percent: u8) {
        if self.state.progress_percent != percent {
            self.state.progress_percent = percent;
            self.observer.on_progress(percent);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase != phase {
            self.state.phase = phase;
            self.observer.on_phase_change(&self.state.phase);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("outstanding", &self.outstanding)
            .field("ticking", &self.ticker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ResultReference;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every submission immediately with a fixed outcome.
    struct Immediate {
        fail_with: Option<String>,
        calls: AtomicUsize,
    }

    impl ConversionService for Immediate {
        fn submit<'a>(
            &'a self,
            _file: &'a CandidateFile,
            _mode: ConversionMode,
        ) -> BoxFuture<'a, Result<ResultReference, ConvertError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = match &self.fail_with {
                None => Ok(ResultReference::new("/files/out.pdf")),
                Some(detail) => Err(ConvertError::Service {
                    status: 500,
                    detail: Some(detail.clone()),
                }),
            };
            Box::pin(async move { outcome })
        }

        fn resolve_location(&self, reference: &ResultReference) -> String {
            format!("http://localhost:8000{}", reference.download_url)
        }
    }

    fn orchestrator(fail_with: Option<&str>) -> (Orchestrator, Arc<Immediate>) {
        let service = Arc::new(Immediate {
            fail_with: fail_with.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        let orch = Orchestrator::new(service.clone(), &WorkflowConfig::default());
        (orch, service)
    }

    #[test]
    fn select_requires_valid_file() {
        let (mut orch, _) = orchestrator(None);
        let err = orch
            .select_file(CandidateFile::new("notes.txt", "hi"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Rejected(_)));
        assert!(orch.state().staged_file().is_none());

        orch.select_file(CandidateFile::new("photo.png", "x")).unwrap();
        assert_eq!(orch.state().staged_file().unwrap().name(), "photo.png");
        assert_eq!(orch.phase(), &Phase::Idle);
    }

    #[test]
    fn convert_without_file_is_refused() {
        let (mut orch, service) = orchestrator(None);
        assert_eq!(orch.convert(), Err(WorkflowError::NoStagedFile));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_sets_location_and_full_progress() {
        let (mut orch, service) = orchestrator(None);
        orch.select_file(CandidateFile::new("photo.png", "x")).unwrap();
        orch.convert().unwrap();
        assert!(orch.phase().is_converting());

        orch.run_until_settled().await;
        assert_eq!(
            orch.state().result_location(),
            Some("http://localhost:8000/files/out.pdf")
        );
        assert_eq!(orch.state().progress_percent(), 100);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        // The file stays staged after success.
        assert!(orch.state().staged_file().is_some());
    }

    #[tokio::test]
    async fn failure_surfaces_detail_and_zeroes_progress() {
        let (mut orch, _) = orchestrator(Some("unsupported encoding"));
        orch.select_file(CandidateFile::new("photo.png", "x")).unwrap();
        orch.convert().unwrap();
        orch.run_until_settled().await;

        assert_eq!(orch.state().error_message(), Some("unsupported encoding"));
        assert_eq!(orch.state().progress_percent(), 0);
        assert!(orch.state().result_location().is_none());
    }

    #[tokio::test]
    async fn reset_from_every_phase_is_complete() {
        for fail in [None, Some("boom")] {
            let (mut orch, _) = orchestrator(fail);
            orch.select_file(CandidateFile::new("photo.png", "x")).unwrap();
            orch.convert().unwrap();
            orch.run_until_settled().await;
            assert!(orch.phase().is_terminal());

            orch.reset();
            let s = orch.state();
            assert_eq!(s.phase(), &Phase::Idle);
            assert_eq!(s.progress_percent(), 0);
            assert!(s.staged_file().is_none());
            assert!(s.result_location().is_none());
            assert!(s.error_message().is_none());
        }
    }

    #[tokio::test]
    async fn next_event_returns_none_when_idle() {
        let (mut orch, _) = orchestrator(None);
        assert_eq!(orch.next_event().await, None);
        assert_eq!(orch.run_until_settled().await, &Phase::Idle);
    }
}
