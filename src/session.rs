//! Session state owned by the orchestrator.
//!
//! The result location and the error message live inside the [`Phase`]
//! variants, so "a result exists only after success" and "an error exists
//! only after failure" hold by construction rather than by discipline.

use crate::intake::CandidateFile;
use crate::mode::ConversionMode;
use serde::Serialize;

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// Absolute URL of the converted document.
    pub location: String,
    /// File name the service gave the output, when reported.
    pub output_filename: Option<String>,
    /// Output size in bytes, when reported.
    pub file_size: Option<u64>,
}

/// Discrete stage of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Converting,
    Succeeded { result: ConversionResult },
    Failed { message: String },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Converting => "converting",
            Phase::Succeeded { .. } => "succeeded",
            Phase::Failed { .. } => "failed",
        }
    }

    pub fn is_converting(&self) -> bool {
        matches!(self, Phase::Converting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded { .. } | Phase::Failed { .. })
    }
}

/// The single mutable record of a conversion session.
///
/// Read-only from the outside; every change goes through
/// [`crate::orchestrator::Orchestrator`].
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub(crate) mode: ConversionMode,
    pub(crate) staged_file: Option<CandidateFile>,
    pub(crate) phase: Phase,
    pub(crate) progress_percent: u8,
    pub(crate) pending_mode_switch: Option<ConversionMode>,
}

impl SessionState {
    /// A fresh session: idle, image mode, nothing staged.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn staged_file(&self) -> Option<&CandidateFile> {
        self.staged_file.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        match &self.phase {
            Phase::Succeeded { result } => Some(result),
            _ => None,
        }
    }

    pub fn result_location(&self) -> Option<&str> {
        self.result().map(|r| r.location.as_str())
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn pending_mode_switch(&self) -> Option<ConversionMode> {
        self.pending_mode_switch
    }

    /// True when a mode change would discard something the user cares about.
    pub fn has_work_in_progress(&self) -> bool {
        self.staged_file.is_some() || matches!(self.phase, Phase::Succeeded { .. })
    }

    /// Clear everything except the mode.
    pub(crate) fn clear(&mut self) {
        self.staged_file = None;
        self.phase = Phase::Idle;
        self.progress_percent = 0;
        self.pending_mode_switch = None;
    }
}
