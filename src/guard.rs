//! Mode-switch guard: confirmation before discarding staged work.
//!
//! Changing mode while a file is staged or a result is ready would silently
//! throw that work away. The guard parks the requested mode in
//! [`SessionState::pending_mode_switch`] instead and lets the host ask the
//! user. Only one request may be parked at a time.
//!
//! The guard decides; the orchestrator carries out the reset on confirm.

use crate::error::WorkflowError;
use crate::mode::ConversionMode;
use crate::session::SessionState;

/// Outcome of a mode-change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// Nothing to lose; the mode is now active.
    Applied(ConversionMode),
    /// The requested mode was already active.
    Unchanged,
    /// Work in progress; waiting for [`confirm`] or [`cancel`].
    NeedsConfirmation {
        from: ConversionMode,
        to: ConversionMode,
    },
}

impl ModeChange {
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, ModeChange::NeedsConfirmation { .. })
    }
}

/// Request a switch to `new_mode`.
///
/// Applies it immediately when the session holds no work in progress,
/// otherwise parks it for confirmation.
pub fn request_mode_change(
    state: &mut SessionState,
    new_mode: ConversionMode,
) -> Result<ModeChange, WorkflowError> {
    if let Some(pending) = state.pending_mode_switch {
        return Err(WorkflowError::ConfirmationPending { pending });
    }
    if new_mode == state.mode {
        return Ok(ModeChange::Unchanged);
    }
    if state.has_work_in_progress() {
        state.pending_mode_switch = Some(new_mode);
        return Ok(ModeChange::NeedsConfirmation {
            from: state.mode,
            to: new_mode,
        });
    }
    state.mode = new_mode;
    Ok(ModeChange::Applied(new_mode))
}

/// Take the parked mode for the caller to apply after a full reset.
pub fn confirm(state: &mut SessionState) -> Result<ConversionMode, WorkflowError> {
    state
        .pending_mode_switch
        .take()
        .ok_or(WorkflowError::NoPendingSwitch)
}

/// Drop the parked mode; nothing else changes.
pub fn cancel(state: &mut SessionState) -> Result<ConversionMode, WorkflowError> {
    state
        .pending_mode_switch
        .take()
        .ok_or(WorkflowError::NoPendingSwitch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::CandidateFile;
    use crate::session::{ConversionResult, Phase};

    fn staged() -> SessionState {
        let mut s = SessionState::new();
        s.staged_file = Some(CandidateFile::new("photo.png", "x"));
        s
    }

    #[test]
    fn applies_immediately_without_work() {
        let mut s = SessionState::new();
        let change = request_mode_change(&mut s, ConversionMode::TextToPdf).unwrap();
        assert_eq!(change, ModeChange::Applied(ConversionMode::TextToPdf));
        assert!(!change.needs_confirmation());
        assert_eq!(s.mode(), ConversionMode::TextToPdf);
        assert!(s.pending_mode_switch().is_none());
    }

    #[test]
    fn same_mode_is_unchanged() {
        let mut s = staged();
        assert_eq!(
            request_mode_change(&mut s, ConversionMode::ImageToPdf).unwrap(),
            ModeChange::Unchanged
        );
        assert!(s.pending_mode_switch().is_none());
    }

    #[test]
    fn staged_file_requires_confirmation() {
        let mut s = staged();
        let change = request_mode_change(&mut s, ConversionMode::DocxToPdf).unwrap();
        assert!(change.needs_confirmation());
        assert_eq!(s.mode(), ConversionMode::ImageToPdf);
        assert_eq!(s.pending_mode_switch(), Some(ConversionMode::DocxToPdf));
    }

    #[test]
    fn ready_result_requires_confirmation() {
        let mut s = SessionState::new();
        s.phase = Phase::Succeeded {
            result: ConversionResult {
                location: "http://localhost:8000/x.pdf".into(),
                output_filename: None,
                file_size: None,
            },
        };
        let change = request_mode_change(&mut s, ConversionMode::TextToPdf).unwrap();
        assert!(change.needs_confirmation());
    }

    #[test]
    fn second_request_while_pending_is_refused() {
        let mut s = staged();
        request_mode_change(&mut s, ConversionMode::DocxToPdf).unwrap();
        let err = request_mode_change(&mut s, ConversionMode::TextToPdf).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::ConfirmationPending {
                pending: ConversionMode::DocxToPdf
            }
        );
        assert_eq!(s.pending_mode_switch(), Some(ConversionMode::DocxToPdf));
    }

    #[test]
    fn cancel_restores_everything() {
        let mut s = staged();
        request_mode_change(&mut s, ConversionMode::DocxToPdf).unwrap();
        assert_eq!(cancel(&mut s), Ok(ConversionMode::DocxToPdf));
        assert_eq!(s.mode(), ConversionMode::ImageToPdf);
        assert!(s.staged_file().is_some());
        assert!(s.pending_mode_switch().is_none());
    }

    #[test]
    fn confirm_and_cancel_need_a_pending_switch() {
        let mut s = SessionState::new();
        assert_eq!(confirm(&mut s), Err(WorkflowError::NoPendingSwitch));
        assert_eq!(cancel(&mut s), Err(WorkflowError::NoPendingSwitch));
    }
}
