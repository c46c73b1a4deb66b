//! Error types for the fconverter library.
//!
//! Four types reflect four distinct failure modes:
//!
//! * [`ConvertError`] is **fatal for the request**. The remote service could
//!   not be reached, answered with a failure, or a local file could not be
//!   read or written. The orchestrator converts these into
//!   [`crate::session::Phase::Failed`]; they never escape to the user as a
//!   fault.
//!
//! * [`ValidationError`] is a **local rejection**. The candidate file is too big
//!   or has the wrong extension for the active mode. Never reaches the
//!   network and never changes the session phase.
//!
//! * [`WorkflowError`]: a transition the state machine refused (convert
//!   while converting, select while a confirmation prompt is open, …).
//!
//! * [`StaleResponse`] is internal. A response for a conversion the session
//!   has since moved past. Discarded, never reported.

use std::path::PathBuf;
use thiserror::Error;

use crate::mode::ConversionMode;

/// Message stored in the session when the service failed without a usable reason.
pub const GENERIC_SERVICE_FAILURE: &str = "Conversion failed";

/// Message stored in the session when the request itself could not complete.
pub const GENERIC_TRANSPORT_FAILURE: &str = "An error occurred during conversion";

/// Errors returned by the remote client and file helpers.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Network errors ────────────────────────────────────────────────────
    /// The request could not be completed (connection refused, timeout, …).
    #[error("Request to '{url}' failed: {reason}\nIs the conversion service running?")]
    Transport { url: String, reason: String },

    /// The service answered with a non-success status.
    ///
    /// `detail` holds the service's structured reason when one could be
    /// parsed from the body.
    #[error("Conversion service returned HTTP {status}: {}", .detail.as_deref().unwrap_or(GENERIC_SERVICE_FAILURE))]
    Service { status: u16, detail: Option<String> },

    /// A success status arrived but the body was not what we expect.
    #[error("Malformed response from '{url}': {reason}")]
    MalformedResponse { url: String, reason: String },

    /// Fetching a converted document failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Local file errors ─────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the input failed after it was opened.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the downloaded output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// The text shown to the user when this error ends a conversion.
    ///
    /// Service reasons are surfaced verbatim; everything else collapses to a
    /// generic message.
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::Service {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            ConvertError::Service { .. } => GENERIC_SERVICE_FAILURE.to_string(),
            _ => GENERIC_TRANSPORT_FAILURE.to_string(),
        }
    }

    /// True for failures where the request never produced a usable answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConvertError::Transport { .. } | ConvertError::MalformedResponse { .. }
        )
    }
}

/// Why a candidate file was refused for the active mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The file is larger than the mode's upload limit.
    #[error("size exceeds limit: '{name}' is {size_bytes} bytes, maximum is {max_bytes} bytes")]
    SizeExceedsLimit {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    /// The file's extension is not accepted by the mode.
    #[error("invalid type for mode {mode}: '{name}' is not one of {accepted}")]
    InvalidType {
        name: String,
        mode: ConversionMode,
        accepted: &'static str,
    },
}

/// A transition the orchestrator refused to perform.
///
/// Refusals leave the session exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error("no file is staged for conversion")]
    NoStagedFile,

    #[error("a conversion is already in progress")]
    AlreadyConverting,

    #[error("a mode switch to {pending} is awaiting confirmation")]
    ConfirmationPending { pending: ConversionMode },

    #[error("no mode switch is awaiting confirmation")]
    NoPendingSwitch,
}

/// A settled request whose generation no longer matches the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("discarding response for conversion #{generation} (current is #{current})")]
pub struct StaleResponse {
    pub generation: u64,
    pub current: u64,
}
