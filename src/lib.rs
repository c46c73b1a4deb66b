//! # fconverter
//!
//! Client-side workflow for a remote image/Word/text → PDF conversion
//! service.
//!
//! The service does the format conversion; this crate owns everything around
//! it: validating a candidate file against the chosen mode, staging it,
//! submitting it as one multipart request, showing believable progress while
//! the request is opaque, guarding destructive mode switches behind a
//! confirmation, and settling into a success or error state the user can
//! leave with a reset.
//!
//! ## Workflow Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Intake     drop / picker → first file only
//!  ├─ 2. Validate   size ≤ 10 MiB, extension fits the mode
//!  ├─ 3. Stage      Orchestrator::select_file
//!  ├─ 4. Convert    ticker (simulated %) ∥ POST /api/v1/convert
//!  └─ 5. Settle     Succeeded { download URL } | Failed { message }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fconverter::{
//!     CandidateFile, ClientConfig, ConversionMode, Orchestrator, RemoteClient, WorkflowConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RemoteClient::new(ClientConfig::builder().base_url("http://localhost:8000").build()?)?;
//!     let mut session = Orchestrator::new(Arc::new(client), &WorkflowConfig::default());
//!
//!     session.request_mode_change(ConversionMode::TextToPdf)?;
//!     session.select_file(CandidateFile::new("notes.txt", std::fs::read("notes.txt")?))?;
//!     session.convert()?;
//!     session.run_until_settled().await;
//!
//!     match session.state().result_location() {
//!         Some(url) => println!("{url}"),
//!         None => eprintln!("{}", session.state().error_message().unwrap_or("failed")),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! fconverter = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod intake;
pub mod mode;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ConversionService, HealthStatus, RemoteClient, ResultReference};
pub use config::{ClientConfig, ClientConfigBuilder, WorkflowConfig, WorkflowConfigBuilder};
pub use error::{ConvertError, StaleResponse, ValidationError, WorkflowError};
pub use guard::ModeChange;
pub use intake::{format_file_size, CandidateFile, UploadIntake};
pub use mode::{AcceptancePolicy, ConversionMode, MAX_UPLOAD_BYTES};
pub use orchestrator::{Orchestrator, Update};
pub use progress::{NoopObserver, ObserverHandle, ProgressEstimator, SessionObserver, Ticker};
pub use session::{ConversionResult, Phase, SessionState};
pub use validate::validate;
