//! Upload intake: where candidate files come from.
//!
//! Two sources feed the workflow: a *drop* (any number of files handed over
//! at once, only the first is considered) and a *picker* (a single path on
//! disk). Both run the validator and forward accepted files; neither owns
//! conversion state. The only thing the intake remembers is the last
//! rejection, which is widget-local feedback and never part of the session.

use crate::error::{ConvertError, ValidationError};
use crate::mode::ConversionMode;
use crate::validate;
use std::fmt;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file offered for conversion.
///
/// The content is shared, so staging a file and handing it to the upload
/// task does not copy the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateFile {
    name: String,
    content: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Load a file from disk, naming it after the path's final component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(Self::new(file_name(path), content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// A handle to the same buffer, for request bodies.
    pub fn shared_content(&self) -> Bytes {
        self.content.clone()
    }
}

impl fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateFile")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Validating front door for candidate files.
#[derive(Debug, Default)]
pub struct UploadIntake {
    last_error: Option<ValidationError>,
}

impl UploadIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a drop of files; only the first one is considered.
    ///
    /// Returns the accepted file, or `None` when the drop was empty or the
    /// file was rejected (see [`Self::last_error`]).
    pub fn offer<I>(&mut self, files: I, mode: ConversionMode) -> Option<CandidateFile>
    where
        I: IntoIterator<Item = CandidateFile>,
    {
        let file = files.into_iter().next()?;
        self.last_error = None;
        match validate::validate(&file, mode) {
            Ok(()) => {
                debug!("Accepted {} ({} bytes) for {}", file.name(), file.size_bytes(), mode);
                Some(file)
            }
            Err(e) => {
                debug!("Rejected {}: {}", file.name(), e);
                self.last_error = Some(e);
                None
            }
        }
    }

    /// Pick a file from disk.
    ///
    /// The size limit is checked against the file's metadata first so an
    /// oversized file is never read into memory.
    ///
    /// `Ok(None)` means the file was rejected by the validator;
    /// `Err` means it could not be read at all.
    pub async fn pick(
        &mut self,
        path: impl AsRef<Path>,
        mode: ConversionMode,
    ) -> Result<Option<CandidateFile>, ConvertError> {
        let path = path.as_ref();
        self.last_error = None;

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;
        if !meta.is_file() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let name = file_name(path);
        if let Err(e) = validate::check(&name, meta.len(), mode) {
            debug!("Rejected {} before reading: {}", path.display(), e);
            self.last_error = Some(e);
            return Ok(None);
        }

        let file = CandidateFile::from_path(path).await?;
        Ok(self.offer([file], mode))
    }

    /// Feedback from the most recent offer, cleared by the next one.
    pub fn last_error(&self) -> Option<&ValidationError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

/// Render a byte count for previews: `0 B`, `2 KB`, `1.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn io_error(path: &Path, e: std::io::Error) -> ConvertError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => ConvertError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied { path },
        _ => ConvertError::ReadFailed { path, source: e },
    }
}
