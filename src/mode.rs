//! Conversion modes and their acceptance policies.
//!
//! Every per-mode fact (extensions, size limit, labels) lives in one lookup
//! table, [`POLICIES`]. Adding a mode means adding a variant and a row here;
//! no other module branches on the mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upload limit shared by every mode: 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The source→target transformation the user intends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Raster image → PDF (default).
    #[default]
    ImageToPdf,
    /// Word document → PDF.
    DocxToPdf,
    /// Plain text → PDF.
    TextToPdf,
}

/// What a mode accepts, and how the accepted types are described to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptancePolicy {
    /// Lower-case suffixes including the leading dot.
    pub allowed_extensions: &'static [&'static str],
    pub max_bytes: u64,
    /// Human-readable list of accepted types.
    pub description: &'static str,
    /// Filter hint for native file pickers.
    pub picker_filter: &'static str,
    /// Short label for mode selectors.
    pub label: &'static str,
}

/// One row per mode, in selector order.
pub const POLICIES: [(ConversionMode, AcceptancePolicy); 3] = [
    (
        ConversionMode::ImageToPdf,
        AcceptancePolicy {
            allowed_extensions: &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff"],
            max_bytes: MAX_UPLOAD_BYTES,
            description: "Images (JPG, PNG, GIF, BMP, TIFF)",
            picker_filter: "image/*",
            label: "Image to PDF",
        },
    ),
    (
        ConversionMode::DocxToPdf,
        AcceptancePolicy {
            allowed_extensions: &[".docx"],
            max_bytes: MAX_UPLOAD_BYTES,
            description: "Word Documents (.docx)",
            picker_filter: ".docx",
            label: "Word to PDF",
        },
    ),
    (
        ConversionMode::TextToPdf,
        AcceptancePolicy {
            allowed_extensions: &[".txt"],
            max_bytes: MAX_UPLOAD_BYTES,
            description: "Text Files (.txt)",
            picker_filter: ".txt",
            label: "Text to PDF",
        },
    ),
];

// Every row must sit at its mode's position.
const _: () = {
    let mut i = 0;
    while i < POLICIES.len() {
        assert!(POLICIES[i].0.row() == i, "POLICIES rows are out of order");
        i += 1;
    }
};

/// Multipart content types by suffix.
const CONTENT_TYPES: &[(&str, &str)] = &[
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".png", "image/png"),
    (".gif", "image/gif"),
    (".bmp", "image/bmp"),
    (".tiff", "image/tiff"),
    (
        ".docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (".txt", "text/plain"),
];

impl ConversionMode {
    /// All modes in selector order.
    pub fn all() -> impl Iterator<Item = ConversionMode> {
        POLICIES.iter().map(|(mode, _)| *mode)
    }

    /// The wire value sent as `conversion_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::ImageToPdf => "image_to_pdf",
            ConversionMode::DocxToPdf => "docx_to_pdf",
            ConversionMode::TextToPdf => "text_to_pdf",
        }
    }

    pub fn policy(self) -> &'static AcceptancePolicy {
        &POLICIES[self.row()].1
    }

    /// Position of this mode's row in [`POLICIES`].
    const fn row(self) -> usize {
        match self {
            ConversionMode::ImageToPdf => 0,
            ConversionMode::DocxToPdf => 1,
            ConversionMode::TextToPdf => 2,
        }
    }

    /// True when `name` ends with one of this mode's extensions (case-insensitive).
    pub fn accepts_name(self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.policy()
            .allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(ext))
    }

    /// The first mode whose policy accepts `name`, if any.
    pub fn infer_from_name(name: &str) -> Option<ConversionMode> {
        Self::all().find(|mode| mode.accepts_name(name))
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|mode| mode.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "unknown conversion mode '{s}' (expected one of: {})",
                    Self::all().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
                )
            })
    }
}

/// MIME type for the upload part, from the file name's suffix.
pub fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}
