//! File validation: decide whether a candidate file fits the active mode.
//!
//! Rules run in a fixed order and the first failure wins:
//!
//! 1. size above the mode's limit → [`ValidationError::SizeExceedsLimit`]
//! 2. extension not in the mode's table → [`ValidationError::InvalidType`]
//!
//! Both checks are pure; nothing here touches session state, so the
//! validator can be exercised without an orchestrator or a UI.

use crate::error::ValidationError;
use crate::intake::CandidateFile;
use crate::mode::ConversionMode;

/// Validate a candidate file against `mode`'s acceptance policy.
pub fn validate(file: &CandidateFile, mode: ConversionMode) -> Result<(), ValidationError> {
    check(file.name(), file.size_bytes(), mode)
}

/// Validate a bare name/size pair.
///
/// Lets the filesystem picker reject an oversized file from its metadata
/// before reading it into memory.
pub fn check(name: &str, size_bytes: u64, mode: ConversionMode) -> Result<(), ValidationError> {
    let policy = mode.policy();

    if size_bytes > policy.max_bytes {
        return Err(ValidationError::SizeExceedsLimit {
            name: name.to_string(),
            size_bytes,
            max_bytes: policy.max_bytes,
        });
    }

    if !mode.accepts_name(name) {
        return Err(ValidationError::InvalidType {
            name: name.to_string(),
            mode,
            accepted: policy.description,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::MAX_UPLOAD_BYTES;

    fn sample_name(mode: ConversionMode) -> &'static str {
        match mode {
            ConversionMode::ImageToPdf => "photo.png",
            ConversionMode::DocxToPdf => "letter.docx",
            ConversionMode::TextToPdf => "notes.txt",
        }
    }

    #[test]
    fn oversized_is_rejected_for_every_mode_regardless_of_extension() {
        for mode in ConversionMode::all() {
            for name in [sample_name(mode), "wrong.exe"] {
                let err = check(name, MAX_UPLOAD_BYTES + 1, mode).unwrap_err();
                assert!(
                    matches!(err, ValidationError::SizeExceedsLimit { .. }),
                    "{mode}/{name}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn wrong_extension_within_limit_is_rejected() {
        for mode in ConversionMode::all() {
            let err = check("archive.zip", 1024, mode).unwrap_err();
            match err {
                ValidationError::InvalidType { accepted, .. } => {
                    assert_eq!(accepted, mode.policy().description)
                }
                other => panic!("expected InvalidType, got {other:?}"),
            }
        }
    }

    #[test]
    fn matching_extension_within_limit_is_accepted() {
        for mode in ConversionMode::all() {
            assert_eq!(check(sample_name(mode), 2048, mode), Ok(()));
            // The limit itself is inclusive.
            assert_eq!(check(sample_name(mode), MAX_UPLOAD_BYTES, mode), Ok(()));
        }
    }

    #[test]
    fn file_accepted_by_one_mode_is_rejected_by_another() {
        assert!(check("notes.txt", 10, ConversionMode::DocxToPdf).is_err());
        assert!(check("photo.jpg", 10, ConversionMode::TextToPdf).is_err());
    }

    #[test]
    fn text_file_is_accepted_for_text_mode() {
        let file = CandidateFile::new("draft.txt", vec![b'a'; 2 * 1024]);
        assert_eq!(validate(&file, ConversionMode::TextToPdf), Ok(()));
    }

    #[test]
    fn eleven_megabyte_png_is_rejected() {
        let file = CandidateFile::new("big.png", vec![0u8; 11 * 1024 * 1024]);
        let err = validate(&file, ConversionMode::ImageToPdf).unwrap_err();
        assert!(err.to_string().starts_with("size exceeds limit"));
    }
}
