//! Error types for the doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Doc2MdError`] — **Fatal**: the conversion cannot proceed at all
//!   (missing input, unsupported format, unreadable container, output
//!   directory not writable). Returned as `Err(Doc2MdError)` from the
//!   top-level `convert*` functions.
//!
//! * [`UnitError`] — **Non-fatal**: one unit (page, paragraph or line)
//!   failed to write, render or embed, but every other unit is fine. Stored
//!   inside [`crate::output::UnitResult`] so callers can inspect partial
//!   success instead of losing the whole document to one bad unit.
//!
//! Line classification itself has no error outcome: every string maps to
//! some Markdown string.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2md library.
#[derive(Debug, Error)]
pub enum Doc2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not one of pdf, docx, txt.
    #[error("Unsupported file type '{path}'\nSupported: .pdf, .docx, .txt")]
    UnsupportedFormat { path: PathBuf },

    /// A `.pdf` file whose first bytes are not `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// A `.docx` file that is not a zip container with a document body.
    #[error("File is not a valid DOCX: '{path}': {detail}")]
    NotADocx { path: PathBuf, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The container opened but its content could not be read.
    #[error("Document '{path}' is corrupt: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    /// A PDF requires a password.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// Selected units exceed the actual unit count.
    #[error("Unit {unit} is out of range (document has {total} units)")]
    UnitOutOfRange { unit: usize, total: usize },

    /// Every selected unit failed; nothing was written.
    #[error("All {total} units failed.\nFirst error: {first_error}")]
    AllUnitsFailed { total: usize, first_error: String },

    /// Some units succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any unit failure as an error.
    #[error("{failed}/{total} units failed during conversion")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write to the output directory.
    #[error("Output directory '{path}' is not usable: {source}")]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read the input file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF extraction and image rendering need a pdfium shared library.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Or place libpdfium next to the working directory.\n\
  • Or pass --no-images to convert text documents without rendering.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single unit.
///
/// Stored in [`crate::output::UnitResult::errors`]. The conversion continues
/// with the next unit unless every unit fails.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// The unit's text could not be extracted.
    #[error("Unit {unit}: text extraction failed: {detail}")]
    ExtractionFailed { unit: usize, detail: String },

    /// The Markdown file could not be written.
    #[error("Unit {unit}: writing '{path}' failed: {detail}")]
    WriteFailed {
        unit: usize,
        path: PathBuf,
        detail: String,
    },

    /// Markdown → image rendering failed.
    #[error("Unit {unit}: rendering failed: {detail}")]
    RenderFailed { unit: usize, detail: String },

    /// The embedding could not be computed or saved.
    #[error("Unit {unit}: embedding failed: {detail}")]
    EmbeddingFailed { unit: usize, detail: String },
}

impl UnitError {
    /// The 1-based unit index this error belongs to.
    pub fn unit(&self) -> usize {
        match self {
            UnitError::ExtractionFailed { unit, .. }
            | UnitError::WriteFailed { unit, .. }
            | UnitError::RenderFailed { unit, .. }
            | UnitError::EmbeddingFailed { unit, .. } => *unit,
        }
    }

    /// Whether the error means no Markdown file exists for the unit.
    ///
    /// Render and embedding failures leave the Markdown in place.
    pub fn is_fatal_for_unit(&self) -> bool {
        matches!(
            self,
            UnitError::ExtractionFailed { .. } | UnitError::WriteFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Doc2MdError::PartialFailure {
            success: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn unsupported_format_lists_extensions() {
        let e = Doc2MdError::UnsupportedFormat {
            path: PathBuf::from("slides.pptx"),
        };
        let msg = e.to_string();
        assert!(msg.contains("slides.pptx"));
        assert!(msg.contains(".docx"));
    }

    #[test]
    fn unit_error_index() {
        let e = UnitError::RenderFailed {
            unit: 4,
            detail: "no pdfium".into(),
        };
        assert_eq!(e.unit(), 4);
        assert!(!e.is_fatal_for_unit());
        assert!(e.to_string().contains("Unit 4"));
    }

    #[test]
    fn write_failure_is_fatal_for_unit() {
        let e = UnitError::WriteFailed {
            unit: 2,
            path: PathBuf::from("/out/doc_page_2.md"),
            detail: "disk full".into(),
        };
        assert!(e.is_fatal_for_unit());
        assert!(e.to_string().contains("doc_page_2.md"));
    }

    #[test]
    fn unit_error_serialises() {
        let e = UnitError::EmbeddingFailed {
            unit: 1,
            detail: "model disabled".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        let back: UnitError = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, e);
    }
}
