//! Conversion results.
//!
//! A conversion produces one [`UnitResult`] per selected unit plus document
//! level [`ConversionStats`]. Everything here is `Serialize` so the CLI can
//! emit it as JSON.

use crate::error::{Doc2MdError, UnitError};
use crate::markdown::ConstructStats;
use crate::pipeline::input::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Facts about a source document, available without converting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub kind: DocumentKind,
    /// File stem used for output names (`{base_name}_page_{n}.md`).
    pub base_name: String,
    /// Pages (PDF), paragraphs (DOCX) or lines (TXT).
    pub unit_count: usize,
    pub file_size: u64,
}

/// The outcome of one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResult {
    /// 1-based unit index.
    pub index: usize,
    /// Classified Markdown text.
    pub markdown: String,
    /// Where the Markdown was written, if the write succeeded.
    pub markdown_path: Option<PathBuf>,
    /// Where the rendered image was written, if rendering ran and succeeded.
    pub image_path: Option<PathBuf>,
    /// Where the embedding was written, if the embedding service produced one.
    pub embedding_path: Option<PathBuf>,
    /// Constructs recognised in this unit.
    pub constructs: ConstructStats,
    /// Non-fatal errors, in the order they occurred.
    pub errors: Vec<UnitError>,
    pub duration_ms: u64,
}

impl UnitResult {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            markdown: String::new(),
            markdown_path: None,
            image_path: None,
            embedding_path: None,
            constructs: ConstructStats::default(),
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// A unit succeeded if its Markdown file exists.
    pub fn is_success(&self) -> bool {
        self.markdown_path.is_some() && !self.errors.iter().any(UnitError::is_fatal_for_unit)
    }
}

/// Document-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_units: usize,
    pub processed_units: usize,
    pub failed_units: usize,
    /// Units left out by the unit selection.
    pub skipped_units: usize,
    pub rendered_images: usize,
    pub render_failures: usize,
    pub embeddings: usize,
    pub total_duration_ms: u64,
    pub extract_duration_ms: u64,
}

/// Everything a conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub document: DocumentInfo,
    pub output_dir: PathBuf,
    /// Unit results sorted by index.
    pub units: Vec<UnitResult>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Number of units whose Markdown file was written.
    pub fn unit_count(&self) -> usize {
        self.stats.processed_units
    }

    /// Treat any failed unit as an error.
    pub fn into_result(self) -> Result<Self, Doc2MdError> {
        if self.stats.failed_units > 0 {
            return Err(Doc2MdError::PartialFailure {
                success: self.stats.processed_units,
                failed: self.stats.failed_units,
                total: self.stats.processed_units + self.stats.failed_units,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(processed: usize, failed: usize) -> ConversionOutput {
        ConversionOutput {
            document: DocumentInfo {
                path: PathBuf::from("notes.txt"),
                kind: DocumentKind::Txt,
                base_name: "notes".into(),
                unit_count: processed + failed,
                file_size: 12,
            },
            output_dir: PathBuf::from("out"),
            units: Vec::new(),
            stats: ConversionStats {
                total_units: processed + failed,
                processed_units: processed,
                failed_units: failed,
                ..ConversionStats::default()
            },
        }
    }

    #[test]
    fn into_result_ok_without_failures() {
        let out = output(3, 0).into_result().expect("no failures");
        assert_eq!(out.unit_count(), 3);
    }

    #[test]
    fn into_result_reports_partial_failure() {
        let err = output(2, 1).into_result().unwrap_err();
        assert!(matches!(
            err,
            Doc2MdError::PartialFailure {
                success: 2,
                failed: 1,
                total: 3
            }
        ));
    }

    #[test]
    fn render_failure_keeps_unit_successful() {
        let mut unit = UnitResult::new(1);
        unit.markdown_path = Some(PathBuf::from("out/notes_page_1.md"));
        unit.errors.push(UnitError::RenderFailed {
            unit: 1,
            detail: "boom".into(),
        });
        assert!(unit.is_success());
    }
}
