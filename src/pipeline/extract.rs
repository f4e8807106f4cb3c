//! Text extraction: split a source document into units of raw text.
//!
//! | Kind | Unit | Source |
//! |------|------|--------|
//! | PDF  | page | pdfium text layer, one string per page |
//! | DOCX | paragraph | body-level `<w:p>` elements of `word/document.xml` |
//! | TXT  | line | the file split on `\n` |
//!
//! Extraction is blocking (pdfium, zip, file reads) and runs inside
//! `spawn_blocking`. Line endings are normalised to `\n` for every kind so
//! the classifier never sees `\r`.

use crate::config::ConversionConfig;
use crate::error::{Doc2MdError, UnitError};
use crate::pipeline::input::{DocumentKind, ResolvedInput};
use crate::pipeline::pdfium;
use pdfium_render::prelude::*;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

const DOCX_BODY: &str = "word/document.xml";

/// Raw text of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    /// 1-based unit index.
    pub index: usize,
    /// The unit's text, or why it could not be read.
    pub text: Result<String, UnitError>,
}

impl SourceUnit {
    fn ok(index: usize, text: String) -> Self {
        Self {
            index,
            text: Ok(text),
        }
    }
}

/// Extract all units of `input`.
pub async fn extract_units(
    input: &ResolvedInput,
    config: &ConversionConfig,
) -> Result<Vec<SourceUnit>, Doc2MdError> {
    let path = input.path.clone();
    let kind = input.kind;
    let password = config.password.clone();
    let library = config.pdfium_library_path.clone();

    tokio::task::spawn_blocking(move || {
        extract_units_blocking(&path, kind, password.as_deref(), library.as_deref())
    })
    .await
    .map_err(|e| Doc2MdError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of unit extraction.
pub fn extract_units_blocking(
    path: &Path,
    kind: DocumentKind,
    password: Option<&str>,
    pdfium_library: Option<&Path>,
) -> Result<Vec<SourceUnit>, Doc2MdError> {
    let units = match kind {
        DocumentKind::Pdf => extract_pdf(path, password, pdfium_library)?,
        DocumentKind::Docx => extract_docx(path)?,
        DocumentKind::Txt => extract_txt(path)?,
    };
    info!(
        "Extracted {} {}s from '{}'",
        units.len(),
        kind.unit_name(),
        path.display()
    );
    Ok(units)
}

/// Replace `\r\n` and lone `\r` with `\n`.
pub fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── PDF ──────────────────────────────────────────────────────────────────────

fn extract_pdf(
    path: &Path,
    password: Option<&str>,
    pdfium_library: Option<&Path>,
) -> Result<Vec<SourceUnit>, Doc2MdError> {
    let pdfium = pdfium::bind(pdfium_library)?;

    let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            Doc2MdError::PasswordRequired {
                path: path.to_path_buf(),
            }
        } else {
            Doc2MdError::CorruptDocument {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let mut units = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let index = idx + 1;
        let text = page
            .text()
            .map(|t| normalise_line_endings(&t.all()))
            .map_err(|e| {
                warn!("Page {}: text layer unreadable: {:?}", index, e);
                UnitError::ExtractionFailed {
                    unit: index,
                    detail: format!("{:?}", e),
                }
            });
        if let Ok(ref t) = text {
            debug!("Page {} → {} chars", index, t.len());
        }
        units.push(SourceUnit { index, text });
    }
    Ok(units)
}

// ── DOCX ─────────────────────────────────────────────────────────────────────

fn extract_docx(path: &Path) -> Result<Vec<SourceUnit>, Doc2MdError> {
    let file = std::fs::File::open(path).map_err(|source| Doc2MdError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| Doc2MdError::NotADocx {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|_| Doc2MdError::NotADocx {
            path: path.to_path_buf(),
            detail: format!("missing {}", DOCX_BODY),
        })?
        .read_to_string(&mut xml)
        .map_err(|e| corrupt(path, e.to_string()))?;

    let paragraphs = docx_paragraphs(&xml).map_err(|detail| corrupt(path, detail))?;
    Ok(paragraphs
        .into_iter()
        .enumerate()
        .map(|(i, text)| SourceUnit::ok(i + 1, normalise_line_endings(&text)))
        .collect())
}

fn corrupt(path: &Path, detail: String) -> Doc2MdError {
    Doc2MdError::CorruptDocument {
        path: PathBuf::from(path),
        detail,
    }
}

/// Collect the text of every body-level paragraph in a WordprocessingML body.
///
/// Paragraphs inside tables are skipped. Within runs, `<w:tab/>` becomes a
/// tab and `<w:br/>` / `<w:cr/>` a newline.
pub fn docx_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut table_depth = 0usize;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"p" if table_depth == 0 => current = Some(String::new()),
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"p" if table_depth == 0 => paragraphs.push(String::new()),
                b"tab" if in_run => push_to(&mut current, "\t"),
                b"br" | b"cr" if in_run => push_to(&mut current, "\n"),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let s = t.unescape().map_err(|e| e.to_string())?;
                push_to(&mut current, &s);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"p" if table_depth == 0 => {
                    if let Some(text) = current.take() {
                        paragraphs.push(text);
                    }
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_to(current: &mut Option<String>, s: &str) {
    if let Some(text) = current.as_mut() {
        text.push_str(s);
    }
}

// ── TXT ──────────────────────────────────────────────────────────────────────

fn extract_txt(path: &Path) -> Result<Vec<SourceUnit>, Doc2MdError> {
    let bytes = std::fs::read(path).map_err(|source| Doc2MdError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes)
        .map_err(|e| corrupt(path, format!("not valid UTF-8: {}", e)))?;
    Ok(text_lines(&text)
        .into_iter()
        .enumerate()
        .map(|(i, line)| SourceUnit::ok(i + 1, line))
        .collect())
}

/// Split plain text into line units.
///
/// A single trailing newline does not produce an extra empty unit; blank
/// lines elsewhere do. A plain `split('\n')` would turn `"a\nb\n"` into
/// three units with an empty `_page_3.md`; here it is two.
pub fn text_lines(text: &str) -> Vec<String> {
    let normalised = normalise_line_endings(text);
    let body = normalised.strip_suffix('\n').unwrap_or(&normalised);
    if body.is_empty() && normalised.is_empty() {
        return Vec::new();
    }
    body.split('\n').map(str::to_string).collect()
}
