//! Input resolution: validate a user-supplied path and detect its kind.
//!
//! The kind is decided by extension (case-insensitive), then confirmed by
//! magic bytes for the binary containers so callers get a meaningful error
//! instead of a parser failure deep inside extraction.

use crate::error::Doc2MdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Supported source containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// One unit per page.
    Pdf,
    /// One unit per paragraph.
    Docx,
    /// One unit per line.
    Txt,
}

impl DocumentKind {
    /// Detect the kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Txt),
            _ => None,
        }
    }

    /// What one unit of this kind is called.
    pub fn unit_name(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "page",
            DocumentKind::Docx => "paragraph",
            DocumentKind::Txt => "line",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::Txt => "TXT",
        };
        f.write_str(s)
    }
}

/// A validated input document.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub kind: DocumentKind,
    /// File stem used to name every output file.
    pub base_name: String,
    pub file_size: u64,
}

/// Validate `path` and detect its [`DocumentKind`].
pub fn resolve_input(path: impl AsRef<Path>) -> Result<ResolvedInput, Doc2MdError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Doc2MdError::FileNotFound { path });
    }

    let kind = DocumentKind::from_path(&path)
        .ok_or_else(|| Doc2MdError::UnsupportedFormat { path: path.clone() })?;

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Doc2MdError::PermissionDenied { path });
        }
        Err(source) => return Err(Doc2MdError::ReadFailed { path, source }),
    };

    let file_size = file
        .metadata()
        .map(|m| m.len())
        .map_err(|source| Doc2MdError::ReadFailed {
            path: path.clone(),
            source,
        })?;

    let mut magic = [0u8; 4];
    let has_magic = file.read_exact(&mut magic).is_ok();
    match kind {
        DocumentKind::Pdf if !has_magic || &magic != PDF_MAGIC => {
            return Err(Doc2MdError::NotAPdf { path, magic });
        }
        DocumentKind::Docx if !has_magic || &magic != ZIP_MAGIC => {
            return Err(Doc2MdError::NotADocx {
                path,
                detail: "not a zip container".into(),
            });
        }
        _ => {}
    }

    let base_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    debug!("Resolved {} input: {}", kind, path.display());
    Ok(ResolvedInput {
        path,
        kind,
        base_name,
        file_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).expect("create");
        f.write_all(bytes).expect("write");
        path
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("a.docx")), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_path(Path::new("dir/a.Txt")), Some(DocumentKind::Txt));
        assert_eq!(DocumentKind::from_path(Path::new("a.doc")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn resolves_text_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "notes.txt", b"hello\n");
        let resolved = resolve_input(&path).expect("resolve");
        assert_eq!(resolved.kind, DocumentKind::Txt);
        assert_eq!(resolved.base_name, "notes");
        assert_eq!(resolved.file_size, 6);
    }

    #[test]
    fn missing_file() {
        let err = resolve_input("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, Doc2MdError::FileNotFound { .. }));
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "deck.pptx", b"PK\x03\x04");
        let err = resolve_input(&path).unwrap_err();
        assert!(matches!(err, Doc2MdError::UnsupportedFormat { .. }));
    }

    #[test]
    fn pdf_magic_is_checked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "fake.pdf", b"<html>");
        let err = resolve_input(&path).unwrap_err();
        assert!(matches!(err, Doc2MdError::NotAPdf { magic, .. } if &magic == b"<htm"));
    }

    #[test]
    fn docx_magic_is_checked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(dir.path(), "fake.docx", b"plain text");
        let err = resolve_input(&path).unwrap_err();
        assert!(matches!(err, Doc2MdError::NotADocx { .. }));
    }

    #[test]
    fn unit_names() {
        assert_eq!(DocumentKind::Pdf.unit_name(), "page");
        assert_eq!(DocumentKind::Docx.unit_name(), "paragraph");
        assert_eq!(DocumentKind::Txt.unit_name(), "line");
    }
}
