//! Output files: naming and writing per-unit artifacts.
//!
//! Every unit `n` of a document with base name `base` owns three paths in
//! the output directory:
//!
//! - `{base}_page_{n}.md`  — classified Markdown (always written)
//! - `{base}_page_{n}.png` — rendered page (when rendering is enabled)
//! - `{base}_page_{n}.npy` — image embedding (when an embedding service is set)
//!
//! Names are computed up front, so concurrent units never contend for a file.

use crate::error::{Doc2MdError, UnitError};
use image::{DynamicImage, ImageFormat};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output paths of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPaths {
    pub markdown: PathBuf,
    pub image: PathBuf,
    pub embedding: PathBuf,
}

/// Compute the output paths of unit `index` (1-based).
pub fn unit_paths(output_dir: &Path, base_name: &str, index: usize) -> UnitPaths {
    let stem = format!("{}_page_{}", base_name, index);
    UnitPaths {
        markdown: output_dir.join(format!("{}.md", stem)),
        image: output_dir.join(format!("{}.png", stem)),
        embedding: output_dir.join(format!("{}.npy", stem)),
    }
}

/// Create the output directory if needed.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), Doc2MdError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| Doc2MdError::OutputDirUnavailable {
            path: dir.to_path_buf(),
            source,
        })
}

/// Write a unit's Markdown atomically.
///
/// The content goes to a named temp file in the same directory, which is
/// then persisted over `path`. Readers never observe a partial file.
pub async fn write_markdown(unit: usize, path: &Path, markdown: &str) -> Result<(), UnitError> {
    let target = path.to_path_buf();
    let content = markdown.to_owned();
    let result = tokio::task::spawn_blocking(move || persist_atomically(&target, &content))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    match result {
        Ok(()) => {
            debug!("Wrote {} ({} bytes)", path.display(), markdown.len());
            Ok(())
        }
        Err(detail) => Err(UnitError::WriteFailed {
            unit,
            path: path.to_path_buf(),
            detail,
        }),
    }
}

fn persist_atomically(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Save a rendered page as PNG. Blocking.
pub fn write_png(unit: usize, path: &Path, image: &DynamicImage) -> Result<(), UnitError> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| UnitError::RenderFailed {
            unit,
            detail: format!("Saving {} failed: {}", path.display(), e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn paths_follow_naming_scheme() {
        let p = unit_paths(Path::new("out"), "report", 3);
        assert_eq!(p.markdown, PathBuf::from("out/report_page_3.md"));
        assert_eq!(p.image, PathBuf::from("out/report_page_3.png"));
        assert_eq!(p.embedding, PathBuf::from("out/report_page_3.npy"));
    }

    #[tokio::test]
    async fn markdown_write_is_atomic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc_page_1.md");
        write_markdown(1, &path, "# Title").await.expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "# Title");
        let leftovers = std::fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn markdown_write_failure_is_a_unit_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("doc_page_2.md");
        let err = write_markdown(2, &path, "x").await.unwrap_err();
        assert!(matches!(err, UnitError::WriteFailed { unit: 2, .. }));
    }

    #[tokio::test]
    async fn creates_nested_output_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        ensure_output_dir(&nested).await.expect("create");
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn output_dir_over_a_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("taken");
        std::fs::write(&file, b"x").expect("write");
        let err = ensure_output_dir(&file.join("sub")).await.unwrap_err();
        assert!(matches!(err, Doc2MdError::OutputDirUnavailable { .. }));
    }

    #[test]
    fn png_roundtrip_dimensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc_page_1.png");
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([255, 0, 0])));
        write_png(1, &path, &img).expect("save");
        let back = image::open(&path).expect("open");
        assert_eq!((back.width(), back.height()), (20, 10));
    }
}
