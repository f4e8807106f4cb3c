//! Binding to the pdfium shared library.
//!
//! PDF text extraction and Markdown page rendering both go through pdfium.
//! Binding is done per blocking task (a `Pdfium` handle never crosses an
//! await point), so this module only resolves *which* library to load.
//!
//! Resolution order (first hit wins):
//!
//! 1. `ConversionConfig::pdfium_library_path` — a library file or a
//!    directory containing one
//! 2. `PDFIUM_LIB_PATH`
//! 3. the working directory
//! 4. the system library search path

use crate::error::Doc2MdError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an existing pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// File name of the pdfium shared library on this platform.
pub fn platform_library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "pdfium.dll"
    } else if cfg!(target_os = "macos") {
        "libpdfium.dylib"
    } else {
        "libpdfium.so"
    }
}

/// Turn a configured path (file or directory) into a library file path.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(platform_library_name())
    } else {
        path.to_path_buf()
    }
}

/// Candidate library files, most specific first.
fn candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(p) = configured {
        out.push(library_file(p));
    }
    if let Ok(env_path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !env_path.is_empty() {
            out.push(library_file(Path::new(&env_path)));
        }
    }
    out.push(Path::new(".").join(platform_library_name()));
    out
}

/// Bind to pdfium, trying each candidate and then the system library.
pub fn bind(configured: Option<&Path>) -> Result<Pdfium, Doc2MdError> {
    let mut failures = Vec::new();

    for candidate in candidates(configured) {
        if !candidate.exists() {
            continue;
        }
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", candidate.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => failures.push(format!("{}: {}", candidate.display(), e)),
        }
    }

    Pdfium::bind_to_system_library()
        .map(|bindings| {
            debug!("Bound system pdfium library");
            Pdfium::new(bindings)
        })
        .map_err(|e| {
            failures.push(format!("system library: {}", e));
            Doc2MdError::PdfiumBindingFailed(failures.join("; "))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_resolves_to_platform_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = library_file(dir.path());
        assert_eq!(file, dir.path().join(platform_library_name()));
    }

    #[test]
    fn explicit_file_is_kept() {
        let p = Path::new("/opt/pdfium/lib/custom.so");
        assert_eq!(library_file(p), p.to_path_buf());
    }

    #[test]
    fn configured_path_comes_first() {
        let list = candidates(Some(Path::new("/opt/custom.so")));
        assert_eq!(list[0], PathBuf::from("/opt/custom.so"));
        assert_eq!(
            list.last().map(|p| p.file_name().is_some()),
            Some(true)
        );
    }
}
