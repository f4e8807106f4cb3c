//! # doc2md
//!
//! Convert PDF, DOCX and plain-text documents into per-unit Markdown files,
//! with an optional rendered page image and image embedding for each unit.
//!
//! Text pulled out of documents often already carries Markdown-like
//! structure (`# headings`, `- items`, `> quotes`, fenced code) with sloppy
//! spacing. This crate normalises it with a fixed rule table, writes one
//! Markdown file per page (PDF), paragraph (DOCX) or line (TXT), and renders
//! each fragment to a PNG.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / DOCX / TXT
//!  │
//!  ├─ 1. Input     detect kind from extension + magic bytes
//!  ├─ 2. Extract   split into units (pdfium text layer, WordprocessingML, lines)
//!  ├─ 3. Classify  segment + per-line rule table → canonical Markdown
//!  ├─ 4. Sink      {base}_page_{n}.md (atomic write)
//!  ├─ 5. Render    pulldown-cmark layout → pdfium page → {base}_page_{n}.png
//!  └─ 6. Embed     optional feature tensor → {base}_page_{n}.npy
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("report.docx", "out", &config).await?;
//!     eprintln!(
//!         "{} units written, {} images",
//!         output.unit_count(),
//!         output.stats.rendered_images
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Only the classifier is needed for in-memory text:
//!
//! ```rust
//! assert_eq!(doc2md::classify("3.   hello"), "3. hello");
//! assert_eq!(doc2md::markdown::convert_text("#  Title\n\n---"), "# Title\n\n---");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `onnx`  | on      | `OnnxEmbedder`: model-backed image embeddings through tract-onnx |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doc2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native Library
//!
//! PDF extraction and page rendering use pdfium. Without it, PDF input
//! fails up front, while TXT and DOCX units still get their Markdown and
//! record a render failure each.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, UnitSelection};
pub use convert::{convert, convert_sync, convert_text_file, inspect};
pub use error::{Doc2MdError, UnitError};
pub use markdown::{classify, ConstructKind, ConstructStats, LineClassifier, LinkPolicy};
pub use output::{ConversionOutput, ConversionStats, DocumentInfo, UnitResult};
pub use pipeline::embed::{EmbedError, EmbeddingService, ImageEmbedder, PatchPoolEmbedder};
#[cfg(feature = "onnx")]
pub use pipeline::onnx::OnnxEmbedder;
pub use pipeline::input::DocumentKind;
pub use pipeline::render::LayoutOptions;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, UnitStream};
