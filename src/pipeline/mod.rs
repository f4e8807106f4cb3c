//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements one step around the Markdown classifier in
//! [`crate::markdown`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ markdown ──▶ sink ──▶ render ──▶ embed
//! (path)    (units)     (classify)   (.md)    (.png)     (.npy)
//! ```
//!
//! 1. [`input`]   — validate the path and detect PDF / DOCX / TXT
//! 2. [`extract`] — split the document into units of raw text
//! 3. [`sink`]    — name and write each unit's files
//! 4. [`render`]  — lay Markdown out on a page and rasterise it through
//!    [`pdfium`]; runs in `spawn_blocking`
//! 5. [`embed`]   — optional image embedding written as `.npy`; the
//!    model-backed embedder lives in `onnx` (feature `onnx`)

pub mod embed;
pub mod extract;
pub mod input;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pdfium;
pub mod render;
pub mod sink;
