//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so a
//! config can be shared across tasks, logged, and compared between runs.

use crate::error::Doc2MdError;
use crate::markdown::LinkPolicy;
use crate::pipeline::embed::EmbeddingService;
use crate::pipeline::render::LayoutOptions;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Lowest accepted rasterisation resolution.
pub const MIN_DPI: u32 = 72;
/// Highest accepted rasterisation resolution.
pub const MAX_DPI: u32 = 600;

/// Configuration for a document conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2md::{ConversionConfig, LinkPolicy};
///
/// let config = ConversionConfig::builder()
///     .dpi(150)
///     .concurrency(8)
///     .link_policy(LinkPolicy::PreserveSurrounding)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Resolution used when rasterising each rendered Markdown page. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Maximum image dimension (width or height) in pixels. Default: 4000.
    ///
    /// Caps either dimension independently of DPI, scaling the other
    /// proportionally.
    pub max_rendered_pixels: u32,

    /// Number of units processed at once. Default: 4.
    pub concurrency: usize,

    /// Link handling for lines that contain `[text](url)`. Default: [`LinkPolicy::LinkOnly`].
    pub link_policy: LinkPolicy,

    /// Render a PNG next to every Markdown file. Default: true.
    pub render_images: bool,

    /// Page geometry and font sizes of the rendered image.
    pub layout: LayoutOptions,

    /// Unit selection. Default: all units.
    pub units: UnitSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Path to the pdfium shared library (file or directory).
    ///
    /// If None, `PDFIUM_LIB_PATH` is consulted, then the working directory,
    /// then the system library search path.
    pub pdfium_library_path: Option<PathBuf>,

    /// Image embedding service. If None, no `.npy` files are produced.
    pub embedding: Option<Arc<EmbeddingService>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 4000,
            concurrency: 4,
            link_policy: LinkPolicy::default(),
            render_images: true,
            layout: LayoutOptions::default(),
            units: UnitSelection::default(),
            password: None,
            pdfium_library_path: None,
            embedding: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("link_policy", &self.link_policy)
            .field("render_images", &self.render_images)
            .field("layout", &self.layout)
            .field("units", &self.units)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("embedding", &self.embedding.as_ref().map(|e| e.name()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn Callback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn link_policy(mut self, policy: LinkPolicy) -> Self {
        self.config.link_policy = policy;
        self
    }

    pub fn render_images(mut self, v: bool) -> Self {
        self.config.render_images = v;
        self
    }

    pub fn layout(mut self, layout: LayoutOptions) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn units(mut self, selection: UnitSelection) -> Self {
        self.config.units = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn embedding(mut self, service: Arc<EmbeddingService>) -> Self {
        self.config.embedding = Some(service);
        self
    }

    /// Attach a progress callback that receives per-unit events.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2MdError> {
        let c = &self.config;
        if c.dpi < MIN_DPI || c.dpi > MAX_DPI {
            return Err(Doc2MdError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(Doc2MdError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which units of the document to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSelection {
    /// Convert all units (default).
    #[default]
    All,
    /// Convert a single unit (1-indexed).
    Single(usize),
    /// Convert a contiguous range of units (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific units (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl UnitSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed unit numbers.
    pub fn to_indices(&self, total_units: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            UnitSelection::All => (0..total_units).collect(),
            UnitSelection::Single(u) => {
                if *u >= 1 && *u <= total_units {
                    vec![u - 1]
                } else {
                    vec![]
                }
            }
            UnitSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_units);
                (s..e).collect()
            }
            UnitSelection::Set(units) => units
                .iter()
                .filter(|&&u| u >= 1 && u <= total_units)
                .map(|u| u - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_print_resolution() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 300);
        assert!(c.render_images);
        assert_eq!(c.link_policy, LinkPolicy::LinkOnly);
        assert!(c.embedding.is_none());
    }

    #[test]
    fn builder_clamps_values() {
        let c = ConversionConfig::builder()
            .dpi(10_000)
            .concurrency(0)
            .max_rendered_pixels(1)
            .build()
            .expect("clamped config is valid");
        assert_eq!(c.dpi, MAX_DPI);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn build_rejects_bad_layout() {
        let layout = LayoutOptions {
            margin_pt: 400.0,
            ..LayoutOptions::default()
        };
        let err = ConversionConfig::builder().layout(layout).build();
        assert!(matches!(err, Err(Doc2MdError::InvalidConfig(_))));
    }

    #[test]
    fn unit_selection_to_indices() {
        assert_eq!(UnitSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(UnitSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(UnitSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(UnitSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(
            UnitSelection::Set(vec![3, 1, 3, 9]).to_indices(4),
            vec![0, 2]
        );
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder()
            .password("hunter2")
            .build()
            .expect("valid");
        let s = format!("{c:?}");
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<redacted>"));
    }
}
