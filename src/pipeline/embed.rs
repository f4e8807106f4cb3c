//! Image embeddings: turn a rendered page into a feature tensor and persist
//! it as a NumPy `.npy` file.
//!
//! The model sits behind [`ImageEmbedder`]. [`EmbeddingService`] owns one
//! embedder and manages its lifecycle:
//!
//! ```text
//!   Uninit ──init()/first use──▶ Ready ──shutdown()──▶ Shutdown
//!     │
//!     └──── loader fails ──────▶ Disabled (logged once, embeddings skipped)
//! ```
//!
//! Two embedders ship with the crate. Both start from the same ImageNet
//! preprocessing ([`preprocess`]: resize 256, centre crop 224, normalise):
//!
//! - `OnnxEmbedder` (feature `onnx`, in [`crate::pipeline::onnx`]) runs an
//!   ONNX export of `microsoft/swin-base-patch4-window7-224` and returns its
//!   `last_hidden_state`, a `[1, 49, 1024]` tensor.
//! - [`PatchPoolEmbedder`] needs no weights. It average-pools 32×32 patches
//!   into a `[1, 49, 3]` tensor.

use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Errors from loading or running an embedding model.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("Tensor shape {shape:?} needs {expected} values, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Failed to load embedding model: {0}")]
    Load(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    /// Errors from embedders outside this crate.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A dense float tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Embedding {
    /// Create an embedding, checking that `data` fills `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, EmbedError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(EmbedError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Serialise as NumPy format 1.0, little-endian `f32`, C order.
    pub fn to_npy_bytes(&self) -> Vec<u8> {
        let shape = match self.shape.as_slice() {
            [n] => format!("({},)", n),
            dims => format!(
                "({})",
                dims.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let mut header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': {}, }}",
            shape
        );
        // magic (6) + version (2) + header length (2) + header must be a
        // multiple of 64, with the header ending in '\n'.
        let unpadded = 10 + header.len() + 1;
        let padding = (64 - unpadded % 64) % 64;
        header.push_str(&" ".repeat(padding));
        header.push('\n');

        let mut out = Vec::with_capacity(10 + header.len() + self.data.len() * 4);
        out.extend_from_slice(b"\x93NUMPY");
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for v in &self.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Write the `.npy` file.
    pub fn write_npy(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.to_npy_bytes())?;
        file.flush()
    }
}

/// Produces a feature tensor from an image.
pub trait ImageEmbedder: Send + Sync {
    /// Identifier used in logs and config dumps.
    fn name(&self) -> &str;

    fn embed(&self, image: &DynamicImage) -> Result<Embedding, EmbedError>;
}

// ── Preprocessing ────────────────────────────────────────────────────────────

const RESIZE_SHORT_SIDE: u32 = 256;
/// Side of the square model input.
pub const CROP_SIZE: u32 = 224;
const PATCH_SIZE: u32 = 32;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize the short side to 256 and take the 224×224 centre.
pub fn preprocess(image: &DynamicImage) -> Result<image::RgbImage, EmbedError> {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return Err(EmbedError::EmptyImage);
    }
    let (nw, nh) = if w <= h {
        let nh = (h as f64 * RESIZE_SHORT_SIDE as f64 / w as f64).round() as u32;
        (RESIZE_SHORT_SIDE, nh.max(RESIZE_SHORT_SIDE))
    } else {
        let nw = (w as f64 * RESIZE_SHORT_SIDE as f64 / h as f64).round() as u32;
        (nw.max(RESIZE_SHORT_SIDE), RESIZE_SHORT_SIDE)
    };
    let resized = image.resize_exact(nw, nh, FilterType::Triangle);
    let x = (nw - CROP_SIZE) / 2;
    let y = (nh - CROP_SIZE) / 2;
    Ok(resized.crop_imm(x, y, CROP_SIZE, CROP_SIZE).to_rgb8())
}

fn normalise(value: u8, channel: usize) -> f32 {
    (value as f32 / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
}

/// ImageNet-normalised pixels of a preprocessed crop in `[1, 3, H, W]` order.
pub fn to_nchw(rgb: &image::RgbImage) -> Vec<f32> {
    let (w, h) = rgb.dimensions();
    let plane = (w * h) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (x, y, p) in rgb.enumerate_pixels() {
        let offset = (y * w + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = normalise(p[c], c);
        }
    }
    data
}

// ── Weight-free embedder ─────────────────────────────────────────────────────

/// Weight-free embedder: ImageNet-normalised mean colour of each 32×32 patch
/// of the 224×224 centre crop.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchPoolEmbedder;

impl ImageEmbedder for PatchPoolEmbedder {
    fn name(&self) -> &str {
        "patch-pool-224"
    }

    fn embed(&self, image: &DynamicImage) -> Result<Embedding, EmbedError> {
        let rgb = preprocess(image)?;
        let grid = CROP_SIZE / PATCH_SIZE;
        let area = (PATCH_SIZE * PATCH_SIZE) as f32;
        let mut data = Vec::with_capacity((grid * grid * 3) as usize);

        for py in 0..grid {
            for px in 0..grid {
                let mut sum = [0f32; 3];
                for y in py * PATCH_SIZE..(py + 1) * PATCH_SIZE {
                    for x in px * PATCH_SIZE..(px + 1) * PATCH_SIZE {
                        let p = rgb.get_pixel(x, y);
                        for c in 0..3 {
                            sum[c] += p[c] as f32 / 255.0;
                        }
                    }
                }
                for c in 0..3 {
                    data.push((sum[c] / area - IMAGENET_MEAN[c]) / IMAGENET_STD[c]);
                }
            }
        }

        Embedding::new(vec![1, (grid * grid) as usize, 3], data)
    }
}

// ── Service ──────────────────────────────────────────────────────────────────

type Loader = Box<dyn Fn() -> Result<Arc<dyn ImageEmbedder>, EmbedError> + Send + Sync>;

enum State {
    Uninit,
    Ready(Arc<dyn ImageEmbedder>),
    Disabled(String),
    Shutdown,
}

/// Lifecycle state of an [`EmbeddingService`], for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingStatus {
    NotLoaded,
    Ready,
    Disabled(String),
    Shutdown,
}

/// Owns an embedding model and loads it on demand.
///
/// Shared across units as `Arc<EmbeddingService>`; all methods take `&self`.
pub struct EmbeddingService {
    name: String,
    loader: Loader,
    state: Mutex<State>,
}

impl EmbeddingService {
    /// A service that runs `loader` on first use.
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ImageEmbedder>, EmbedError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            state: Mutex::new(State::Uninit),
        }
    }

    /// A service around the built-in [`PatchPoolEmbedder`].
    pub fn patch_pool() -> Self {
        Self::new(PatchPoolEmbedder.name(), || {
            Ok(Arc::new(PatchPoolEmbedder) as Arc<dyn ImageEmbedder>)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> EmbeddingStatus {
        match &*self.lock() {
            State::Uninit => EmbeddingStatus::NotLoaded,
            State::Ready(_) => EmbeddingStatus::Ready,
            State::Disabled(reason) => EmbeddingStatus::Disabled(reason.clone()),
            State::Shutdown => EmbeddingStatus::Shutdown,
        }
    }

    /// Load the model now. Returns whether the service is ready.
    ///
    /// Calling `init` after [`shutdown`](Self::shutdown) loads the model again.
    pub fn init(&self) -> bool {
        let mut state = self.lock();
        if matches!(*state, State::Shutdown) {
            *state = State::Uninit;
        }
        self.load(&mut state).is_some()
    }

    /// Drop the model. Later calls to [`embed`](Self::embed) return `None`
    /// until [`init`](Self::init) is called again.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if matches!(*state, State::Ready(_)) {
            info!("Embedding model '{}' unloaded", self.name);
        }
        *state = State::Shutdown;
    }

    /// The loaded embedder, loading it first if needed.
    pub fn embedder(&self) -> Option<Arc<dyn ImageEmbedder>> {
        let mut state = self.lock();
        self.load(&mut state)
    }

    fn load(&self, state: &mut State) -> Option<Arc<dyn ImageEmbedder>> {
        match state {
            State::Ready(embedder) => Some(Arc::clone(embedder)),
            State::Disabled(_) | State::Shutdown => None,
            State::Uninit => match (self.loader)() {
                Ok(embedder) => {
                    info!("Embedding model '{}' loaded", self.name);
                    *state = State::Ready(Arc::clone(&embedder));
                    Some(embedder)
                }
                Err(e) => {
                    warn!(
                        "Embedding model '{}' failed to load, embeddings disabled: {}",
                        self.name, e
                    );
                    *state = State::Disabled(e.to_string());
                    None
                }
            },
        }
    }

    /// Embed `image`. `None` means the service is disabled or shut down.
    pub fn embed(&self, image: &DynamicImage) -> Option<Result<Embedding, EmbedError>> {
        let embedder = self.embedder()?;
        let result = embedder.embed(image);
        if let Ok(ref e) = result {
            debug!("Embedded image → shape {:?}", e.shape);
        }
        Some(result)
    }
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    #[test]
    fn npy_header_is_aligned() {
        let e = Embedding::new(vec![1, 49, 3], vec![0.0; 147]).expect("shape");
        let bytes = e.to_npy_bytes();
        assert_eq!(&bytes[..6], b"\x93NUMPY");
        assert_eq!(&bytes[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).expect("ascii");
        assert!(header.contains("'descr': '<f4'"));
        assert!(header.contains("'shape': (1, 49, 3)"));
        assert!(header.ends_with('\n'));
        assert_eq!(bytes.len(), 10 + header_len + 147 * 4);
    }

    #[test]
    fn npy_one_dimensional_shape() {
        let e = Embedding::new(vec![2], vec![1.0, -2.5]).expect("shape");
        let bytes = e.to_npy_bytes();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).expect("ascii");
        assert!(header.contains("'shape': (2,)"));
        let data = &bytes[10 + header_len..];
        assert_eq!(data, [1.0f32.to_le_bytes(), (-2.5f32).to_le_bytes()].concat());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = Embedding::new(vec![2, 2], vec![0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            EmbedError::ShapeMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = PatchPoolEmbedder
            .embed(&DynamicImage::new_rgb8(0, 0))
            .unwrap_err();
        assert!(matches!(err, EmbedError::EmptyImage));
    }

    #[test]
    fn nchw_layout_is_channel_major() {
        let mut rgb = RgbImage::from_pixel(2, 1, Rgb([0, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([255, 0, 0]));
        let data = to_nchw(&rgb);
        assert_eq!(data.len(), 6);
        // red plane: pixel 0 then pixel 1
        assert!(data[0] < 0.0);
        assert!(data[1] > 2.0);
        // green and blue planes stay at the black level
        assert_eq!(data[2], data[3]);
        assert_eq!(data[4], data[5]);
    }

    #[test]
    fn preprocess_yields_model_input_size() {
        let crop = preprocess(&solid(595, 842, [1, 2, 3])).expect("crop");
        assert_eq!(crop.dimensions(), (CROP_SIZE, CROP_SIZE));
    }

    #[test]
    fn patch_pool_shape_and_values() {
        let e = PatchPoolEmbedder
            .embed(&solid(595, 842, [255, 255, 255]))
            .expect("embed");
        assert_eq!(e.shape, vec![1, 49, 3]);
        assert_eq!(e.data.len(), 147);
        for (i, v) in e.data.iter().enumerate() {
            let c = i % 3;
            let expected = (1.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            assert!((v - expected).abs() < 0.02, "channel {}: {}", c, v);
        }
    }

    #[test]
    fn patch_pool_handles_landscape_and_tiny_images() {
        assert!(PatchPoolEmbedder.embed(&solid(1000, 300, [0, 0, 0])).is_ok());
        assert!(PatchPoolEmbedder.embed(&solid(3, 5, [10, 20, 30])).is_ok());
    }

    #[test]
    fn service_loads_lazily_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let service = EmbeddingService::new("counting", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(PatchPoolEmbedder) as Arc<dyn ImageEmbedder>)
        });

        assert_eq!(service.status(), EmbeddingStatus::NotLoaded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let image = solid(64, 64, [128, 128, 128]);
        assert!(service.embed(&image).is_some());
        assert!(service.embed(&image).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.status(), EmbeddingStatus::Ready);
    }

    #[test]
    fn failed_init_disables_service() {
        let service = EmbeddingService::new("broken", || {
            Err(EmbedError::Load("weights missing".into()))
        });
        assert!(!service.init());
        assert_eq!(
            service.status(),
            EmbeddingStatus::Disabled("Failed to load embedding model: weights missing".into())
        );
        assert!(service.embed(&solid(8, 8, [0, 0, 0])).is_none());
    }

    #[test]
    fn shutdown_and_reinit() {
        let service = EmbeddingService::patch_pool();
        assert!(service.init());
        service.shutdown();
        assert_eq!(service.status(), EmbeddingStatus::Shutdown);
        assert!(service.embed(&solid(8, 8, [0, 0, 0])).is_none());
        assert!(service.init());
        assert_eq!(service.status(), EmbeddingStatus::Ready);
    }

    #[test]
    fn writes_npy_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc_page_1.npy");
        let e = Embedding::new(vec![1, 2], vec![0.5, 0.25]).expect("shape");
        e.write_npy(&path).expect("write");
        assert_eq!(std::fs::read(&path).expect("read"), e.to_npy_bytes());
    }
}
