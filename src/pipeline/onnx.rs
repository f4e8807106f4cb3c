//! Model-backed image embeddings through tract-onnx.
//!
//! [`OnnxEmbedder`] loads an ONNX export of a vision transformer and runs
//! it on CPU. The expected model is `microsoft/swin-base-patch4-window7-224`
//! exported with a single `pixel_values` input of shape `[1, 3, 224, 224]`;
//! its first output, `last_hidden_state`, is a `[1, 49, 1024]` tensor and
//! becomes the unit's `.npy`.
//!
//! ```bash
//! optimum-cli export onnx --model microsoft/swin-base-patch4-window7-224 swin/
//! doc2md --embedding-model swin/model.onnx report.pdf -o out/
//! ```

use crate::pipeline::embed::{
    preprocess, to_nchw, EmbedError, Embedding, EmbeddingService, ImageEmbedder, CROP_SIZE,
};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tract_onnx::prelude::*;

type TractPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Environment variable naming the ONNX model used for embeddings.
pub const EMBEDDING_MODEL_ENV: &str = "DOC2MD_EMBEDDING_MODEL";

/// Embedder running an ONNX vision model.
pub struct OnnxEmbedder {
    name: String,
    plan: TractPlan,
}

impl OnnxEmbedder {
    /// Load and optimise the model at `path` for a fixed `[1, 3, 224, 224]`
    /// input.
    pub fn load(path: &Path) -> Result<Self, EmbedError> {
        if !path.exists() {
            return Err(EmbedError::Load(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let side = CROP_SIZE as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, side, side]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| EmbedError::Load(format!("{}: {}", path.display(), e)))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());
        debug!("Loaded ONNX embedding model '{}' from {}", name, path.display());
        Ok(Self { name, plan })
    }
}

impl ImageEmbedder for OnnxEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed(&self, image: &DynamicImage) -> Result<Embedding, EmbedError> {
        let side = CROP_SIZE as usize;
        let pixels = to_nchw(&preprocess(image)?);
        let input = Tensor::from_shape(&[1, 3, side, side], &pixels)
            .map_err(|e| EmbedError::Inference(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| EmbedError::Inference(e.to_string()))?;
        let hidden = outputs
            .first()
            .ok_or_else(|| EmbedError::Inference("model produced no outputs".into()))?;
        let view = hidden
            .to_array_view::<f32>()
            .map_err(|e| EmbedError::Inference(e.to_string()))?;

        Embedding::new(view.shape().to_vec(), view.iter().copied().collect())
    }
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EmbeddingService {
    /// A service that loads the ONNX model at `path` on first use.
    ///
    /// A missing or unloadable model disables the service; conversion then
    /// proceeds without embeddings.
    pub fn onnx(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self::new(name, move || {
            OnnxEmbedder::load(&path).map(|e| Arc::new(e) as Arc<dyn ImageEmbedder>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::embed::EmbeddingStatus;

    #[test]
    fn missing_model_is_a_load_error() {
        let err = OnnxEmbedder::load(Path::new("nonexistent/swin.onnx")).unwrap_err();
        assert!(matches!(err, EmbedError::Load(ref msg) if msg.contains("not found")));
    }

    #[test]
    fn invalid_model_is_a_load_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.onnx");
        std::fs::write(&path, b"not a protobuf").expect("write");
        assert!(matches!(OnnxEmbedder::load(&path), Err(EmbedError::Load(_))));
    }

    #[test]
    fn missing_model_disables_service() {
        let service = EmbeddingService::onnx("nonexistent/swin.onnx");
        assert_eq!(service.status(), EmbeddingStatus::NotLoaded);
        assert!(!service.init());
        assert!(matches!(service.status(), EmbeddingStatus::Disabled(_)));
        let image = DynamicImage::new_rgb8(32, 32);
        assert!(service.embed(&image).is_none());
    }
}
