//! Local embedding generation via fastembed.
//!
//! Runs a sentence-embedding model in-process, so maintenance jobs do not
//! depend on any external service. Available behind the `local-embeddings`
//! cargo feature because the ONNX runtime is a heavy build dependency.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// Embedding provider backed by a local fastembed model.
///
/// The model is loaded once at construction and shared behind a mutex; the
/// fastembed API requires `&mut` access for inference.
#[derive(Clone)]
pub struct LocalEmbeddingProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl LocalEmbeddingProvider {
    /// Load a fastembed model.
    ///
    /// # Arguments
    /// * `model` - Model to use (defaults to AllMiniLML6V2)
    /// * `cache_dir` - Optional cache directory for downloaded model files
    ///
    /// # Errors
    /// Returns `EmbeddingError::ConfigError` if the model cannot be loaded
    pub fn new(model: Option<EmbeddingModel>, cache_dir: Option<String>) -> EmbeddingResult<Self> {
        let model_type = model.unwrap_or(EmbeddingModel::AllMiniLML6V2);
        let model_name = format!("{:?}", model_type);

        let dimension = match model_type {
            EmbeddingModel::AllMiniLML6V2 => 384,
            EmbeddingModel::BGESmallENV15 => 384,
            EmbeddingModel::BGEBaseENV15 => 768,
            EmbeddingModel::BGELargeENV15 => 1024,
            EmbeddingModel::NomicEmbedTextV1 => 768,
            EmbeddingModel::NomicEmbedTextV15 => 768,
            _ => 384,
        };

        let mut init_options = InitOptions::new(model_type);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(PathBuf::from(dir));
        }

        let text_embedding = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::ConfigError(format!("failed to load embedding model: {e}")))?;

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name,
            dimension,
        })
    }

    /// Load the default model (AllMiniLML6V2, default cache directory).
    pub fn with_defaults() -> EmbeddingResult<Self> {
        Self::new(None, None)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("text cannot be empty".to_string()));
        }

        let mut model = self.model.lock().await;
        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::Other(format!("embedding generation failed: {e}")))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Other("no embedding generated".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let owned: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let mut model = self.model.lock().await;
        model
            .embed(owned, None)
            .map_err(|e| EmbeddingError::Other(format!("batch embedding failed: {e}")))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
