//! Embedding provider abstraction and implementations.
//!
//! This module defines the interface for dense text embedding generation.
//! The semantic index and the rank fusion engine receive a provider by
//! reference; the provider is constructed once at process start and injected
//! everywhere it is needed, so there is no lazily-initialized global model
//! state.

#[cfg(feature = "local-embeddings")]
pub mod local;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Invalid input text (e.g., empty)
    #[error("Invalid input text: {0}")]
    InvalidInput(String),

    /// Model initialization or configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Other unexpected errors
    #[error("Embedding error: {0}")]
    Other(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for text embedding providers.
///
/// Implementors generate fixed-width dense vectors from text. The trait is
/// async so that implementations backed by a remote service or a worker
/// thread fit the same seam as local ONNX models.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text.
    ///
    /// # Arguments
    /// * `text` - The input text (should be pre-normalized)
    ///
    /// # Errors
    /// Returns `EmbeddingError` if generation fails
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Generate embeddings for multiple texts in one batch.
    ///
    /// The default implementation loops over `embed`; providers with real
    /// batch support should override it.
    ///
    /// # Arguments
    /// * `texts` - Texts to embed
    ///
    /// # Returns
    /// One vector per input text, in input order
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimension of the vectors produced by this provider.
    fn dimension(&self) -> usize;

    /// Model name/identifier (e.g. "all-MiniLM-L6-v2").
    fn model_name(&self) -> &str;
}
