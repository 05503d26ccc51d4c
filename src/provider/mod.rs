//! External record sources.
//!
//! A [`PaperProvider`] yields batches of records from somewhere outside the
//! store - a preprint feed, a bibliography export, a snapshot file. The
//! ingestion pipeline is generic over this trait, so sources can be swapped
//! or mocked without touching upsert logic.

pub mod json;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Paper;

/// Errors that can occur while fetching records from a source.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The source could not be reached or read
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The source returned data this provider cannot parse
    #[error("Malformed source data: {0}")]
    Malformed(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A source of paper records.
#[async_trait]
pub trait PaperProvider: Send + Sync {
    /// Fetch the next batch of records from the source.
    ///
    /// Returned records carry no store id; the ingestion pipeline decides
    /// whether each one inserts a new record or updates an existing one.
    async fn fetch(&self) -> ProviderResult<Vec<Paper>>;

    /// Human-readable source name for logs.
    fn source_name(&self) -> &str;
}
