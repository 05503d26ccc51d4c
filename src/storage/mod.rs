//! Record store abstraction and implementations.
//!
//! This module defines the interface for persisting and retrieving paper
//! records. The ranking and deduplication core treats storage as an abstract
//! record store with query-by-field and bulk operations; the concrete engine
//! behind it is interchangeable.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Paper;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid record state (e.g., update without an id)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Query execution error
    #[error("Query failed: {0}")]
    QueryError(String),

    /// Other unexpected errors
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for paper record stores.
///
/// Implementations must return records from `get_all_papers` in a stable
/// retrieval order (ascending id). The duplicate resolver and the lexical
/// index both rely on that order: the resolver picks the first record of a
/// group as survivor, and the index aligns matrix rows with the snapshot it
/// was built from.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new paper and assign it an id.
    ///
    /// # Arguments
    /// * `paper` - The record to insert (`id` must be `None`)
    ///
    /// # Returns
    /// The assigned record id
    ///
    /// # Errors
    /// Returns `StorageError::InvalidRecord` if the record already has an id
    async fn insert_paper(&mut self, paper: &Paper) -> StorageResult<i64>;

    /// Overwrite an existing record in place.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidRecord` if the record has no id, or
    /// `StorageError::NotFound` if no record with that id exists
    async fn update_paper(&mut self, paper: &Paper) -> StorageResult<()>;

    /// Delete a record by id.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` if the record does not exist
    async fn delete_paper(&mut self, id: i64) -> StorageResult<()>;

    /// Retrieve every record, in stable retrieval order (ascending id).
    async fn get_all_papers(&self) -> StorageResult<Vec<Paper>>;

    /// Get a record by its id.
    ///
    /// # Errors
    /// Returns `StorageError::NotFound` if the record does not exist
    async fn get_paper_by_id(&self, id: i64) -> StorageResult<Paper>;

    /// Find a record by its external identifier (arXiv URL).
    ///
    /// Used for idempotent upsert from a given source.
    async fn find_by_external_id(&self, external_id: &str) -> StorageResult<Option<Paper>>;

    /// Find the first record matching an exact (title, authors) pair, in
    /// retrieval order.
    ///
    /// Callers normalize both values before matching at the dedup level;
    /// this lookup is over the stored values as-is.
    async fn find_by_title_authors(&self, title: &str, authors: &str) -> StorageResult<Option<Paper>>;

    /// Apply a set of survivor updates and duplicate deletions as one
    /// logical transaction.
    ///
    /// Either every update and deletion takes effect or none do. The
    /// duplicate resolver relies on this so a mid-batch failure never
    /// leaves a group half-merged.
    ///
    /// # Arguments
    /// * `updates` - Survivor records to overwrite (each must have an id)
    /// * `deletions` - Ids of duplicate records to remove
    async fn commit_merge(&mut self, updates: &[Paper], deletions: &[i64]) -> StorageResult<()>;

    /// Total number of records in the store.
    async fn count_papers(&self) -> StorageResult<usize>;
}
