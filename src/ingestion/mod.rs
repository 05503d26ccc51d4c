//! Record ingestion.
//!
//! Pulls batches from a [`PaperProvider`] and upserts them into a
//! [`RecordStore`]. Two upsert disciplines exist, matching the two kinds of
//! source:
//!
//! - **Preprint feeds** identify records by external id (the preprint
//!   URL). A known record is fully refreshed only when the incoming copy
//!   carries a strictly newer upload date; replaying an old feed never
//!   regresses a record.
//! - **Publication listings** identify records by exact (title, authors).
//!   A known record gains the venue fields; its abstract is overwritten
//!   only when the incoming abstract is non-empty, since publication
//!   sources often omit abstracts.
//!
//! Any insert or update leaves the similarity indices stale; maintenance
//! rebuilds them after an ingestion run.

use thiserror::Error;
use tracing::{info, warn};

use crate::models::Paper;
use crate::provider::{PaperProvider, ProviderError};
use crate::storage::{RecordStore, StorageError};

/// Errors that can occur during ingestion.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Fetching from the source failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A store read or write failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Outcome counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Records the source yielded
    pub fetched: usize,
    /// New records inserted
    pub inserted: usize,
    /// Existing records updated
    pub updated: usize,
    /// Records left untouched (already current, or stale feed copy)
    pub unchanged: usize,
    /// Records dropped as unusable (e.g. a preprint without an id)
    pub skipped: usize,
}

impl IngestionStats {
    /// Whether the run changed the corpus.
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// Upsert driver over a provider/store pair.
pub struct IngestionPipeline;

impl IngestionPipeline {
    /// Ingest a preprint feed batch.
    ///
    /// Each record is matched by external id. Unknown records are
    /// inserted. Known records are refreshed in full only when the
    /// incoming upload date is strictly newer than the stored one (a
    /// stored record without an upload date is always refreshable).
    ///
    /// # Errors
    /// Returns `IngestionError::Provider` if the fetch fails, or
    /// `IngestionError::Storage` if a store operation fails
    pub async fn ingest_preprints<S, P>(store: &mut S, provider: &P) -> IngestionResult<IngestionStats>
    where
        S: RecordStore,
        P: PaperProvider,
    {
        let batch = provider.fetch().await?;
        let mut stats = IngestionStats {
            fetched: batch.len(),
            ..IngestionStats::default()
        };

        for incoming in batch {
            let Some(external_id) = incoming.arxiv_url.clone() else {
                warn!(title = %incoming.title, "preprint record without external id, skipping");
                stats.skipped += 1;
                continue;
            };

            match store.find_by_external_id(&external_id).await? {
                None => {
                    store.insert_paper(&incoming).await?;
                    stats.inserted += 1;
                }
                Some(existing) if is_newer(&incoming, &existing) => {
                    let mut refreshed = incoming;
                    refreshed.id = existing.id;
                    // Venue fields come from publication sources only.
                    refreshed.publication_name = existing.publication_name;
                    refreshed.publication_date = existing.publication_date;
                    refreshed.publication_url = existing.publication_url;
                    store.update_paper(&refreshed).await?;
                    stats.updated += 1;
                }
                Some(_) => stats.unchanged += 1,
            }
        }

        info!(
            source = provider.source_name(),
            fetched = stats.fetched,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            "preprint ingestion complete"
        );
        Ok(stats)
    }

    /// Ingest a publication listing batch.
    ///
    /// Each record is matched by exact (title, authors). Known records
    /// gain the incoming venue fields; a venue field the listing omits
    /// leaves the stored value alone, and the abstract is overwritten only
    /// when the incoming one is non-empty. Unknown records are inserted
    /// as-is.
    ///
    /// # Errors
    /// Returns `IngestionError::Provider` if the fetch fails, or
    /// `IngestionError::Storage` if a store operation fails
    pub async fn ingest_publications<S, P>(store: &mut S, provider: &P) -> IngestionResult<IngestionStats>
    where
        S: RecordStore,
        P: PaperProvider,
    {
        let batch = provider.fetch().await?;
        let mut stats = IngestionStats {
            fetched: batch.len(),
            ..IngestionStats::default()
        };

        for incoming in batch {
            match store
                .find_by_title_authors(&incoming.title, &incoming.authors)
                .await?
            {
                None => {
                    store.insert_paper(&incoming).await?;
                    stats.inserted += 1;
                }
                Some(mut existing) => {
                    let before = existing.clone();
                    // A listing that omits a venue field must not erase a
                    // value an earlier source already supplied.
                    if incoming.publication_name.is_some() {
                        existing.publication_name = incoming.publication_name.clone();
                    }
                    if incoming.publication_date.is_some() {
                        existing.publication_date = incoming.publication_date.clone();
                    }
                    if incoming.publication_url.is_some() {
                        existing.publication_url = incoming.publication_url.clone();
                    }
                    if !incoming.abstract_text.is_empty() {
                        existing.abstract_text = incoming.abstract_text.clone();
                    }
                    if papers_equal(&existing, &before) {
                        stats.unchanged += 1;
                    } else {
                        store.update_paper(&existing).await?;
                        stats.updated += 1;
                    }
                }
            }
        }

        info!(
            source = provider.source_name(),
            fetched = stats.fetched,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "publication ingestion complete"
        );
        Ok(stats)
    }
}

/// Whether the incoming preprint copy supersedes the stored one.
fn is_newer(incoming: &Paper, existing: &Paper) -> bool {
    match (incoming.arxiv_upload_date, existing.arxiv_upload_date) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Field-wise comparison for change detection.
fn papers_equal(a: &Paper, b: &Paper) -> bool {
    a.title == b.title
        && a.authors == b.authors
        && a.abstract_text == b.abstract_text
        && a.arxiv_upload_date == b.arxiv_upload_date
        && a.arxiv_category == b.arxiv_category
        && a.arxiv_url == b.arxiv_url
        && a.publication_name == b.publication_name
        && a.publication_date == b.publication_date
        && a.publication_url == b.publication_url
}
