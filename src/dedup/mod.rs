//! Duplicate detection and resolution.
//!
//! Records are grouped by their normalized (title, authors) key; each group
//! with more than one member is collapsed onto a single survivor. The
//! survivor is the group's first member in store retrieval order, enriched
//! with venue metadata from its duplicates on a first-non-empty-wins basis,
//! and the remaining members are deleted. All survivor updates and
//! duplicate deletions across every group land in one all-or-nothing store
//! commit.
//!
//! Resolution invalidates both similarity indices: deleted ids linger in
//! the lexical matrix and the semantic vector map until the next rebuild
//! and sync. Maintenance runs them (and a cache invalidation) after every
//! resolution.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::Paper;
use crate::normalize::dedup_key;
use crate::storage::{RecordStore, StorageError};

/// Errors that can occur during duplicate resolution.
#[derive(Debug, Error)]
pub enum DedupError {
    /// The underlying store rejected a read or the merge commit
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for dedup operations.
pub type DedupResult<T> = Result<T, DedupError>;

/// Outcome of one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Records examined
    pub scanned: usize,
    /// Duplicate groups found (two or more members)
    pub groups: usize,
    /// Duplicate records deleted
    pub removed: usize,
    /// Survivors whose venue metadata was enriched from a duplicate
    pub enriched: usize,
}

impl MergeReport {
    /// Whether the run changed the corpus at all.
    pub fn changed(&self) -> bool {
        self.removed > 0 || self.enriched > 0
    }
}

/// Groups and merges duplicate records in a store.
pub struct DuplicateResolver;

impl DuplicateResolver {
    /// Find duplicate groups and collapse each onto its survivor.
    ///
    /// Reads the full corpus once, plans every merge in memory, then
    /// applies all updates and deletions in a single store commit. A
    /// failing commit leaves the corpus untouched.
    ///
    /// # Arguments
    /// * `store` - The record store to resolve
    ///
    /// # Errors
    /// Returns `DedupError::Storage` if the corpus read or the merge
    /// commit fails
    pub async fn resolve<S: RecordStore>(store: &mut S) -> DedupResult<MergeReport> {
        let papers = store.get_all_papers().await?;
        let mut report = MergeReport {
            scanned: papers.len(),
            ..MergeReport::default()
        };

        // Group by normalized identity, preserving retrieval order within
        // each group so the first member is the survivor.
        let mut groups: HashMap<(String, String), Vec<Paper>> = HashMap::new();
        let mut order: Vec<(String, String)> = Vec::new();
        for paper in papers {
            let key = dedup_key(&paper.title, &paper.authors);
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            group.push(paper);
        }

        let mut updates: Vec<Paper> = Vec::new();
        let mut deletions: Vec<i64> = Vec::new();
        for key in order {
            let group = &groups[&key];
            if group.len() < 2 {
                continue;
            }
            report.groups += 1;

            let mut survivor = group[0].clone();
            let mut enriched = false;
            for duplicate in &group[1..] {
                enriched |= merge_venue_fields(&mut survivor, duplicate);
                if let Some(id) = duplicate.id {
                    deletions.push(id);
                    report.removed += 1;
                }
            }
            if enriched {
                report.enriched += 1;
            }
            debug!(
                survivor = ?survivor.id,
                duplicates = group.len() - 1,
                title = %survivor.title,
                "collapsing duplicate group"
            );
            updates.push(survivor);
        }

        if !updates.is_empty() || !deletions.is_empty() {
            store.commit_merge(&updates, &deletions).await?;
        }

        info!(
            scanned = report.scanned,
            groups = report.groups,
            removed = report.removed,
            enriched = report.enriched,
            "duplicate resolution complete"
        );
        Ok(report)
    }
}

/// Copy venue metadata from a duplicate onto the survivor, one field at a
/// time, only where the survivor's field is empty. Returns whether any
/// field was copied.
fn merge_venue_fields(survivor: &mut Paper, duplicate: &Paper) -> bool {
    let mut copied = false;
    copied |= fill(&mut survivor.publication_name, &duplicate.publication_name);
    copied |= fill(&mut survivor.publication_date, &duplicate.publication_date);
    copied |= fill(&mut survivor.publication_url, &duplicate.publication_url);
    copied
}

fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) -> bool {
    if target.is_none() && source.is_some() {
        *target = source.clone();
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    fn paper(title: &str, authors: &str) -> Paper {
        Paper::new(title, authors, "An abstract.")
    }

    #[tokio::test]
    async fn test_no_duplicates_is_a_no_op() {
        let mut store = MemoryStore::new();
        store.insert_paper(&paper("Alpha", "A. One")).await.unwrap();
        store.insert_paper(&paper("Beta", "B. Two")).await.unwrap();

        let report = DuplicateResolver::resolve(&mut store).await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.groups, 0);
        assert!(!report.changed());
        assert_eq!(store.count_papers().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_survivor_keeps_venue_and_duplicate_is_deleted() {
        let mut store = MemoryStore::new();
        let survivor_id = store
            .insert_paper(&paper("Attention Is All You Need", "A. Vaswani"))
            .await
            .unwrap();

        let mut dup = paper("Attention Is All You Need.", "A. Vaswani");
        dup.publication_name = Some("NeurIPS".to_string());
        dup.publication_url = Some("https://papers.nips.cc/...".to_string());
        store.insert_paper(&dup).await.unwrap();

        let report = DuplicateResolver::resolve(&mut store).await.unwrap();
        assert_eq!(report.groups, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.enriched, 1);

        assert_eq!(store.count_papers().await.unwrap(), 1);
        let merged = store.get_paper_by_id(survivor_id).await.unwrap();
        assert_eq!(merged.title, "Attention Is All You Need");
        assert_eq!(merged.publication_name.as_deref(), Some("NeurIPS"));
        assert!(merged.publication_url.is_some());
    }

    #[tokio::test]
    async fn test_survivor_fields_are_never_overwritten() {
        let mut store = MemoryStore::new();
        let mut first = paper("Deep Residual Learning", "K. He");
        first.publication_name = Some("CVPR".to_string());
        let survivor_id = store.insert_paper(&first).await.unwrap();

        let mut dup = paper("Deep Residual Learning", "K. He");
        dup.publication_name = Some("Wrong Venue".to_string());
        dup.publication_date = Some("2016-06-27".to_string());
        store.insert_paper(&dup).await.unwrap();

        DuplicateResolver::resolve(&mut store).await.unwrap();

        let merged = store.get_paper_by_id(survivor_id).await.unwrap();
        assert_eq!(merged.publication_name.as_deref(), Some("CVPR"));
        // Empty field still filled from the duplicate.
        assert_eq!(merged.publication_date.as_deref(), Some("2016-06-27"));
    }

    #[tokio::test]
    async fn test_grouping_uses_normalized_identity() {
        let mut store = MemoryStore::new();
        // Accented vs decomposed author spelling, trailing title period.
        store
            .insert_paper(&paper("Attention Is All You Need", "Ce\u{301}line Dubois"))
            .await
            .unwrap();
        store
            .insert_paper(&paper("Attention Is All You Need.", "C\u{e9}line Dubois"))
            .await
            .unwrap();

        let report = DuplicateResolver::resolve(&mut store).await.unwrap();
        assert_eq!(report.groups, 1);
        assert_eq!(store.count_papers().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_three_way_group_first_in_store_order_survives() {
        let mut store = MemoryStore::new();
        let a = store.insert_paper(&paper("Same Work", "Same Author")).await.unwrap();

        let mut b = paper("Same Work", "Same Author");
        b.publication_date = Some("2020-01-01".to_string());
        store.insert_paper(&b).await.unwrap();

        let mut c = paper("Same Work.", "Same Author");
        c.publication_date = Some("2021-01-01".to_string());
        c.publication_name = Some("ICML".to_string());
        store.insert_paper(&c).await.unwrap();

        let report = DuplicateResolver::resolve(&mut store).await.unwrap();
        assert_eq!(report.removed, 2);
        assert_eq!(store.count_papers().await.unwrap(), 1);

        // First duplicate in order wins each empty field.
        let merged = store.get_paper_by_id(a).await.unwrap();
        assert_eq!(merged.publication_date.as_deref(), Some("2020-01-01"));
        assert_eq!(merged.publication_name.as_deref(), Some("ICML"));
    }

    #[tokio::test]
    async fn test_multiple_independent_groups() {
        let mut store = MemoryStore::new();
        store.insert_paper(&paper("First Work", "A")).await.unwrap();
        store.insert_paper(&paper("First Work", "A")).await.unwrap();
        store.insert_paper(&paper("Second Work", "B")).await.unwrap();
        store.insert_paper(&paper("Second Work.", "B")).await.unwrap();
        store.insert_paper(&paper("Untouched", "C")).await.unwrap();

        let report = DuplicateResolver::resolve(&mut store).await.unwrap();
        assert_eq!(report.groups, 2);
        assert_eq!(report.removed, 2);
        assert_eq!(store.count_papers().await.unwrap(), 3);
    }
}
