//! In-memory record store.
//!
//! Backs the maintenance jobs and tests. Records live in a `BTreeMap` keyed
//! by id, which gives every read the stable ascending-id retrieval order the
//! `RecordStore` contract requires. The whole store can be snapshotted to
//! and restored from a JSON file, which is how the maintenance CLI carries
//! the corpus between sequential jobs.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use super::{RecordStore, StorageError, StorageResult};
use crate::models::Paper;

/// Record store holding all papers in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    papers: BTreeMap<i64, Paper>,
    next_id: i64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            papers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Build a store from an existing set of records.
    ///
    /// Records without an id are assigned one in input order; records with
    /// an id keep it. The next assigned id continues after the maximum.
    pub fn from_papers(papers: Vec<Paper>) -> Self {
        let mut store = Self::new();
        for mut paper in papers {
            let id = match paper.id {
                Some(id) => id,
                None => {
                    let id = store.next_free_id();
                    paper.id = Some(id);
                    id
                }
            };
            store.papers.insert(id, paper);
            store.next_id = store.next_id.max(id + 1);
        }
        store
    }

    /// Load a store snapshot from a JSON file.
    pub async fn load(path: &Path) -> StorageResult<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::Other(format!("failed to read {}: {e}", path.display())))?;
        let papers: Vec<Paper> = serde_json::from_str(&data)
            .map_err(|e| StorageError::Other(format!("failed to parse {}: {e}", path.display())))?;
        Ok(Self::from_papers(papers))
    }

    /// Write the store contents to a JSON file.
    pub async fn save(&self, path: &Path) -> StorageResult<()> {
        let papers: Vec<&Paper> = self.papers.values().collect();
        let data = serde_json::to_string_pretty(&papers)
            .map_err(|e| StorageError::Other(format!("failed to serialize store: {e}")))?;
        tokio::fs::write(path, data)
            .await
            .map_err(|e| StorageError::Other(format!("failed to write {}: {e}", path.display())))
    }

    fn next_free_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_paper(&mut self, paper: &Paper) -> StorageResult<i64> {
        if paper.id.is_some() {
            return Err(StorageError::InvalidRecord(
                "insert_paper expects a record without an id".to_string(),
            ));
        }
        let id = self.next_free_id();
        let mut stored = paper.clone();
        stored.id = Some(id);
        self.papers.insert(id, stored);
        Ok(id)
    }

    async fn update_paper(&mut self, paper: &Paper) -> StorageResult<()> {
        let id = paper
            .id
            .ok_or_else(|| StorageError::InvalidRecord("update_paper requires an id".to_string()))?;
        if !self.papers.contains_key(&id) {
            return Err(StorageError::NotFound(format!("paper {id}")));
        }
        self.papers.insert(id, paper.clone());
        Ok(())
    }

    async fn delete_paper(&mut self, id: i64) -> StorageResult<()> {
        self.papers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("paper {id}")))
    }

    async fn get_all_papers(&self) -> StorageResult<Vec<Paper>> {
        Ok(self.papers.values().cloned().collect())
    }

    async fn get_paper_by_id(&self, id: i64) -> StorageResult<Paper> {
        self.papers
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("paper {id}")))
    }

    async fn find_by_external_id(&self, external_id: &str) -> StorageResult<Option<Paper>> {
        Ok(self
            .papers
            .values()
            .find(|p| p.arxiv_url.as_deref() == Some(external_id))
            .cloned())
    }

    async fn find_by_title_authors(&self, title: &str, authors: &str) -> StorageResult<Option<Paper>> {
        Ok(self
            .papers
            .values()
            .find(|p| p.title == title && p.authors == authors)
            .cloned())
    }

    async fn commit_merge(&mut self, updates: &[Paper], deletions: &[i64]) -> StorageResult<()> {
        // Validate everything before touching the map so the commit is
        // all-or-nothing.
        for paper in updates {
            let id = paper.id.ok_or_else(|| {
                StorageError::InvalidRecord("merge update requires an id".to_string())
            })?;
            if !self.papers.contains_key(&id) {
                return Err(StorageError::NotFound(format!("survivor {id}")));
            }
        }
        for id in deletions {
            if !self.papers.contains_key(id) {
                return Err(StorageError::NotFound(format!("duplicate {id}")));
            }
        }

        for paper in updates {
            if let Some(id) = paper.id {
                self.papers.insert(id, paper.clone());
            }
        }
        for id in deletions {
            self.papers.remove(id);
        }
        Ok(())
    }

    async fn count_papers(&self) -> StorageResult<usize> {
        Ok(self.papers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str) -> Paper {
        Paper::new(title, "Test Author", "An abstract.")
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let mut store = MemoryStore::new();
        let a = store.insert_paper(&paper("A")).await.unwrap();
        let b = store.insert_paper(&paper("B")).await.unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_preassigned_id() {
        let mut store = MemoryStore::new();
        let mut p = paper("A");
        p.id = Some(42);
        assert!(matches!(
            store.insert_paper(&p).await,
            Err(StorageError::InvalidRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_get_all_is_in_id_order() {
        let mut store = MemoryStore::from_papers(vec![
            {
                let mut p = paper("Late");
                p.id = Some(9);
                p
            },
            {
                let mut p = paper("Early");
                p.id = Some(2);
                p
            },
        ]);
        store.insert_paper(&paper("Newest")).await.unwrap();

        let all = store.get_all_papers().await.unwrap();
        let ids: Vec<i64> = all.iter().map(|p| p.id.unwrap()).collect();
        assert_eq!(ids, vec![2, 9, 10]);
    }

    #[tokio::test]
    async fn test_find_by_external_id() {
        let mut store = MemoryStore::new();
        let mut p = paper("With URL");
        p.arxiv_url = Some("http://arxiv.org/abs/2401.00001".to_string());
        store.insert_paper(&p).await.unwrap();

        let found = store
            .find_by_external_id("http://arxiv.org/abs/2401.00001")
            .await
            .unwrap();
        assert_eq!(found.unwrap().title, "With URL");
        assert!(store.find_by_external_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let mut store = MemoryStore::new();
        let id = store.insert_paper(&paper("Original")).await.unwrap();

        let mut updated = store.get_paper_by_id(id).await.unwrap();
        updated.title = "Edited".to_string();
        store.update_paper(&updated).await.unwrap();
        assert_eq!(store.get_paper_by_id(id).await.unwrap().title, "Edited");

        store.delete_paper(id).await.unwrap();
        assert!(matches!(
            store.get_paper_by_id(id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_merge_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        let survivor_id = store.insert_paper(&paper("Survivor")).await.unwrap();
        let dup_id = store.insert_paper(&paper("Duplicate")).await.unwrap();

        let mut survivor = store.get_paper_by_id(survivor_id).await.unwrap();
        survivor.publication_name = Some("NeurIPS".to_string());

        // Deletion list contains a bogus id: nothing may change.
        let err = store
            .commit_merge(&[survivor.clone()], &[dup_id, 999])
            .await;
        assert!(err.is_err());
        assert_eq!(store.count_papers().await.unwrap(), 2);
        assert!(store
            .get_paper_by_id(survivor_id)
            .await
            .unwrap()
            .publication_name
            .is_none());

        // Valid commit applies both sides.
        store.commit_merge(&[survivor], &[dup_id]).await.unwrap();
        assert_eq!(store.count_papers().await.unwrap(), 1);
        assert_eq!(
            store
                .get_paper_by_id(survivor_id)
                .await
                .unwrap()
                .publication_name
                .as_deref(),
            Some("NeurIPS")
        );
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");

        let mut store = MemoryStore::new();
        store.insert_paper(&paper("A")).await.unwrap();
        store.insert_paper(&paper("B")).await.unwrap();
        store.save(&path).await.unwrap();

        let mut loaded = MemoryStore::load(&path).await.unwrap();
        assert_eq!(loaded.count_papers().await.unwrap(), 2);
        // New inserts continue after the loaded ids.
        let id = loaded.insert_paper(&paper("C")).await.unwrap();
        assert_eq!(id, 3);
    }
}
