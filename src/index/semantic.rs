//! Semantic (embedding) index.
//!
//! Maintains one dense vector per record, keyed by record id, together with
//! the content fingerprint the vector was computed from. A sync pass
//! recomputes a vector only when the record's fingerprint is absent or has
//! changed, so its cost is proportional to the number of changed records,
//! not the corpus size. Sync is idempotent: running it twice with no record
//! changes does no work the second time.
//!
//! The fingerprint map and the vector map are persisted as two co-located
//! artifacts written back to back. A crash between the two writes can leave
//! one ahead of the other; the next sync recomputes from whichever state is
//! more stale and converges, so no incorrect data survives.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{cosine_similarity, read_artifact, write_artifact, IndexError, IndexResult};
use crate::embedding::EmbeddingProvider;
use crate::fingerprint::fingerprint;
use crate::models::Paper;
use crate::normalize::normalize_text;

/// Outcome of a sync pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Records whose vector was computed or recomputed
    pub embedded: usize,

    /// Records left untouched (fingerprint unchanged)
    pub unchanged: usize,

    /// Stored vectors removed because their record left the corpus
    pub removed: usize,
}

/// Persisted vector map keyed by record id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct VectorMap(HashMap<i64, Vec<f32>>);

/// Persisted fingerprint map keyed by record id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FingerprintMap(HashMap<i64, String>);

/// The semantic index: embeddings plus the fingerprints they were computed
/// from.
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    vectors: VectorMap,
    fingerprints: FingerprintMap,
}

/// The text a record contributes to the semantic index.
///
/// Field labels are kept in the embedded string; sentence encoders benefit
/// from knowing which span is the title and which is the abstract.
fn embedding_text(paper: &Paper) -> String {
    format!(
        "Title: {} Authors: {} Abstract: {}",
        paper.title, paper.authors, paper.abstract_text
    )
}

impl SemanticIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the index up to date with the corpus.
    ///
    /// For every record, the current fingerprint is compared with the one
    /// recorded at the last sync; the embedding is recomputed only when
    /// absent or different. Vectors for records no longer in the corpus are
    /// dropped.
    ///
    /// # Arguments
    /// * `corpus` - Record snapshot; every record must carry an id
    /// * `provider` - Embedding provider (injected, constructed once)
    ///
    /// # Errors
    /// Returns `IndexError::EmbeddingError` if embedding generation fails;
    /// in that case the in-memory index is left as it was
    pub async fn sync<E: EmbeddingProvider>(
        &mut self,
        corpus: &[Paper],
        provider: &E,
    ) -> IndexResult<SyncStats> {
        let mut stats = SyncStats::default();

        // Collect the records that actually need embedding.
        let mut stale: Vec<(i64, String, String)> = Vec::new();
        for paper in corpus {
            let Some(id) = paper.id else { continue };
            let current = fingerprint(paper);
            if self.fingerprints.0.get(&id) == Some(&current) && self.vectors.0.contains_key(&id) {
                stats.unchanged += 1;
            } else {
                stale.push((id, current, normalize_text(&embedding_text(paper))));
            }
        }

        if !stale.is_empty() {
            let texts: Vec<&str> = stale.iter().map(|(_, _, t)| t.as_str()).collect();
            let embeddings = provider
                .embed_batch(&texts)
                .await
                .map_err(|e| IndexError::EmbeddingError(e.to_string()))?;

            for ((id, fp, _), vector) in stale.into_iter().zip(embeddings) {
                debug!(record = id, "recomputed embedding");
                self.vectors.0.insert(id, vector);
                self.fingerprints.0.insert(id, fp);
                stats.embedded += 1;
            }
        }

        // Drop vectors whose record left the corpus.
        let live: std::collections::HashSet<i64> = corpus.iter().filter_map(|p| p.id).collect();
        let before = self.vectors.0.len();
        self.vectors.0.retain(|id, _| live.contains(id));
        self.fingerprints.0.retain(|id, _| live.contains(id));
        stats.removed = before - self.vectors.0.len();

        info!(
            embedded = stats.embedded,
            unchanged = stats.unchanged,
            removed = stats.removed,
            "semantic sync complete"
        );
        Ok(stats)
    }

    /// Score a query against every stored vector.
    ///
    /// Embeds the query once, then computes cosine similarity against each
    /// vector. Only records with strictly positive similarity are returned;
    /// order is unspecified.
    ///
    /// # Errors
    /// Returns `IndexError::EmbeddingError` if query embedding fails
    pub async fn score<E: EmbeddingProvider>(
        &self,
        query: &str,
        provider: &E,
    ) -> IndexResult<Vec<(i64, f32)>> {
        let query_vector = provider
            .embed(&normalize_text(query))
            .await
            .map_err(|e| IndexError::EmbeddingError(e.to_string()))?;

        Ok(self
            .vectors
            .0
            .iter()
            .filter_map(|(&id, vector)| {
                let sim = cosine_similarity(&query_vector, vector);
                (sim > 0.0).then_some((id, sim))
            })
            .collect())
    }

    /// Nearest neighbors of a stored record, by cosine similarity.
    ///
    /// The source record is excluded from its own neighborhood.
    ///
    /// # Arguments
    /// * `record_id` - Record whose neighbors to find
    /// * `top_n` - Maximum number of neighbors to return
    ///
    /// # Errors
    /// Returns `IndexError::VectorNotFound` if the record has no stored
    /// vector (not yet synced)
    pub fn nearest(&self, record_id: i64, top_n: usize) -> IndexResult<Vec<(i64, f32)>> {
        let source = self
            .vectors
            .0
            .get(&record_id)
            .ok_or(IndexError::VectorNotFound(record_id))?;

        let mut neighbors: Vec<(i64, f32)> = self
            .vectors
            .0
            .iter()
            .filter(|(&id, _)| id != record_id)
            .map(|(&id, vector)| (id, cosine_similarity(source, vector)))
            .collect();

        neighbors.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        neighbors.truncate(top_n);
        Ok(neighbors)
    }

    /// Whether a record has a stored vector.
    pub fn contains(&self, record_id: i64) -> bool {
        self.vectors.0.contains_key(&record_id)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.0.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.0.is_empty()
    }

    /// Persist the vector map and the fingerprint map.
    ///
    /// Each artifact is written atomically, but the pair is written
    /// sequentially; see the module docs for the recovery semantics.
    pub fn save(&self, vectors_path: &Path, fingerprints_path: &Path) -> IndexResult<()> {
        write_artifact(vectors_path, &self.vectors)?;
        write_artifact(fingerprints_path, &self.fingerprints)?;
        Ok(())
    }

    /// Load a previously saved index.
    ///
    /// # Errors
    /// Returns `IndexError::ArtifactMissing` if either file is absent
    pub fn load(vectors_path: &Path, fingerprints_path: &Path) -> IndexResult<Self> {
        Ok(Self {
            vectors: read_artifact(vectors_path)?,
            fingerprints: read_artifact(fingerprints_path)?,
        })
    }
}
