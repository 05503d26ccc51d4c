//! Query processing and rank fusion.
//!
//! The fusion engine computes up to three similarity signals for a query -
//! lexical (TF-IDF), semantic (embeddings), and exact term matching -
//! normalizes each signal independently, and combines them into one ranked
//! list under configurable weights. It also answers "similar to this paper"
//! lookups using the semantic index alone.
//!
//! The engine works against loaded index snapshots and a corpus snapshot
//! taken at construction; it never mutates them, so any number of engines
//! and callers can serve queries concurrently while maintenance jobs
//! prepare the next snapshot on disk.
//!
//! Search-time failures degrade per signal: a missing artifact or a failed
//! query embedding drops that signal from the combination rather than
//! failing the query. Only when every requested signal is unavailable does
//! the query surface an error.

pub mod cache;

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::embedding::EmbeddingProvider;
use crate::index::lexical::LexicalIndex;
use crate::index::semantic::SemanticIndex;
use crate::index::IndexError;
use crate::models::{Paper, RankedPaper};
use cache::ResultCache;

/// Errors that can occur during query processing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Every requested signal is unavailable (indices not built/loaded)
    #[error("No results: indices not ready for the requested mode")]
    IndicesNotReady,

    /// Nearest-neighbor lookup failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The requested record does not exist in the corpus snapshot
    #[error("Unknown record id {0}")]
    UnknownRecord(i64),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Which signals participate in ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// TF-IDF similarity only
    Lexical,
    /// Embedding similarity only
    Semantic,
    /// Weighted exact term matching only
    ExactMatch,
    /// All three signals, weighted and summed
    Fused,
}

impl SearchMode {
    fn wants_lexical(self) -> bool {
        matches!(self, SearchMode::Lexical | SearchMode::Fused)
    }

    fn wants_semantic(self) -> bool {
        matches!(self, SearchMode::Semantic | SearchMode::Fused)
    }

    fn wants_exact(self) -> bool {
        matches!(self, SearchMode::ExactMatch | SearchMode::Fused)
    }
}

/// Per-signal fusion weights.
///
/// Each normalized signal score is multiplied by its weight before summing.
/// The defaults weigh all signals equally.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    /// Weight of the TF-IDF signal
    pub lexical: f32,
    /// Weight of the embedding signal
    pub semantic: f32,
    /// Weight of the exact-match signal
    pub exact: f32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            lexical: 1.0,
            semantic: 1.0,
            exact: 1.0,
        }
    }
}

/// One signal's raw scores keyed by record id.
struct SignalScores {
    by_id: HashMap<i64, f32>,
    weight: f32,
    /// Exact-match scores are centered on the mean before scaling; the
    /// similarity signals are not.
    center: bool,
}

/// Multi-signal search engine over a corpus snapshot.
///
/// Indices are optional: an engine built without a lexical or semantic
/// index simply has that signal unavailable and degrades accordingly.
pub struct FusionEngine<E: EmbeddingProvider> {
    papers: Vec<Paper>,
    position: HashMap<i64, usize>,
    lexical: Option<LexicalIndex>,
    semantic: Option<SemanticIndex>,
    provider: E,
    cache: ResultCache,
}

impl<E: EmbeddingProvider> FusionEngine<E> {
    /// Create an engine over a corpus snapshot.
    ///
    /// # Arguments
    /// * `papers` - Corpus snapshot in retrieval order; used for exact-match
    ///   scoring, tie-breaking, and result materialization
    /// * `provider` - Embedding provider for query embedding
    pub fn new(papers: Vec<Paper>, provider: E) -> Self {
        let position = papers
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.id.map(|id| (id, i)))
            .collect();
        Self {
            papers,
            position,
            lexical: None,
            semantic: None,
            provider,
            cache: ResultCache::new(),
        }
    }

    /// Attach a loaded lexical index snapshot.
    pub fn with_lexical(mut self, index: LexicalIndex) -> Self {
        self.lexical = Some(index);
        self
    }

    /// Attach a loaded semantic index snapshot.
    pub fn with_semantic(mut self, index: SemanticIndex) -> Self {
        self.semantic = Some(index);
        self
    }

    /// Invalidate all cached results.
    ///
    /// Must be called after any successful index rebuild, semantic sync, or
    /// duplicate-resolution run; cache entries also expire on their own
    /// after a bounded time window.
    pub fn invalidate_results(&self) {
        self.cache.invalidate_all();
    }

    /// Execute a search and return ranked results.
    ///
    /// Each requested signal that is available is scored, min-max
    /// normalized, weighted, and summed. Records for which every active
    /// signal scored zero are excluded from the output. Ties keep corpus
    /// retrieval order (stable sort).
    ///
    /// Results are cached per (query, mode, weights, limit) for a bounded
    /// time window; see [`FusionEngine::invalidate_results`].
    ///
    /// # Arguments
    /// * `query` - Free-text query
    /// * `mode` - Which signals to use
    /// * `weights` - Per-signal weights (ignored for single-signal modes'
    ///   ranking order, still applied to the reported score)
    /// * `limit` - Maximum number of results
    ///
    /// # Errors
    /// Returns `QueryError::IndicesNotReady` if every requested signal is
    /// unavailable
    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        weights: &SignalWeights,
        limit: usize,
    ) -> QueryResult<Vec<RankedPaper>> {
        if let Some(hit) = self.cache.get(query, mode, weights, limit) {
            return Ok(hit);
        }

        let mut signals: Vec<SignalScores> = Vec::new();
        let mut requested = 0usize;
        let mut unavailable = 0usize;

        if mode.wants_lexical() {
            requested += 1;
            match &self.lexical {
                Some(index) => {
                    signals.push(SignalScores {
                        by_id: index.score_by_id(query).into_iter().collect(),
                        weight: weights.lexical,
                        center: false,
                    });
                }
                None => {
                    warn!("lexical signal unavailable: index not loaded");
                    unavailable += 1;
                }
            }
        }

        if mode.wants_semantic() {
            requested += 1;
            match &self.semantic {
                Some(index) => match index.score(query, &self.provider).await {
                    Ok(scored) => signals.push(SignalScores {
                        by_id: scored.into_iter().collect(),
                        weight: weights.semantic,
                        center: false,
                    }),
                    Err(e) => {
                        warn!(error = %e, "semantic signal unavailable: query embedding failed");
                        unavailable += 1;
                    }
                },
                None => {
                    warn!("semantic signal unavailable: index not loaded");
                    unavailable += 1;
                }
            }
        }

        if mode.wants_exact() {
            requested += 1;
            signals.push(SignalScores {
                by_id: self.exact_scores(query),
                weight: weights.exact,
                center: true,
            });
        }

        if unavailable == requested {
            return Err(QueryError::IndicesNotReady);
        }

        // Fuse: normalize each signal independently, then weighted-sum.
        let mut fused: HashMap<i64, f32> = HashMap::new();
        let mut matched: HashMap<i64, bool> = HashMap::new();
        for signal in &signals {
            for (&id, &raw) in &signal.by_id {
                if raw != 0.0 {
                    matched.insert(id, true);
                }
            }
            let Some(normalized) = normalize_signal(&signal.by_id, signal.center) else {
                // Degenerate signal (empty or uniformly zero): dropped.
                continue;
            };
            for (id, norm) in normalized {
                *fused.entry(id).or_insert(0.0) += norm * signal.weight;
            }
        }

        // Materialize in corpus retrieval order so the stable sort breaks
        // ties the way the snapshot orders records.
        let mut results: Vec<RankedPaper> = self
            .papers
            .iter()
            .filter_map(|p| {
                let id = p.id?;
                if !matched.contains_key(&id) {
                    return None;
                }
                Some(RankedPaper::new(p.clone(), fused.get(&id).copied().unwrap_or(0.0)))
            })
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        self.cache.put(query, mode, weights, limit, &results);
        Ok(results)
    }

    /// Find the papers most similar to a given record, by embedding
    /// similarity alone.
    ///
    /// # Arguments
    /// * `record_id` - The source record
    /// * `top_n` - Maximum number of neighbors
    ///
    /// # Errors
    /// Returns `IndexError::ArtifactMissing` (wrapped) if no semantic index
    /// is loaded, or `IndexError::VectorNotFound` if the record has not
    /// been synced
    pub fn nearest(&self, record_id: i64, top_n: usize) -> QueryResult<Vec<RankedPaper>> {
        let index = self
            .semantic
            .as_ref()
            .ok_or_else(|| IndexError::ArtifactMissing("semantic index".to_string()))?;

        let neighbors = index.nearest(record_id, top_n)?;
        Ok(neighbors
            .into_iter()
            .filter_map(|(id, sim)| {
                self.position
                    .get(&id)
                    .map(|&i| RankedPaper::new(self.papers[i].clone(), sim))
            })
            .collect())
    }

    /// Look up a record from the snapshot.
    pub fn paper(&self, record_id: i64) -> QueryResult<&Paper> {
        self.position
            .get(&record_id)
            .map(|&i| &self.papers[i])
            .ok_or(QueryError::UnknownRecord(record_id))
    }

    /// Exact-match signal: whitespace-tokenized, case-folded query terms
    /// scored per record as
    /// `20 x (tokens found in title) + 10 x (tokens found in authors) +
    /// (occurrences in abstract, summed over tokens)`.
    fn exact_scores(&self, query: &str) -> HashMap<i64, f32> {
        let tokens: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
        let mut scores = HashMap::new();
        if tokens.is_empty() {
            return scores;
        }

        for paper in &self.papers {
            let Some(id) = paper.id else { continue };
            let title = paper.title.to_lowercase();
            let authors = paper.authors.to_lowercase();
            let abstract_text = paper.abstract_text.to_lowercase();

            let mut score = 0.0f32;
            for token in &tokens {
                if title.contains(token.as_str()) {
                    score += 20.0;
                }
                if authors.contains(token.as_str()) {
                    score += 10.0;
                }
                score += count_occurrences(&abstract_text, token) as f32;
            }
            scores.insert(id, score);
        }
        scores
    }
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Normalize a signal's raw scores onto a common scale.
///
/// Similarity signals are divided by the signal maximum. The exact-match
/// signal is not a bounded similarity, so it is additionally centered on
/// the mean before dividing by the maximum of the raw scores.
///
/// Returns `None` for a degenerate signal (empty, or a maximum of zero),
/// which the caller drops instead of dividing by zero.
fn normalize_signal(by_id: &HashMap<i64, f32>, center: bool) -> Option<Vec<(i64, f32)>> {
    if by_id.is_empty() {
        return None;
    }
    let max = by_id.values().fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    if max <= 0.0 {
        return None;
    }
    let mean = if center {
        by_id.values().sum::<f32>() / by_id.len() as f32
    } else {
        0.0
    };
    Some(by_id.iter().map(|(&id, &v)| (id, (v - mean) / max)).collect())
}
