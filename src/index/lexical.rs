//! Lexical (TF-IDF) index.
//!
//! A whole-corpus snapshot: fitting produces a vocabulary with inverse
//! document frequencies plus one sparse, L2-normalized row per record. The
//! snapshot is invalid the moment any record's text changes or any record is
//! added or removed, and must be rebuilt before being trusted for scoring;
//! there is no incremental update.
//!
//! Rows are aligned with the corpus sequence the index was fitted on, and
//! the record id of each row is carried explicitly in `row_ids`, so callers
//! never have to reconstruct the alignment from a separate snapshot.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{read_artifact, write_artifact, IndexError, IndexResult};
use crate::models::Paper;
use crate::normalize::normalize_text;

/// Fitted TF-IDF vocabulary and document frequencies.
///
/// Persisted independently of the matrix; the pair is only meaningful when
/// both artifacts come from the same fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfModel {
    /// Term -> column index
    vocabulary: HashMap<String, usize>,

    /// Smoothed inverse document frequency per column
    idf: Vec<f32>,

    /// Number of documents the model was fitted on
    corpus_size: usize,
}

/// Sparse document-term matrix, one row per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfMatrix {
    /// Record id of each row, in fit order
    row_ids: Vec<i64>,

    /// L2-normalized sparse rows as (column, weight) pairs
    rows: Vec<Vec<(usize, f32)>>,
}

/// A fitted lexical index: model plus aligned matrix.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    model: TfidfModel,
    matrix: TfidfMatrix,
}

/// Tokenize text the way the vectorizer expects: lowercase alphanumeric
/// runs of at least two characters.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            if current.chars().count() >= 2 {
                tokens.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if current.chars().count() >= 2 {
        tokens.push(current);
    }
    tokens
}

/// The text a record contributes to the lexical index: title, authors, and
/// abstract joined by spaces.
fn document_text(paper: &Paper) -> String {
    normalize_text(&format!(
        "{} {} {}",
        paper.title, paper.authors, paper.abstract_text
    ))
}

fn l2_normalize(row: &mut [(usize, f32)]) {
    let norm: f32 = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
}

impl LexicalIndex {
    /// Fit a TF-IDF model and matrix over the corpus, in corpus order.
    ///
    /// Records without an id have no row to attribute scores to and are
    /// skipped.
    ///
    /// # Arguments
    /// * `corpus` - Record snapshot
    ///
    /// # Errors
    /// Returns `IndexError::EmptyCorpus` if no record carries an id
    pub fn fit(corpus: &[Paper]) -> IndexResult<Self> {
        let indexed: Vec<&Paper> = corpus.iter().filter(|p| p.id.is_some()).collect();
        if indexed.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let documents: Vec<Vec<String>> = indexed
            .iter()
            .map(|p| tokenize(&document_text(p)))
            .collect();

        // Document frequency per term, vocabulary in sorted term order.
        let mut df: HashMap<&str, usize> = HashMap::new();
        for tokens in &documents {
            let mut seen: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df.entry(term).or_insert(0) += 1;
            }
        }
        let mut terms: Vec<&str> = df.keys().copied().collect();
        terms.sort_unstable();

        let n = indexed.len();
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (col, term) in terms.iter().enumerate() {
            vocabulary.insert(term.to_string(), col);
            let term_df = df[term];
            // Smoothed idf, matching the fitted-vectorizer convention.
            idf.push((((1 + n) as f32) / ((1 + term_df) as f32)).ln() + 1.0);
        }

        let model = TfidfModel {
            vocabulary,
            idf,
            corpus_size: n,
        };

        let mut rows = Vec::with_capacity(n);
        for tokens in &documents {
            rows.push(model.vectorize_tokens(tokens));
        }
        let row_ids = indexed.iter().filter_map(|p| p.id).collect();

        info!(records = n, terms = model.idf.len(), "fitted lexical index");

        Ok(Self {
            model,
            matrix: TfidfMatrix { row_ids, rows },
        })
    }

    /// Score a query against every row.
    ///
    /// The query is transformed with the already-fitted vocabulary; terms
    /// outside it contribute zero weight. Returns one cosine similarity per
    /// row, aligned with `row_ids`.
    pub fn score(&self, query: &str) -> Vec<f32> {
        let tokens = tokenize(&normalize_text(query));
        let query_vec = self.model.vectorize_tokens(&tokens);
        self.matrix
            .rows
            .iter()
            .map(|row| sparse_dot(&query_vec, row))
            .collect()
    }

    /// Score a query, pairing each similarity with its record id.
    pub fn score_by_id(&self, query: &str) -> Vec<(i64, f32)> {
        self.matrix
            .row_ids
            .iter()
            .copied()
            .zip(self.score(query))
            .collect()
    }

    /// Record ids in row order.
    pub fn row_ids(&self) -> &[i64] {
        &self.matrix.row_ids
    }

    /// Number of documents the index was fitted on.
    pub fn len(&self) -> usize {
        self.matrix.rows.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.matrix.rows.is_empty()
    }

    /// Persist the model and the matrix as two independent artifacts.
    ///
    /// Each file is written atomically; a failed save leaves any previous
    /// artifact intact. Loading one artifact from an older fit than the
    /// other is a caller error and is not detected here.
    pub fn save(&self, model_path: &Path, matrix_path: &Path) -> IndexResult<()> {
        write_artifact(model_path, &self.model)?;
        write_artifact(matrix_path, &self.matrix)?;
        Ok(())
    }

    /// Load a previously saved model/matrix pair.
    ///
    /// # Errors
    /// Returns `IndexError::ArtifactMissing` if either file is absent
    pub fn load(model_path: &Path, matrix_path: &Path) -> IndexResult<Self> {
        let model: TfidfModel = read_artifact(model_path)?;
        let matrix: TfidfMatrix = read_artifact(matrix_path)?;
        Ok(Self { model, matrix })
    }
}

impl TfidfModel {
    /// Build an L2-normalized sparse vector from pre-tokenized text using
    /// the fitted vocabulary. Unknown terms are dropped.
    fn vectorize_tokens(&self, tokens: &[String]) -> Vec<(usize, f32)> {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for token in tokens {
            if let Some(&col) = self.vocabulary.get(token) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }
        let mut row: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(col, tf)| (col, tf * self.idf[col]))
            .collect();
        row.sort_unstable_by_key(|(col, _)| *col);
        l2_normalize(&mut row);
        row
    }
}

/// Dot product of two column-sorted sparse vectors.
fn sparse_dot(a: &[(usize, f32)], b: &[(usize, f32)]) -> f32 {
    let mut sum = 0.0;
    let mut i = 0;
    let mut j = 0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: i64, title: &str, abstract_text: &str) -> Paper {
        let mut p = Paper::new(title, "Test Author", abstract_text);
        p.id = Some(id);
        p
    }

    #[test]
    fn test_fit_empty_corpus_fails() {
        assert!(matches!(LexicalIndex::fit(&[]), Err(IndexError::EmptyCorpus)));
    }

    #[test]
    fn test_fit_skips_records_without_an_id() {
        let corpus = vec![
            paper(10, "Graph Networks", "graphs everywhere"),
            Paper::new("Unsaved Draft", "Test Author", "not yet stored"),
            paper(20, "Neural Ranking", "ranking with neurons"),
        ];
        let index = LexicalIndex::fit(&corpus).unwrap();
        assert_eq!(index.row_ids(), &[10, 20]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_fit_all_records_id_less_fails() {
        let corpus = vec![Paper::new("Draft", "Test Author", "text")];
        assert!(matches!(
            LexicalIndex::fit(&corpus),
            Err(IndexError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_tokenize_drops_single_characters() {
        assert_eq!(
            tokenize("A tale of 2 cities, pt I"),
            vec!["tale", "of", "cities", "pt"]
        );
    }

    #[test]
    fn test_rows_align_with_corpus_order() {
        let corpus = vec![
            paper(10, "Graph Networks", "graphs everywhere"),
            paper(20, "Neural Ranking", "ranking with neurons"),
        ];
        let index = LexicalIndex::fit(&corpus).unwrap();
        assert_eq!(index.row_ids(), &[10, 20]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_matching_document_scores_highest() {
        let corpus = vec![
            paper(1, "Transformer Models", "attention mechanisms for sequences"),
            paper(2, "Convolutional Networks", "image classification with filters"),
            paper(3, "Recurrent Networks", "sequence modeling with memory"),
        ];
        let index = LexicalIndex::fit(&corpus).unwrap();
        let scores = index.score("attention transformer");

        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
    }

    #[test]
    fn test_out_of_vocabulary_query_scores_zero() {
        let corpus = vec![
            paper(1, "Transformer Models", "attention mechanisms"),
            paper(2, "Convolutional Networks", "image filters"),
        ];
        let index = LexicalIndex::fit(&corpus).unwrap();
        let scores = index.score("zygomorphic quasar");
        assert!(scores.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_identical_document_scores_near_one() {
        let corpus = vec![
            paper(1, "Transformer Models", "attention mechanisms"),
            paper(2, "Something Else", "entirely unrelated content"),
        ];
        let index = LexicalIndex::fit(&corpus).unwrap();
        let scores = index.score("transformer models test author attention mechanisms");
        assert!(scores[0] > 0.99, "score was {}", scores[0]);
    }

    #[test]
    fn test_score_by_id_pairs_ids_with_scores() {
        let corpus = vec![
            paper(7, "Alpha", "alpha things"),
            paper(8, "Beta", "beta things"),
        ];
        let index = LexicalIndex::fit(&corpus).unwrap();
        let scored = index.score_by_id("alpha");
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].0, 7);
        assert!(scored[0].1 > scored[1].1);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("tfidf_model.json");
        let matrix_path = dir.path().join("tfidf_matrix.json");

        let corpus = vec![
            paper(1, "Transformer Models", "attention mechanisms"),
            paper(2, "Convolutional Networks", "image filters"),
        ];
        let index = LexicalIndex::fit(&corpus).unwrap();
        index.save(&model_path, &matrix_path).unwrap();

        let loaded = LexicalIndex::load(&model_path, &matrix_path).unwrap();
        assert_eq!(loaded.row_ids(), index.row_ids());
        assert_eq!(loaded.score("attention"), index.score("attention"));
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let result = LexicalIndex::load(
            &dir.path().join("model.json"),
            &dir.path().join("matrix.json"),
        );
        assert!(matches!(result, Err(IndexError::ArtifactMissing(_))));
    }
}
