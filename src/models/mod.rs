//! Core data models for the paper ranking system.
//!
//! This module contains the fundamental data structures used across the
//! application: the paper record itself and ranked search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single academic paper.
///
/// This is the unit of storage. A record can carry provenance from more than
/// one source at the same time: a preprint ingested from arXiv that is later
/// matched against a conference listing keeps both its arXiv fields and its
/// publication fields.
///
/// Derived data (TF-IDF rows, embedding vectors) is owned by the indices and
/// keyed by `id` there; it is never stored on the record and never takes
/// part in identity or deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// Unique identifier, assigned by the record store at creation.
    /// Immutable once set.
    pub id: Option<i64>,

    /// Paper title
    pub title: String,

    /// Authors as a single comma-joined string in "Given Family" order,
    /// diacritics stripped (e.g. "Isaac Newton, Gottfried Leibniz")
    pub authors: String,

    /// Abstract text. May be empty until an adapter enriches the record.
    #[serde(default)]
    pub abstract_text: String,

    /// Upload timestamp reported by arXiv, if the record came from there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv_upload_date: Option<DateTime<Utc>>,

    /// arXiv category tags (comma-joined, e.g. "cs.LG, cs.CR")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv_category: Option<String>,

    /// Canonical arXiv URL; doubles as the external identifier used for
    /// idempotent upsert from that source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv_url: Option<String>,

    /// Publication venue name (conference/journal abbreviation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_name: Option<String>,

    /// Publication date as reported by the venue source; kept verbatim
    /// since listings often carry partial dates ("2016" or "2016-06-27")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,

    /// Publication venue URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_url: Option<String>,
}

impl Paper {
    /// Create a minimal record with only the descriptive fields set.
    ///
    /// # Arguments
    /// * `title` - Paper title
    /// * `authors` - Pre-joined author string
    /// * `abstract_text` - Abstract (may be empty)
    pub fn new(title: impl Into<String>, authors: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            authors: authors.into(),
            abstract_text: abstract_text.into(),
            arxiv_upload_date: None,
            arxiv_category: None,
            arxiv_url: None,
            publication_name: None,
            publication_date: None,
            publication_url: None,
        }
    }

    /// Whether the record carries any publication-venue metadata.
    pub fn has_publication_info(&self) -> bool {
        self.publication_name.is_some()
            || self.publication_date.is_some()
            || self.publication_url.is_some()
    }
}

/// A single ranked search result.
///
/// Combines the paper record with the fused (or single-signal) score it
/// obtained for a query. Scores are comparable only within one result set;
/// they are normalized per query, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPaper {
    /// The paper record
    pub paper: Paper,

    /// Fused relevance score (higher is better)
    pub score: f32,
}

impl RankedPaper {
    /// Create a new ranked result.
    pub fn new(paper: Paper, score: f32) -> Self {
        Self { paper, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_paper_has_no_provenance() {
        let paper = Paper::new("A Title", "Jane Doe", "An abstract.");
        assert!(paper.id.is_none());
        assert!(paper.arxiv_url.is_none());
        assert!(!paper.has_publication_info());
    }

    #[test]
    fn test_has_publication_info() {
        let mut paper = Paper::new("A Title", "Jane Doe", "");
        assert!(!paper.has_publication_info());
        paper.publication_name = Some("NeurIPS".to_string());
        assert!(paper.has_publication_info());
    }

    #[test]
    fn test_paper_roundtrips_through_json() {
        let mut paper = Paper::new("Deep Learning", "J. Smith, A. Lee", "We study things.");
        paper.id = Some(7);
        paper.arxiv_url = Some("http://arxiv.org/abs/2401.00001".to_string());
        paper.arxiv_category = Some("cs.LG".to_string());

        let json = serde_json::to_string(&paper).unwrap();
        let back: Paper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, Some(7));
        assert_eq!(back.title, paper.title);
        assert_eq!(back.arxiv_url, paper.arxiv_url);
        assert!(back.publication_name.is_none());
    }

    #[test]
    fn test_missing_optional_fields_deserialize_as_none() {
        let json = r#"{"id":1,"title":"T","authors":"A"}"#;
        let paper: Paper = serde_json::from_str(json).unwrap();
        assert_eq!(paper.abstract_text, "");
        assert!(paper.arxiv_upload_date.is_none());
        assert!(paper.publication_url.is_none());
    }
}
