//! Provider for legacy JSON snapshot exports.
//!
//! Reads the flat export format: a JSON object keyed by the record's
//! external id (its preprint URL), each value carrying the preprint
//! metadata. Upload dates use the `%Y-%m-%dT%H:%M:%SZ` convention; an
//! unparseable date fails the whole fetch rather than silently dropping
//! provenance.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use super::{PaperProvider, ProviderError, ProviderResult};
use crate::models::Paper;

const UPLOAD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One record in the export file. Preprint exports fill the arXiv fields,
/// publication exports fill the venue fields; both shapes share this entry.
#[derive(Debug, Deserialize)]
struct ExportEntry {
    title: String,
    authors: String,
    #[serde(rename = "abstract", default)]
    abstract_text: String,
    #[serde(default)]
    arxiv_upload_date: Option<String>,
    #[serde(default)]
    arxiv_categories: Vec<String>,
    #[serde(default)]
    publication_name: Option<String>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    publication_url: Option<String>,
}

/// Provider reading a legacy JSON export from disk.
pub struct JsonExportProvider {
    path: PathBuf,
}

impl JsonExportProvider {
    /// Create a provider over an export file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn parse_upload_date(raw: &str) -> ProviderResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, UPLOAD_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ProviderError::Malformed(format!("upload date {raw:?}: {e}")))
}

#[async_trait]
impl PaperProvider for JsonExportProvider {
    async fn fetch(&self) -> ProviderResult<Vec<Paper>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{}: {e}", self.path.display())))?;

        // BTreeMap keeps fetch order deterministic across runs.
        let entries: BTreeMap<String, ExportEntry> = serde_json::from_str(&data)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let mut papers = Vec::with_capacity(entries.len());
        for (external_id, entry) in entries {
            let mut paper = Paper::new(&entry.title, &entry.authors, &entry.abstract_text);
            paper.arxiv_url = Some(external_id);
            paper.arxiv_category = entry.arxiv_categories.into_iter().next();
            paper.arxiv_upload_date = entry
                .arxiv_upload_date
                .as_deref()
                .map(parse_upload_date)
                .transpose()?;
            paper.publication_name = entry.publication_name;
            paper.publication_date = entry.publication_date;
            paper.publication_url = entry.publication_url;
            papers.push(paper);
        }
        Ok(papers)
    }

    fn source_name(&self) -> &str {
        "json-export"
    }
}
