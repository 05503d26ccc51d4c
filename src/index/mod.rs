//! Persisted similarity indices.
//!
//! Two indices are maintained over the corpus:
//!
//! - [`lexical`]: a whole-corpus TF-IDF snapshot, rebuilt from scratch
//!   whenever the record set or any record's text changes
//! - [`semantic`]: a per-record embedding map, incrementally resynced by
//!   comparing content fingerprints
//!
//! Both persist their state as JSON artifacts. Artifacts are written to a
//! temporary file and renamed into place, so a failed rebuild never
//! overwrites a working artifact with partial output. Loaded artifacts are
//! treated as immutable snapshots by query-time code.

pub mod lexical;
pub mod semantic;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while building, loading, or querying an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No records to index; fatal to this rebuild, not to the process
    #[error("Cannot build index over an empty corpus")]
    EmptyCorpus,

    /// A record has no stored vector (not yet synced)
    #[error("No vector stored for record {0}; run a semantic sync first")]
    VectorNotFound(i64),

    /// A persisted artifact is absent
    #[error("Index artifact missing: {0}")]
    ArtifactMissing(String),

    /// Embedding generation failed during a sync
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// Artifact read/write failure
    #[error("Artifact IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Artifact (de)serialization failure
    #[error("Artifact format error: {0}")]
    FormatError(#[from] serde_json::Error),
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Write a serializable artifact atomically.
///
/// Serializes to a temporary file next to the target and renames it into
/// place, so readers either see the old artifact or the complete new one.
pub(crate) fn write_artifact<T: Serialize>(path: &Path, value: &T) -> IndexResult<()> {
    let tmp = path.with_extension("tmp");
    let data = serde_json::to_vec(value)?;
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load an artifact, mapping a missing file to `ArtifactMissing`.
pub(crate) fn read_artifact<T: DeserializeOwned>(path: &Path) -> IndexResult<T> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IndexError::ArtifactMissing(path.display().to_string()));
        }
        Err(e) => return Err(IndexError::IoError(e)),
    };
    Ok(serde_json::from_slice(&data)?)
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ,
/// so degenerate inputs score as "no similarity" instead of panicking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_artifact_roundtrip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.json");

        assert!(matches!(
            read_artifact::<Vec<i64>>(&path),
            Err(IndexError::ArtifactMissing(_))
        ));

        write_artifact(&path, &vec![1i64, 2, 3]).unwrap();
        let back: Vec<i64> = read_artifact(&path).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
