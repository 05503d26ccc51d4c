//! Content fingerprinting for staleness detection.
//!
//! The semantic index caches one embedding per record. Recomputing every
//! embedding on every sync would make maintenance cost proportional to the
//! whole corpus, so each record's text content is fingerprinted and a vector
//! is recomputed only when the fingerprint changes.
//!
//! The digest is collision-resistant (SHA-256) so a changed byte in any
//! field always changes the fingerprint. It is used purely for change
//! detection, not for security.

use sha2::{Digest, Sha256};

use crate::models::Paper;

/// Compute a stable fingerprint over a record's text fields.
///
/// Hashes title, authors, and abstract with a separator between fields so
/// that moving a byte across a field boundary also changes the digest.
///
/// # Arguments
/// * `paper` - The record to fingerprint
///
/// # Returns
/// A lowercase hex digest string
pub fn fingerprint(paper: &Paper) -> String {
    fingerprint_fields(&paper.title, &paper.authors, &paper.abstract_text)
}

/// Fingerprint raw field values without constructing a record.
pub fn fingerprint_fields(title: &str, authors: &str, abstract_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0x1f]);
    hasher.update(authors.as_bytes());
    hasher.update([0x1f]);
    hasher.update(abstract_text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let paper = Paper::new("Deep Learning", "J. Smith", "We study things.");
        assert_eq!(fingerprint(&paper), fingerprint(&paper));
    }

    #[test]
    fn test_fingerprint_changes_with_any_field() {
        let base = Paper::new("Deep Learning", "J. Smith", "We study things.");
        let title = Paper::new("Deep Learning!", "J. Smith", "We study things.");
        let authors = Paper::new("Deep Learning", "J. Smyth", "We study things.");
        let abs = Paper::new("Deep Learning", "J. Smith", "We study thingz.");

        let fp = fingerprint(&base);
        assert_ne!(fp, fingerprint(&title));
        assert_ne!(fp, fingerprint(&authors));
        assert_ne!(fp, fingerprint(&abs));
    }

    #[test]
    fn test_fingerprint_ignores_provenance_fields() {
        let mut a = Paper::new("Deep Learning", "J. Smith", "We study things.");
        let mut b = a.clone();
        a.arxiv_url = Some("http://arxiv.org/abs/1".to_string());
        b.publication_name = Some("NeurIPS".to_string());
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_field_boundaries_are_separated() {
        // "ab" + "c" must not collide with "a" + "bc".
        assert_ne!(
            fingerprint_fields("ab", "c", ""),
            fingerprint_fields("a", "bc", "")
        );
    }
}
