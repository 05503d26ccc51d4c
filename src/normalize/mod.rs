//! Text canonicalization for comparing records across sources.
//!
//! Different adapters deliver the same paper with cosmetic differences:
//! DBLP titles end with a period, BibTeX author names carry diacritics that
//! the arXiv feed strips, and whitespace varies everywhere. The functions in
//! this module reduce those variants to a canonical form so that records
//! from different sources compare equal.
//!
//! All functions here are pure and total: they never fail, and empty input
//! yields an empty string.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize an author string by stripping diacritical marks.
///
/// The string is decomposed (NFKD) and every combining mark is dropped, so
/// "Müller" and "Muller" compare equal.
///
/// # Arguments
/// * `raw` - The raw author string (single pre-joined string)
///
/// # Returns
/// The author string without combining marks
///
/// # Example
/// ```
/// use paper_rank::normalize::normalize_authors;
/// assert_eq!(normalize_authors("Jörg Müller"), "Jorg Muller");
/// ```
pub fn normalize_authors(raw: &str) -> String {
    raw.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Canonicalize a title by trimming whitespace and one trailing period.
///
/// DBLP appends a period to titles; arXiv does not. Only a single trailing
/// period is removed so an ellipsis survives mostly intact.
///
/// # Example
/// ```
/// use paper_rank::normalize::normalize_title;
/// assert_eq!(normalize_title("  Deep Learning. "), "Deep Learning");
/// ```
pub fn normalize_title(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

/// Normalize free text for vectorization and query matching.
///
/// Lowercases, trims, and collapses consecutive whitespace to single
/// spaces. Applied to index text and query text alike so both live in the
/// same space.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The business key under which duplicate records are grouped.
///
/// Two records with equal keys represent the same paper and are eventually
/// merged by the duplicate resolver.
pub fn dedup_key(title: &str, authors: &str) -> (String, String) {
    (normalize_title(title), normalize_authors(authors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_authors_strips_diacritics() {
        assert_eq!(normalize_authors("Jörg Müller"), "Jorg Muller");
        assert_eq!(normalize_authors("Héctor García"), "Hector Garcia");
        assert_eq!(normalize_authors("François Chollet"), "Francois Chollet");
    }

    #[test]
    fn test_normalize_authors_plain_ascii_unchanged() {
        assert_eq!(normalize_authors("Isaac Newton, Ada Lovelace"), "Isaac Newton, Ada Lovelace");
    }

    #[test]
    fn test_normalize_authors_empty() {
        assert_eq!(normalize_authors(""), "");
    }

    #[test]
    fn test_normalize_title_trailing_period() {
        assert_eq!(normalize_title("Deep Learning."), "Deep Learning");
        assert_eq!(normalize_title("Deep Learning"), "Deep Learning");
    }

    #[test]
    fn test_normalize_title_only_one_period_removed() {
        assert_eq!(normalize_title("To be continued..."), "To be continued..");
    }

    #[test]
    fn test_normalize_title_whitespace() {
        assert_eq!(normalize_title("  Spaced Out Title.  "), "Spaced Out Title");
        assert_eq!(normalize_title("   "), "");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Hello World"), "hello world");
        assert_eq!(normalize_text("  Multiple   Spaces  "), "multiple spaces");
        assert_eq!(normalize_text("UPPERCASE"), "uppercase");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_dedup_key_equates_source_variants() {
        // Same paper as delivered by DBLP (trailing period, diacritics)
        // and by arXiv (no period, stripped diacritics).
        let dblp = dedup_key("Attention Is All You Need.", "Łukasz Kaiser");
        let arxiv = dedup_key("Attention Is All You Need", "Łukasz Kaiser");
        assert_eq!(dblp, arxiv);
    }
}
