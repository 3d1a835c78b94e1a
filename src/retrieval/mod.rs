//! Retrieval: structural lookups, hybrid search, and the fallback
//! orchestrator.
//!
//! Structural lookups (article, RMF rule) run first and are deterministic;
//! hybrid vector+keyword search with a temporal fallback chain covers
//! everything else. See [`fallback::retrieve_with_fallback`] for the
//! query-time entry point.

pub mod article_lookup;
pub mod fallback;
pub mod rule_lookup;

pub use article_lookup::{filter_unrequested_bis, lookup_article};
pub use fallback::{ArticleRef, RetrievalOutcome, Route, candidate_years, retrieve_with_fallback};
pub use rule_lookup::lookup_rule;

use crate::core::Evidence;
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Characters of text that participate in merge deduplication.
const DEDUP_PREFIX_CHARS: usize = 200;

/// Hash of the first [`DEDUP_PREFIX_CHARS`] characters of a text.
fn prefix_hash(text: &str) -> u64 {
    let prefix: String = text.chars().take(DEDUP_PREFIX_CHARS).collect();
    let mut hasher = DefaultHasher::new();
    prefix.hash(&mut hasher);
    hasher.finish()
}

/// Merges vector and keyword results, vector-first, deduplicating by text
/// prefix. Keyword results fill the remaining slots up to `top_k`.
#[must_use]
pub fn merge_evidence(
    vector: Vec<Evidence>,
    keyword: Vec<Evidence>,
    top_k: usize,
) -> Vec<Evidence> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut merged = Vec::with_capacity(top_k);

    for entry in vector.into_iter().chain(keyword) {
        if merged.len() >= top_k {
            break;
        }
        if seen.insert(prefix_hash(&entry.text)) {
            merged.push(entry);
        }
    }

    merged
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::{Evidence, EvidenceOrigin};

    /// Builds a bare evidence entry for merge/filter tests.
    pub(crate) fn evidence(chunk_id: i64, text: &str, origin: EvidenceOrigin) -> Evidence {
        Evidence {
            chunk_id,
            document_id: "DOC".to_string(),
            source_filename: "DOC.pdf".to_string(),
            doc_type: "ley".to_string(),
            norm_kind: "ARTICLE".to_string(),
            norm_id: "1".to_string(),
            text: text.to_string(),
            page_start: Some(1),
            page_end: Some(1),
            published_date: None,
            score: 0.9,
            origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::evidence;
    use super::*;
    use crate::core::EvidenceOrigin;

    #[test]
    fn test_merge_vector_first() {
        let vector = vec![evidence(1, "texto a", EvidenceOrigin::Vector)];
        let keyword = vec![evidence(2, "texto b", EvidenceOrigin::Keyword)];
        let merged = merge_evidence(vector, keyword, 10);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].origin, EvidenceOrigin::Vector);
    }

    #[test]
    fn test_merge_dedups_by_prefix() {
        let shared = "mismo texto ".repeat(30);
        let vector = vec![evidence(1, &shared, EvidenceOrigin::Vector)];
        let keyword = vec![evidence(2, &shared, EvidenceOrigin::Keyword)];
        let merged = merge_evidence(vector, keyword, 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].chunk_id, 1);
    }

    #[test]
    fn test_merge_dedup_ignores_tail_differences() {
        let prefix = "p".repeat(DEDUP_PREFIX_CHARS);
        let a = format!("{prefix} cola uno");
        let b = format!("{prefix} cola dos");
        let merged = merge_evidence(
            vec![evidence(1, &a, EvidenceOrigin::Vector)],
            vec![evidence(2, &b, EvidenceOrigin::Keyword)],
            10,
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_respects_top_k() {
        let vector: Vec<_> = (0..8)
            .map(|i| evidence(i, &format!("texto vector {i}"), EvidenceOrigin::Vector))
            .collect();
        let keyword: Vec<_> = (8..16)
            .map(|i| evidence(i, &format!("texto keyword {i}"), EvidenceOrigin::Keyword))
            .collect();
        let merged = merge_evidence(vector, keyword, 5);
        assert_eq!(merged.len(), 5);
        assert!(merged.iter().all(|e| e.origin == EvidenceOrigin::Vector));
    }
}
