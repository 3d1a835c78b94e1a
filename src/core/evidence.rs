//! Evidence records produced by retrieval.
//!
//! Evidence is an in-memory chunk decorated with a retrieval score and the
//! route that produced it. It exists only for the lifetime of one query
//! and is never persisted.

use serde::Serialize;

/// Which retrieval path produced an evidence entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceOrigin {
    /// Cosine-distance ranking over the embedding column.
    Vector,
    /// Case-insensitive substring match.
    Keyword,
    /// Deterministic article lookup by `(document_id, norm_id)`.
    ArticleLookup,
    /// Deterministic RMF rule lookup by `(year, norm_id)`.
    RmfRuleLookup,
}

impl EvidenceOrigin {
    /// Wire name of the origin, as exposed in debug traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::ArticleLookup => "article_lookup",
            Self::RmfRuleLookup => "rmf_rule_lookup",
        }
    }
}

/// A retrieved text fragment with its provenance and score.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    /// Chunk identifier (monotonic within a document in ingestion order).
    pub chunk_id: i64,
    /// Owning document.
    pub document_id: String,
    /// Filename of the source PDF.
    pub source_filename: String,
    /// Document type (`ley`, `rmf`, `anexo`, ...).
    pub doc_type: String,
    /// Chunk norm kind (`ARTICLE`, `PREAMBULO`, `RULE`, ...).
    pub norm_kind: String,
    /// Canonical norm identifier within the document.
    pub norm_id: String,
    /// Fragment text.
    pub text: String,
    /// First source page covered by the fragment (1-based).
    pub page_start: Option<u32>,
    /// Last source page covered by the fragment (1-based).
    pub page_end: Option<u32>,
    /// Publication date of the owning document, if known.
    pub published_date: Option<String>,
    /// Retrieval score. 1.0 for structural lookups, cosine similarity for
    /// vector hits.
    pub score: f32,
    /// Route that produced this entry.
    pub origin: EvidenceOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_wire_names() {
        assert_eq!(EvidenceOrigin::Vector.as_str(), "vector");
        assert_eq!(EvidenceOrigin::Keyword.as_str(), "keyword");
        assert_eq!(EvidenceOrigin::ArticleLookup.as_str(), "article_lookup");
        assert_eq!(EvidenceOrigin::RmfRuleLookup.as_str(), "rmf_rule_lookup");
    }

    #[test]
    fn test_origin_serializes_snake_case() {
        let json = serde_json::to_string(&EvidenceOrigin::RmfRuleLookup).unwrap();
        assert_eq!(json, "\"rmf_rule_lookup\"");
    }
}
