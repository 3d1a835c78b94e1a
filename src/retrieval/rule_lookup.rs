//! Deterministic RMF rule lookup.

use crate::core::Evidence;
use crate::error::Result;
use crate::storage::Store;
use regex::Regex;

/// Retrieves the fragments of one RMF rule for a fiscal year.
///
/// Fragments come back preferred-document-first, then by `page_start`
/// (nulls last), then `chunk_id`. When any fragment *begins* the rule
/// body (its text matches `^<rule_id>. ` at a line start), index and
/// table-of-contents fragments are discarded in its favor.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn lookup_rule(
    store: &dyn Store,
    year: i32,
    rule_id: &str,
    prefer_document_id: Option<&str>,
    limit: usize,
) -> Result<Vec<Evidence>> {
    let rule_id = rule_id.trim();
    if rule_id.is_empty() {
        return Ok(Vec::new());
    }

    let mut evidence = store.rule_chunks(year, rule_id, prefer_document_id, limit)?;

    // Prefer rule bodies over index entries
    let pattern = format!(r"(?m)^\s*{}\.\s", regex::escape(rule_id));
    if let Ok(body_re) = Regex::new(&pattern) {
        let body: Vec<Evidence> = evidence
            .iter()
            .filter(|e| body_re.is_match(&e.text))
            .cloned()
            .collect();
        if !body.is_empty() {
            evidence = body;
        }
    }

    Ok(evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Document, EvidenceOrigin, doc_type, norm_kind};
    use crate::storage::{NewChunk, SqliteStore, Store};

    fn rmf_store() -> SqliteStore {
        let mut store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        store
            .upsert_document(&Document {
                document_id: "RMF2025".to_string(),
                title: "RMF 2025".to_string(),
                doc_family: "RMF".to_string(),
                doc_type: doc_type::RMF.to_string(),
                exercise_year: 2025,
                source_filename: "RMF2025.pdf".to_string(),
                source_path: String::new(),
                published_date: None,
            })
            .unwrap();
        store
    }

    fn insert_rule(store: &mut SqliteStore, text: &str, rule: &str, page: u32) -> i64 {
        store
            .insert_chunk(&NewChunk {
                document_id: "RMF2025",
                text,
                embedding: None,
                norm_kind: norm_kind::RULE,
                norm_id: rule,
                page_start: page,
                page_end: page,
                metadata: serde_json::json!({}),
            })
            .unwrap()
    }

    #[test]
    fn test_body_preferred_over_index() {
        let mut store = rmf_store();
        insert_rule(&mut store, "Cobro de créditos fiscales 2.1.1.", "2.1.1", 3);
        let body = insert_rule(&mut store, "2.1.1. Para los efectos del CFF", "2.1.1", 118);

        let evidence = lookup_rule(&store, 2025, "2.1.1", None, 50).unwrap();
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].chunk_id, body);
        assert_eq!(evidence[0].origin, EvidenceOrigin::RmfRuleLookup);
    }

    #[test]
    fn test_all_kept_when_no_body_present() {
        let mut store = rmf_store();
        insert_rule(&mut store, "índice: cobro de créditos", "2.1.1", 3);
        insert_rule(&mut store, "otra mención sin encabezado", "2.1.1", 4);

        let evidence = lookup_rule(&store, 2025, "2.1.1", None, 50).unwrap();
        assert_eq!(evidence.len(), 2);
    }

    #[test]
    fn test_wrong_year_returns_empty() {
        let mut store = rmf_store();
        insert_rule(&mut store, "2.1.1. Para los efectos", "2.1.1", 10);
        assert!(lookup_rule(&store, 2024, "2.1.1", None, 50).unwrap().is_empty());
    }

    #[test]
    fn test_rule_id_is_escaped() {
        let mut store = rmf_store();
        // A dot in the id must not act as a regex wildcard: "2x1x1" would
        // match an unescaped pattern
        insert_rule(&mut store, "2x1x1. texto trampa", "2.1.1", 5);
        insert_rule(&mut store, "2.1.1. cuerpo real", "2.1.1", 9);

        let evidence = lookup_rule(&store, 2025, "2.1.1", None, 50).unwrap();
        assert_eq!(evidence.len(), 1);
        assert!(evidence[0].text.starts_with("2.1.1."));
    }

    #[test]
    fn test_blank_rule_id() {
        let store = rmf_store();
        assert!(lookup_rule(&store, 2025, "  ", None, 50).unwrap().is_empty());
    }
}
