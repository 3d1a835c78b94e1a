//! Document router.
//!
//! Resolves a question to an ordered, deduplicated list of candidate
//! document IDs through a prioritized alias table. Matching a statute also
//! appends its regulation counterpart. When no alias matches, a fixed
//! baseline (constitution, tax code, income-tax law) is returned.

use crate::core::doc_ids;
use regex::Regex;
use std::sync::LazyLock;

/// Baseline candidates when no alias matches.
pub const BASE_LEGAL_DOCS: [&str; 3] = [doc_ids::CPEUM, doc_ids::CFF, doc_ids::LISR];

/// Regulation counterparts appended when the corresponding statute
/// matches. Intentionally incomplete: pairs exist only for statutes whose
/// regulation is in the corpus.
const REGLAMENTO_COUNTERPART: &[(&str, &str)] = &[
    (doc_ids::CFF, doc_ids::RCFF),
    (doc_ids::LISR, doc_ids::RLISR),
    (doc_ids::LIVA, doc_ids::RLIVA),
    (doc_ids::LEY_ADUANERA, doc_ids::RLA),
];

/// Alias patterns, checked in order. Acronyms and common phrasings.
#[allow(clippy::unwrap_used)]
static DOC_ALIASES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"(?i)\b(cpeum|constituci[oó]n|constitucional)\b",
            doc_ids::CPEUM,
        ),
        (r"(?i)\b(cff|c[oó]digo fiscal)\b", doc_ids::CFF),
        (
            r"(?i)\b(lisr|isr|impuesto sobre la renta|renta)\b",
            doc_ids::LISR,
        ),
        (
            r"(?i)\b(liva|iva|impuesto al valor agregado)\b",
            doc_ids::LIVA,
        ),
        (
            r"(?i)\b(ieps|impuesto especial sobre producci[oó]n)\b",
            doc_ids::IEPS,
        ),
        (r"(?i)\b(ley aduanera|aduaner[oa])\b", doc_ids::LEY_ADUANERA),
    ]
    .into_iter()
    .map(|(pattern, doc)| (Regex::new(pattern).unwrap(), doc))
    .collect()
});

/// Article-reference shape used by the tax-code hard override.
#[allow(clippy::unwrap_used)]
static ARTICLE_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bart[ií]culo\s+\d{1,4}\b|\b\d{1,3}\s*[-\x{2013}\x{2014}]\s*[a-zA-Z]\b")
        .unwrap()
});

/// Resolves the ordered candidate document list for a question.
///
/// Hard override: a question that names the federal tax code *and*
/// carries an article-reference shape resolves to exactly the tax code,
/// suppressing every other candidate. This keeps a request for a specific
/// article of a specific code from pulling in sibling statutes.
#[must_use]
pub fn resolve_candidate_documents(question: &str) -> Vec<String> {
    let mut resolved: Vec<&str> = Vec::new();

    for (pattern, doc_id) in DOC_ALIASES.iter() {
        if pattern.is_match(question) {
            resolved.push(*doc_id);
            if let Some((_, reg)) = REGLAMENTO_COUNTERPART.iter().find(|(law, _)| law == doc_id) {
                resolved.push(*reg);
            }
        }
    }

    if resolved.contains(&doc_ids::CFF) && ARTICLE_SHAPE_RE.is_match(question) {
        return vec![doc_ids::CFF.to_string()];
    }

    if resolved.is_empty() {
        resolved.extend(BASE_LEGAL_DOCS);
    }

    let mut seen = std::collections::HashSet::new();
    resolved
        .into_iter()
        .filter(|d| seen.insert(*d))
        .map(str::to_string)
        .collect()
}
