//! Fallback orchestrator.
//!
//! Classifies the question and dispatches retrieval: RMF rule shortcut
//! first, then article shortcut, then hybrid vector+keyword search over a
//! temporal fallback chain. Structural lookups always run before hybrid
//! passes within a query; the chain is bounded so worst-case latency is
//! the chain length times the per-pass cost.

use crate::chunking::header::strip_accents;
use crate::core::Evidence;
use crate::error::Result;
use crate::retrieval::article_lookup::{filter_unrequested_bis, lookup_article};
use crate::retrieval::rule_lookup::lookup_rule;
use crate::retrieval::merge_evidence;
use crate::routing::resolve_candidate_documents;
use crate::storage::{SearchOptions, Store};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

/// Oldest year reachable by the temporal fallback chain.
const CHAIN_FLOOR_YEAR: i32 = 2022;

/// Row budget for structural lookups.
const STRUCTURAL_LIMIT: usize = 50;

/// `regla 2.1.1` style references: 2 to 6 dotted segments.
#[allow(clippy::unwrap_used)]
static RULE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bregla\s+(\d+(?:\.\d+){1,5})\b").unwrap());

/// `Artículo 69-B [bis]` style references.
#[allow(clippy::unwrap_used)]
static ARTICLE_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bart[ií]culo\s+(\d{1,4})\s*(?:[-\x{2013}\x{2014}]\s*([a-zA-Z])\b)?(\s*bis\b)?",
    )
    .unwrap()
});

/// Bare `29-A [bis]` style references.
#[allow(clippy::unwrap_used)]
static ARTICLE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*[-\x{2013}\x{2014}]\s*([a-zA-Z])\b(\s*bis\b)?").unwrap()
});

/// Phrases that signal literal-citation intent.
const LITERAL_INTENT_PHRASES: [&str; 5] = [
    "cítame",
    "citame",
    "textualmente",
    "cita literal",
    "cita textual",
];

/// Substrings that signal a general-deductions question.
const GENERAL_DEDUCTION_TERMS: [&str; 13] = [
    "requisitos",
    "deduccion",
    "deducciones",
    "deducción",
    "deducible",
    "autorizada",
    "estrictamente indispensable",
    "cfdi",
    "comprobante",
    "forma de pago",
    "isr",
    "lisr",
    "impuesto sobre la renta",
];

/// Which retrieval path produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Deterministic RMF rule lookup.
    RmfRuleLookup,
    /// Deterministic article lookup.
    ArticleLookup,
    /// Hybrid vector+keyword search.
    Hybrid,
    /// Full chain exhausted with no evidence.
    Empty,
}

impl Route {
    /// Wire name of the route, as exposed in debug traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RmfRuleLookup => "rmf_rule_lookup",
            Self::ArticleLookup => "article_lookup",
            Self::Hybrid => "hybrid",
            Self::Empty => "empty",
        }
    }
}

/// A parsed article reference from the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleRef {
    /// Article number.
    pub number: u32,
    /// Optional single-letter suffix, uppercased.
    pub letter: Option<char>,
    /// Whether the question explicitly said `bis`.
    pub wants_bis: bool,
}

/// Result of the orchestrated retrieval.
#[derive(Debug)]
pub struct RetrievalOutcome {
    /// Evidence entries, best first.
    pub evidence: Vec<Evidence>,
    /// Year the evidence came from. 0 for article routes (statutes are
    /// evergreen); the requested year when nothing was found.
    pub used_year: i32,
    /// Which path produced the evidence.
    pub route: Route,
    /// Literal-citation intent attached to a structural reference. The
    /// bridge must answer with raw text (or the no-fragment message),
    /// never an LLM paraphrase.
    pub literal: bool,
}

/// Question intent flags derived from the lowercased text.
struct Intent {
    has_regla: bool,
    has_rmf: bool,
    mentions_anexo: bool,
    mentions_dof: bool,
    general_deductions: bool,
}

impl Intent {
    fn of(q_lower: &str) -> Self {
        Self {
            has_regla: q_lower.contains("regla"),
            has_rmf: q_lower.contains("rmf") || q_lower.contains("miscel"),
            mentions_anexo: q_lower.contains("anexo"),
            mentions_dof: q_lower.contains("dof") || q_lower.contains("diario oficial"),
            general_deductions: GENERAL_DEDUCTION_TERMS.iter().any(|t| q_lower.contains(t)),
        }
    }

    /// RMF-specific questions restrict retrieval to the exact year.
    const fn restrict_year(&self) -> bool {
        self.has_regla || self.has_rmf
    }
}

/// Extracts a dotted rule reference (`regla 2.1.1`) from the question.
#[must_use]
pub fn detect_rule_ref(question: &str) -> Option<String> {
    RULE_REF_RE
        .captures(question)
        .map(|caps| caps[1].to_string())
}

/// Extracts an article reference from the question.
///
/// Tries the `Artículo N[-L][ bis]` form first, then the bare `N-L[ bis]`
/// shape.
#[must_use]
pub fn detect_article_ref(question: &str) -> Option<ArticleRef> {
    let from_caps = |caps: &regex::Captures<'_>| -> Option<ArticleRef> {
        let number: u32 = caps.get(1)?.as_str().parse().ok()?;
        let letter = caps
            .get(2)
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_uppercase());
        let wants_bis = caps.get(3).is_some();
        Some(ArticleRef {
            number,
            letter,
            wants_bis,
        })
    };

    ARTICLE_KEYWORD_RE
        .captures(question)
        .as_ref()
        .and_then(from_caps)
        .or_else(|| ARTICLE_CODE_RE.captures(question).as_ref().and_then(from_caps))
}

/// True when the question asks for verbatim text.
#[must_use]
pub fn wants_literal(q_lower: &str) -> bool {
    LITERAL_INTENT_PHRASES.iter().any(|p| q_lower.contains(p))
}

/// Builds the candidate-year chain for a requested fiscal year.
///
/// Recent years fall back to `[year, 2024, 2023, 2022]`; anything newer
/// walks down year by year to 2022; years before the corpus floor stand
/// alone.
#[must_use]
pub fn candidate_years(year: i32) -> Vec<i32> {
    if year == 2025 || year == 2026 {
        vec![year, 2024, 2023, CHAIN_FLOOR_YEAR]
    } else if year > CHAIN_FLOOR_YEAR {
        (CHAIN_FLOOR_YEAR..=year).rev().collect()
    } else {
        vec![year]
    }
}

/// Keeps compiled documents over piecemeal modification decrees.
///
/// Compiled RMF publications supersede the modification decrees they
/// absorb; when both appear in a result set only the compiled fragments
/// survive.
fn supersession_filter(evidence: Vec<Evidence>) -> Vec<Evidence> {
    let fold = |name: &str| strip_accents(&name.to_lowercase());

    let compiled: Vec<Evidence> = evidence
        .iter()
        .filter(|e| fold(&e.source_filename).contains("compilado"))
        .cloned()
        .collect();
    if !compiled.is_empty() {
        return compiled;
    }

    let modifications: Vec<Evidence> = evidence
        .iter()
        .filter(|e| fold(&e.source_filename).contains("modificacion"))
        .cloned()
        .collect();
    if !modifications.is_empty() {
        return modifications;
    }

    evidence
}

/// Hybrid pass configurations for one year, in dispatch order.
fn year_passes(year: i32, top_k: usize, intent: &Intent) -> Vec<SearchOptions> {
    let relax = !intent.restrict_year();

    let (first, second) = if intent.general_deductions {
        (Some("ley"), Some("rmf"))
    } else if intent.restrict_year() {
        (Some("rmf"), None)
    } else {
        (None, None)
    };

    let exclude_anexo = if intent.mentions_anexo || intent.mentions_dof {
        None
    } else {
        Some("anexo")
    };

    let base =
        SearchOptions::for_year(year, top_k).with_year_relaxations(relax, relax);

    let mut passes: Vec<SearchOptions> = Vec::new();
    let mut push = |options: SearchOptions| {
        if !passes.contains(&options) {
            passes.push(options);
        }
    };

    if first.is_some() {
        push(base.clone().with_prefer(first).with_exclude(exclude_anexo));
    }
    if second.is_some() {
        push(base.clone().with_prefer(second).with_exclude(exclude_anexo));
    }
    push(base.clone().with_exclude(exclude_anexo));
    push(base);

    passes
}

/// Runs the routed retrieval for one question.
///
/// Contract: given the question, the requested fiscal year, the query
/// embedding, and the extracted keywords, returns the evidence with the
/// year it came from, the route taken, and the literal-citation flag.
///
/// # Errors
///
/// Returns an error if any store query fails. Retrieval emptiness is not
/// an error; the outcome carries `Route::Empty` instead.
pub fn retrieve_with_fallback(
    store: &dyn Store,
    question: &str,
    fiscal_year: i32,
    query_vec: &[f32],
    keywords: &[String],
    top_k: usize,
) -> Result<RetrievalOutcome> {
    let q_lower = question.to_lowercase();
    let intent = Intent::of(&q_lower);
    let literal = wants_literal(&q_lower);

    let rule_ref = detect_rule_ref(question);
    let article_ref = detect_article_ref(question);
    let structural_ref = rule_ref.is_some() || article_ref.is_some();

    // Step 1: rule shortcut
    if let Some(rule_id) = rule_ref {
        let evidence = lookup_rule(store, fiscal_year, &rule_id, None, STRUCTURAL_LIMIT)?;
        if !evidence.is_empty() {
            debug!(rule_id = %rule_id, year = fiscal_year, hits = evidence.len(), "rule shortcut");
            return Ok(RetrievalOutcome {
                evidence,
                used_year: fiscal_year,
                route: Route::RmfRuleLookup,
                literal,
            });
        }
    }

    // Step 2: article shortcut, suppressed when the question says "regla"
    if !intent.has_regla {
        if let Some(article) = article_ref {
            let suffix_word = article.wants_bis.then_some("BIS");
            for document_id in resolve_candidate_documents(question) {
                let found = lookup_article(
                    store,
                    &document_id,
                    article.number,
                    article.letter,
                    suffix_word,
                    STRUCTURAL_LIMIT.max(top_k),
                )?;

                let found = if article.wants_bis {
                    found
                } else {
                    filter_unrequested_bis(found, article.number, article.letter)
                };

                if !found.is_empty() {
                    debug!(
                        document_id = %document_id,
                        number = article.number,
                        hits = found.len(),
                        "article shortcut"
                    );
                    // Statutes are evergreen; suppressing the year context
                    // is the signal downstream
                    return Ok(RetrievalOutcome {
                        evidence: found,
                        used_year: 0,
                        route: Route::ArticleLookup,
                        literal,
                    });
                }
            }
        }
    }

    // Step 3: hybrid with temporal fallback
    for year in candidate_years(fiscal_year) {
        for options in year_passes(year, top_k, &intent) {
            let vector = store.vector_chunks(query_vec, &options)?;
            let keyword = store.keyword_chunks(keywords, &options, top_k)?;
            let merged = supersession_filter(merge_evidence(vector, keyword, top_k));

            if !merged.is_empty() {
                debug!(
                    year,
                    prefer = options.prefer_doc_type.as_deref().unwrap_or("-"),
                    exclude = options.exclude_doc_type.as_deref().unwrap_or("-"),
                    hits = merged.len(),
                    "hybrid pass"
                );
                return Ok(RetrievalOutcome {
                    evidence: merged,
                    used_year: year,
                    route: Route::Hybrid,
                    literal: literal && structural_ref,
                });
            }
        }
    }

    Ok(RetrievalOutcome {
        evidence: Vec::new(),
        used_year: fiscal_year,
        route: Route::Empty,
        literal: literal && structural_ref,
    })
}
