//! Deterministic article lookup.

use crate::chunking::compose_article_token;
use crate::core::Evidence;
use crate::error::Result;
use crate::storage::Store;
use regex::RegexBuilder;

/// Retrieves the fragments of one article by canonical token equality.
///
/// The token is composed from the parsed parts (`27`, `69-B`,
/// `69-B-BIS`); fragments come back ordered by `chunk_id`, i.e. in
/// ingestion order.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn lookup_article(
    store: &dyn Store,
    document_id: &str,
    number: u32,
    letter: Option<char>,
    suffix_word: Option<&str>,
    limit: usize,
) -> Result<Vec<Evidence>> {
    let token = compose_article_token(number, letter, suffix_word);
    store.article_chunks(document_id, &token, limit)
}

/// Drops fragments that clearly belong to the `BIS` sibling of the
/// requested article.
///
/// A request for `29-A` must not surface `29-A Bis` fragments; the filter
/// only applies when the caller did not request `BIS`.
#[must_use]
pub fn filter_unrequested_bis(
    evidence: Vec<Evidence>,
    number: u32,
    letter: Option<char>,
) -> Vec<Evidence> {
    let pattern = letter.map_or_else(
        || format!(r"\b{number}\s+bis\b"),
        |l| format!(r"\b{number}\s*[-\x{{2013}}\x{{2014}}]?\s*{l}\s+bis\b"),
    );

    let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return evidence;
    };

    evidence.into_iter().filter(|e| !re.is_match(&e.text)).collect()
}
