//! Article header recognition and canonical tokenization.
//!
//! A single parser recognizes statutory article headers and emits one
//! canonical token per article, e.g. `27`, `69-B`, `69-B-BIS`, `1-A-TER`,
//! `TRANS-PRIMERO`. All downstream code (chunker, structural lookup) works
//! with that token; global uniqueness comes from `(document_id, norm_id)`
//! at the storage layer.
//!
//! Canonical form: hyphen-joined, no spaces, uppercase, accents stripped.
//! Ordinal markers (`1o`, `1º`) are discarded.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Header recognizer, applied to accent-folded lines.
///
/// Accepts `Articulo` / `Art` / `Art.` (case-insensitive), a number with an
/// optional ordinal marker, an optional single-letter suffix joined by
/// hyphen/en-dash/em-dash, an optional Latin ordinal word, or a transitory
/// ordinal word. Trailing `. - : – —` punctuation is discarded.
#[allow(clippy::unwrap_used)]
static ARTICLE_HDR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^\s*
          art(?:iculo)?\.?\s+
          (?:
            (?P<num>\d{1,4})
            (?P<ord>o)?
            (?:\s*[-\x{2013}\x{2014}]\s*(?P<lit>[A-Za-z]))?
            (?:\s+(?P<suf>bis|ter|quater|quinquies|sexies|septies|octies|nonies|decies))?
          |
            (?P<trans>unico|primero|segundo|tercero|cuarto|quinto|sexto|septimo|octavo|noveno|decimo)
          )
          \s*
          (?:[.:\-\x{2013}\x{2014}])?",
    )
    .unwrap()
});

/// Removes diacritics via NFKD decomposition.
///
/// Also folds `º` to `o`, which lets the recognizer treat `1º` and `1o`
/// identically.
#[must_use]
pub fn strip_accents(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Returns the canonical article token if the line is an article header.
///
/// # Examples
///
/// ```
/// use fisco_rs::chunking::parse_article_header;
///
/// assert_eq!(parse_article_header("Artículo 27. Las personas..."), Some("27".to_string()));
/// assert_eq!(parse_article_header("Artículo 69-B Bis."), Some("69-B-BIS".to_string()));
/// assert_eq!(parse_article_header("ARTÍCULO PRIMERO."), Some("TRANS-PRIMERO".to_string()));
/// assert_eq!(parse_article_header("Las personas morales"), None);
/// ```
#[must_use]
pub fn parse_article_header(line: &str) -> Option<String> {
    let folded = strip_accents(line);
    let caps = ARTICLE_HDR_RE.captures(&folded)?;

    if let Some(trans) = caps.name("trans") {
        return Some(format!("TRANS-{}", trans.as_str().to_uppercase()));
    }

    let num = caps.name("num")?.as_str();
    let mut token = num.to_string();
    if let Some(lit) = caps.name("lit") {
        token.push('-');
        token.push_str(&lit.as_str().to_uppercase());
    }
    if let Some(suf) = caps.name("suf") {
        token.push('-');
        token.push_str(&suf.as_str().to_uppercase());
    }
    Some(token)
}

/// Composes the canonical token from its parts.
///
/// Used by structural lookup to build the exact-equality key from a parsed
/// question reference.
#[must_use]
pub fn compose_article_token(
    number: u32,
    letter: Option<char>,
    suffix_word: Option<&str>,
) -> String {
    let mut token = number.to_string();
    if let Some(l) = letter {
        token.push('-');
        token.extend(l.to_uppercase());
    }
    if let Some(suf) = suffix_word {
        token.push('-');
        token.push_str(&suf.to_uppercase());
    }
    token
}
