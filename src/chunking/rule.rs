//! Rule-first chunking for RMF resolutions and annexes.
//!
//! RMF documents are organized as dotted numbered rules (`2.1.1`,
//! `2.7.1.46`). The segmentation mirrors the article-first chunker, keyed
//! on rule headers instead of article headers.

use crate::chunking::blocks::{segment_blocks, split_blocks};
use crate::chunking::{ChunkingConfig, DraftChunk};
use crate::core::norm_kind;
use crate::error::Result;
use regex::Regex;
use std::sync::LazyLock;

/// A rule header: 2 to 6 dotted numeric segments followed by a period,
/// at the start of a line.
#[allow(clippy::unwrap_used)]
static RULE_HDR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+){1,5})\.(?:\s|$)").unwrap());

/// Returns the dotted rule id if the line opens an RMF rule body.
///
/// # Examples
///
/// ```
/// use fisco_rs::chunking::parse_rule_header;
///
/// assert_eq!(parse_rule_header("2.1.1. Para los efectos del artículo"), Some("2.1.1".to_string()));
/// assert_eq!(parse_rule_header("Capítulo 2.1. De los medios electrónicos"), None);
/// ```
#[must_use]
pub fn parse_rule_header(line: &str) -> Option<String> {
    RULE_HDR_RE
        .captures(line)
        .map(|caps| caps[1].to_string())
}

/// Segments RMF pages into rule-bounded sub-chunks.
///
/// Material before the first rule header (the resolution's preamble and
/// index) becomes a `PREAMBULO` block; each rule body becomes a `RULE`
/// block identified by its dotted id.
///
/// # Errors
///
/// Returns an error if the chunking configuration is invalid.
pub fn chunk_rule_first(pages: &[(u32, String)], cfg: &ChunkingConfig) -> Result<Vec<DraftChunk>> {
    cfg.validate()?;
    let blocks = segment_blocks(pages, parse_rule_header);
    Ok(split_blocks(blocks, norm_kind::RULE, cfg))
}
