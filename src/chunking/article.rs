//! Article-first chunking for statutes and regulations.

use crate::chunking::blocks::{segment_blocks, split_blocks};
use crate::chunking::{ChunkingConfig, DraftChunk, header::parse_article_header};
use crate::core::norm_kind;
use crate::error::Result;

/// Segments a document's pages into article-bounded sub-chunks.
///
/// Pages are `(page_number, page_text)` pairs, 1-based, in reading order.
/// Each recognized article header opens a new block; material before the
/// first header becomes a `PREAMBULO` block. Blocks are windowed with the
/// configured size and overlap, and no sub-chunk crosses an article
/// boundary.
///
/// # Errors
///
/// Returns an error if the chunking configuration is invalid.
pub fn chunk_article_first(
    pages: &[(u32, String)],
    cfg: &ChunkingConfig,
) -> Result<Vec<DraftChunk>> {
    cfg.validate()?;
    let blocks = segment_blocks(pages, parse_article_header);
    Ok(split_blocks(blocks, norm_kind::ARTICLE, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::PREAMBULO_ID;
    use proptest::prelude::*;

    fn one_page(text: &str) -> Vec<(u32, String)> {
        vec![(1, text.to_string())]
    }

    #[test]
    fn test_articles_get_article_kind() {
        let pages = one_page("Preámbulo del código\nArtículo 27. Texto del artículo");
        let chunks = chunk_article_first(&pages, &ChunkingConfig::default()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].norm_kind, "PREAMBULO");
        assert_eq!(chunks[0].norm_id, PREAMBULO_ID);
        assert_eq!(chunks[1].norm_kind, "ARTICLE");
        assert_eq!(chunks[1].norm_id, "27");
    }

    #[test]
    fn test_first_line_reparses_to_norm_id() {
        let pages = one_page(
            "Artículo 69-B. Cuando la autoridad fiscal detecte\n\
             que un contribuyente emitió comprobantes",
        );
        let chunks = chunk_article_first(&pages, &ChunkingConfig::default()).unwrap();
        for chunk in chunks.iter().filter(|c| c.norm_kind == "ARTICLE") {
            let first_line = chunk.text.lines().find(|l| !l.trim().is_empty()).unwrap();
            if chunk.chunk_index == 0 {
                assert_eq!(
                    parse_article_header(first_line).as_deref(),
                    Some(chunk.norm_id.as_str())
                );
            }
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let pages = one_page("Artículo 1. Texto");
        let cfg = ChunkingConfig::new(100, 100);
        assert!(chunk_article_first(&pages, &cfg).is_err());
    }

    #[test]
    fn test_transitory_articles() {
        let pages = one_page(
            "Artículo 200. Última disposición\nTRANSITORIOS\nArtículo Primero. Entrada en vigor",
        );
        let chunks = chunk_article_first(&pages, &ChunkingConfig::default()).unwrap();
        let ids: Vec<&str> = chunks.iter().map(|c| c.norm_id.as_str()).collect();
        assert!(ids.contains(&"200"));
        assert!(ids.contains(&"TRANS-PRIMERO"));
    }

    #[test]
    fn test_reingest_is_deterministic() {
        let pages = one_page("Artículo 1. Uno\nArtículo 2. Dos\nArtículo 2-A. Dos A");
        let cfg = ChunkingConfig::default();
        let first = chunk_article_first(&pages, &cfg).unwrap();
        let second = chunk_article_first(&pages, &cfg).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        /// Window accounting holds for arbitrary article bodies.
        #[test]
        fn prop_window_invariants(body in "[a-z áéí]{1,2000}", window in 50usize..400, overlap in 0usize..40) {
            let pages = vec![(1u32, format!("Artículo 1. {body}"))];
            let cfg = ChunkingConfig::new(window, overlap);
            let chunks = chunk_article_first(&pages, &cfg).unwrap();

            for chunk in &chunks {
                prop_assert!(chunk.page_start <= chunk.page_end);
                prop_assert!(chunk.char_end > chunk.char_start);
                prop_assert!(chunk.char_end - chunk.char_start <= window);
            }
            for pair in chunks.windows(2) {
                if pair[0].norm_id == pair[1].norm_id {
                    prop_assert_eq!(pair[0].char_end - pair[1].char_start, overlap);
                }
            }
        }
    }
}
