//! Shared block segmentation machinery.
//!
//! Pages are folded into norm-bounded blocks (one per recognized header,
//! plus a leading `PREAMBULO`), then each block is windowed into
//! overlapping character-bounded sub-chunks. Character offsets within a
//! block map back to source pages through a sorted offset index.

use crate::chunking::{ChunkingConfig, DraftChunk, PREAMBULO_ID};
use crate::core::norm_kind;

/// A norm-bounded block of text spanning one or more pages.
#[derive(Debug, Clone)]
pub(crate) struct NormBlock {
    /// Canonical norm identifier (or `PREAMBULO`).
    pub norm_id: String,
    /// Block text, lines joined with `\n`, trailing whitespace trimmed.
    pub text: String,
    /// `(char_offset_in_block, page_number)` transitions, sorted by offset.
    pub page_offsets: Vec<(usize, u32)>,
}

/// Segments pages into norm blocks using the given header recognizer.
///
/// The recognizer returns the canonical norm id when a line opens a new
/// block. Material before the first header lands in a `PREAMBULO` block.
pub(crate) fn segment_blocks<F>(pages: &[(u32, String)], parse_header: F) -> Vec<NormBlock>
where
    F: Fn(&str) -> Option<String>,
{
    let mut blocks: Vec<NormBlock> = Vec::new();
    let mut current_id = PREAMBULO_ID.to_string();
    let mut buf: Vec<&str> = Vec::new();
    let mut page_offsets: Vec<(usize, u32)> = Vec::new();
    let mut cur_len = 0usize;

    fn flush(
        blocks: &mut Vec<NormBlock>,
        norm_id: &str,
        buf: &[&str],
        page_offsets: Vec<(usize, u32)>,
    ) {
        let joined = buf.join("\n");
        let text = joined.trim_end();
        if !text.is_empty() {
            let page_offsets = if page_offsets.is_empty() {
                vec![(0, 1)]
            } else {
                page_offsets
            };
            blocks.push(NormBlock {
                norm_id: norm_id.to_string(),
                text: text.to_string(),
                page_offsets,
            });
        }
    }

    for (page_num, page_text) in pages {
        let mut page_started = false;
        for line in page_text.lines() {
            if let Some(token) = parse_header(line) {
                flush(&mut blocks, &current_id, &buf, std::mem::take(&mut page_offsets));
                current_id = token;
                buf = vec![line];
                page_offsets = vec![(0, *page_num)];
                cur_len = line.chars().count() + 1;
                page_started = true;
                continue;
            }

            if !page_started {
                let offset = if buf.is_empty() { 0 } else { cur_len };
                page_offsets.push((offset, *page_num));
                page_started = true;
            }

            buf.push(line);
            cur_len += line.chars().count() + 1;
        }
    }
    flush(&mut blocks, &current_id, &buf, page_offsets);

    blocks
}

/// Windows each block into overlapping sub-chunks.
///
/// `body_kind` is the `norm_kind` assigned to non-preamble blocks. Window
/// bounds are character offsets within the block; pages are resolved by
/// binary search over the block's offset index.
pub(crate) fn split_blocks(
    blocks: Vec<NormBlock>,
    body_kind: &str,
    cfg: &ChunkingConfig,
) -> Vec<DraftChunk> {
    let mut chunks = Vec::new();

    for block in blocks {
        // Char-index to byte-offset table, with a sentinel for the end
        let mut byte_at: Vec<usize> = block.text.char_indices().map(|(b, _)| b).collect();
        byte_at.push(block.text.len());
        let total_chars = byte_at.len() - 1;
        if total_chars == 0 {
            continue;
        }

        let offsets: Vec<usize> = block.page_offsets.iter().map(|(o, _)| *o).collect();
        let page_nums: Vec<u32> = block.page_offsets.iter().map(|(_, p)| *p).collect();
        let page_for = |char_offset: usize| -> u32 {
            let i = offsets.partition_point(|o| *o <= char_offset);
            if i == 0 { page_nums[0] } else { page_nums[i - 1] }
        };

        let kind = if block.norm_id == PREAMBULO_ID {
            norm_kind::PREAMBULO
        } else {
            body_kind
        };

        let mut start = 0usize;
        let mut per_block_idx = 0usize;

        while start < total_chars {
            let end = (start + cfg.chunk_chars).min(total_chars);
            let text = block.text[byte_at[start]..byte_at[end]].trim();

            if !text.is_empty() {
                let page_start = page_for(start);
                let page_end = page_for(end.saturating_sub(1));
                chunks.push(DraftChunk {
                    text: text.to_string(),
                    norm_kind: kind.to_string(),
                    norm_id: block.norm_id.clone(),
                    page_start,
                    page_end,
                    chunk_index: per_block_idx,
                    char_start: start,
                    char_end: end,
                });
                per_block_idx += 1;
            }

            if end >= total_chars {
                break;
            }
            start = end.saturating_sub(cfg.overlap_chars);
        }
    }

    chunks
}
