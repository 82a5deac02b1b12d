//! Overlapping-window text chunker.
//!
//! Splits page text into fixed-size character windows where consecutive
//! windows share exactly `chunk_overlap` characters (the last window may be
//! shorter). Chunk indices run document-wide, continuing across pages, so a
//! chunk's position is unambiguous even for multi-page sources.

use crate::models::{Chunk, ChunkMeta};

/// Split one page's text into overlapping chunks.
///
/// `start_index` is the document-wide index of the first chunk produced.
/// Empty or whitespace-only pages produce no chunks.
///
/// Requires `overlap < size` (enforced at config load).
pub fn chunk_page(
    text: &str,
    base: &ChunkMeta,
    size: usize,
    overlap: usize,
    start_index: usize,
) -> Vec<Chunk> {
    debug_assert!(overlap < size);

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if text.trim().is_empty() {
        return Vec::new();
    }

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut index = start_index;

    loop {
        let end = (start + size).min(total);
        let chunk_text: String = chars[start..end].iter().collect();
        chunks.push(Chunk {
            text: chunk_text,
            meta: ChunkMeta {
                chunk_index: index,
                ..base.clone()
            },
        });
        index += 1;
        if end == total {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, page: usize) -> ChunkMeta {
        ChunkMeta {
            source: source.to_string(),
            page,
            chunk_index: 0,
            title: None,
            author: None,
            created: None,
        }
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk_page("Hello, world!", &meta("a.pdf", 0), 500, 100, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].meta.chunk_index, 0);
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(chunk_page("", &meta("a.pdf", 0), 500, 100, 0).is_empty());
        assert!(chunk_page("   \n ", &meta("a.pdf", 0), 500, 100, 0).is_empty());
    }

    #[test]
    fn consecutive_chunks_overlap_exactly() {
        let text: String = ('a'..='z').cycle().take(120).collect();
        for (size, overlap) in [(30, 5), (50, 10), (40, 39), (25, 0)] {
            let chunks = chunk_page(&text, &meta("a.pdf", 0), size, overlap, 0);
            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].text.chars().collect();
                let next: Vec<char> = pair[1].text.chars().collect();
                let tail: String = prev[prev.len() - overlap..].iter().collect();
                let head: String = next[..overlap].iter().collect();
                assert_eq!(tail, head, "size={} overlap={}", size, overlap);
            }
        }
    }

    #[test]
    fn chunks_cover_whole_document() {
        let text: String = ('a'..='z').cycle().take(137).collect();
        let size = 30;
        let overlap = 5;
        let chunks = chunk_page(&text, &meta("a.pdf", 0), size, overlap, 0);

        // Reassemble by dropping each chunk's overlapping prefix.
        let mut rebuilt = chunks[0].text.clone();
        for c in &chunks[1..] {
            rebuilt.extend(c.text.chars().skip(overlap));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn all_chunks_except_last_are_full_size() {
        let text: String = "x".repeat(100);
        let chunks = chunk_page(&text, &meta("a.pdf", 0), 30, 5, 0);
        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.text.chars().count(), 30);
        }
        assert!(chunks.last().unwrap().text.chars().count() <= 30);
    }

    #[test]
    fn indices_continue_from_start_index() {
        let text: String = "y".repeat(80);
        let chunks = chunk_page(&text, &meta("a.pdf", 1), 30, 5, 4);
        let indices: Vec<usize> = chunks.iter().map(|c| c.meta.chunk_index).collect();
        assert_eq!(indices, (4..4 + chunks.len()).collect::<Vec<_>>());
        assert!(chunks.iter().all(|c| c.meta.page == 1));
    }

    #[test]
    fn manual_sentence_produces_at_least_two_chunks() {
        let text = "Turn off the device before servicing. Always wear gloves.";
        let chunks = chunk_page(text, &meta("manual.pdf", 0), 30, 5, 0);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert_eq!(c.meta.source, "manual.pdf");
            assert_eq!(c.meta.page, 0);
        }
        assert!(chunks.iter().any(|c| c.text.contains("gloves")));
    }
}
