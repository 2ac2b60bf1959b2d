//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping segments.
///
/// Sizes are in bytes, with chunk edges moved to the nearest character
/// boundary. Every byte of `text` lands in at least one chunk.
pub fn chunk_text(
    source: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    if text.trim().is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        // A single character wider than the chunk size
        if end == start {
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }

        let trimmed = text[start..end].trim();
        if !trimmed.is_empty() {
            chunks.push(ChunkCandidate {
                source: source.to_string(),
                position,
                text: trimmed.to_string(),
            });
            position += 1;
        }

        if end == text.len() {
            break;
        }

        let step = if chunk_size > overlap {
            chunk_size - overlap
        } else {
            chunk_size
        };

        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        source,
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text("report.txt", &text, 200, 50);

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[0].source, "report.txt");
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("report.txt", &text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_short_tail_kept_without_overlap() {
        let text = format!("{}TAIL", "a".repeat(300));
        let chunks = chunk_text("report.txt", &text, 100, 0);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3].text, "TAIL");
        assert_eq!(chunks[3].position, 3);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("report.txt", "", 100, 10).is_empty());
        assert!(chunk_text("report.txt", "   \n", 100, 10).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("memo.txt", "Liquidity is ample.", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Liquidity is ample.");
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text("report.txt", &text, 50, 10);

        assert!(chunks.len() >= 2);
        let first_tail: String = chunks[0].text.chars().skip(40).collect();
        assert!(chunks[1].text.starts_with(&first_tail));
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text = "é".repeat(500);
        let chunks = chunk_text("accents.txt", &text, 101, 11);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }
}
