//! Overlapping fixed-window text chunker.
//!
//! Splits a document's text into windows of `chunk_size` characters taken
//! at a stride of `chunk_size - overlap`, so consecutive chunks share
//! `overlap` characters of context. Windows that are empty after trimming
//! are dropped and never stored.
//!
//! Each chunk receives a deterministic id of the form
//! `{document_name}_{start}` where `start` is the character offset of the
//! window. Identical inputs always produce identical chunk sequences.

use crate::models::{Chunk, ChunkMetadata};

/// Split `text` into overlapping chunks for `document_name`.
///
/// Returns an empty vector for empty text. Offsets are measured in
/// characters, not bytes, so multi-byte input never splits inside a
/// code point.
pub fn chunk_text(
    text: &str,
    document_name: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    // Config validation rejects overlap >= chunk_size; the clamp keeps the
    // loop advancing even for a caller that bypassed it.
    let stride = chunk_size.saturating_sub(overlap).max(1);

    // Byte offset of every character, so windows can be cut on char
    // boundaries without re-scanning the string per chunk.
    let char_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let char_len = char_starts.len();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < char_len {
        let end = (start + chunk_size).min(char_len);
        let byte_start = char_starts[start];
        let byte_end = if end == char_len {
            text.len()
        } else {
            char_starts[end]
        };
        let window = &text[byte_start..byte_end];

        if !window.trim().is_empty() {
            chunks.push(Chunk {
                id: format!("{}_{}", document_name, start),
                text: window.to_string(),
                metadata: ChunkMetadata {
                    source: document_name.to_string(),
                },
            });
        }

        start += stride;
    }

    chunks
}
