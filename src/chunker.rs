//! # Chunker Module
//!
//! Splits raw document text into overlapping fixed-size windows. Whitespace
//! runs are collapsed to single spaces first, so chunk boundaries are
//! measured in content characters rather than formatting artifacts. The
//! split is a pure function of `(text, max_chars, overlap)`.

use crate::errors::{RagLiteError, RagLiteResult};

/// Split `text` into overlapping chunks of at most `max_chars` characters.
///
/// The window advances by `max_chars - overlap` characters per step; the
/// final window always ends exactly at the end of the normalized text, so
/// the last chunk is never truncated mid-window. Empty or whitespace-only
/// input produces no chunks.
///
/// Fails with [`RagLiteError::ChunkingPrecondition`] when
/// `overlap >= max_chars`, which would keep the window from advancing.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> RagLiteResult<Vec<String>> {
    if overlap >= max_chars {
        return Err(RagLiteError::ChunkingPrecondition { max_chars, overlap });
    }

    // Collapse whitespace runs to single spaces and trim the ends.
    let normalized: Vec<char> = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect();

    if normalized.is_empty() {
        return Ok(Vec::new());
    }
    if normalized.len() <= max_chars {
        return Ok(vec![normalized.into_iter().collect()]);
    }

    let len = normalized.len();
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = usize::min(start + max_chars, len);
        let window: String = normalized[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == len {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}
