//! Recursive text chunker with overlap.
//!
//! Splits a document's text into [`Chunk`]s no longer than `max_chars`,
//! preferring paragraph boundaries, then sentence, word, and finally raw
//! character boundaries, so each chunk stays a coherent semantic unit.
//! Adjacent chunks from the same document share `overlap_chars` of text so
//! local context survives a chunk boundary.
//!
//! Each chunk receives an opaque UUID plus a SHA-256 hash of its text.
//! Chunking is deterministic: identical text and configuration always
//! produce the same chunk sequence.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, Document};

/// Coarse-to-fine separators tried in order before falling back to a hard
/// character split.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Split one document's text into chunks with contiguous indices from 0.
///
/// A document shorter than `max_chars` yields exactly one chunk with no
/// overlap applied.
pub fn chunk_document(doc: &Document, max_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    let trimmed = doc.text.trim();
    if trimmed.len() <= max_chars {
        return vec![make_chunk(doc, 0, trimmed)];
    }

    let segments = split_segments(trimmed, max_chars, &SEPARATORS);
    let merged = merge_with_overlap(segments, max_chars, overlap_chars);

    let mut chunks = Vec::with_capacity(merged.len());
    let mut chunk_index: i64 = 0;
    for piece in merged {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        chunks.push(make_chunk(doc, chunk_index, piece));
        chunk_index += 1;
    }

    // Guarantee at least one chunk
    if chunks.is_empty() {
        chunks.push(make_chunk(doc, 0, trimmed));
    }

    chunks
}

/// Recursively split `text` into segments no longer than `max_chars`,
/// trying coarser separators first. Separators stay attached to the
/// preceding segment so concatenation reconstructs the text.
fn split_segments(text: &str, max_chars: usize, separators: &[&str]) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }
    let Some((separator, rest)) = separators.split_first() else {
        return split_chars(text, max_chars);
    };

    let mut out = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        if piece.len() > max_chars {
            out.extend(split_segments(piece, max_chars, rest));
        } else {
            out.push(piece.to_string());
        }
    }
    out
}

/// Split at a separator while keeping the separator attached to the
/// preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Last-resort hard split at character boundaries.
fn split_chars(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let end = floor_char_boundary(text, (start + max_chars).min(text.len()));
        if end == start {
            break;
        }
        out.push(text[start..end].to_string());
        start = end;
    }

    out
}

/// Greedily pack segments into chunks of at most `max_chars`, carrying the
/// tail of each flushed chunk into the next one as overlap.
fn merge_with_overlap(segments: Vec<String>, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in segments {
        if current.is_empty() || current.len() + segment.len() <= max_chars {
            current.push_str(&segment);
            continue;
        }

        let tail = overlap_tail(&current, overlap_chars);
        chunks.push(std::mem::take(&mut current));
        // Skip the overlap when it would push the next chunk over the limit.
        if !tail.is_empty() && tail.len() + segment.len() <= max_chars {
            current = tail;
        }
        current.push_str(&segment);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// The last `overlap_chars` characters of a chunk, cut at a char boundary.
fn overlap_tail(chunk: &str, overlap_chars: usize) -> String {
    if overlap_chars == 0 || chunk.len() <= overlap_chars {
        return String::new();
    }
    let start = ceil_char_boundary(chunk, chunk.len() - overlap_chars);
    chunk[start..].to_string()
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn make_chunk(doc: &Document, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source: doc.source.clone(),
        page: doc.page,
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
