//! Chunker: splits document text into citable evidence units.
//!
//! Text is whitespace-normalized and cut after sentence-terminal punctuation.
//! Short segments are dropped as noise (headers, page numbers, list bullets).
//! When nothing survives, a single chunk made from the start of the raw text
//! is returned so that retrieval never runs against an empty corpus.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ChunkingConfig;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    /// Sentence-terminal punctuation followed by whitespace.
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]\s+").unwrap();
}

/// Errors from chunking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Document is empty; nothing to chunk")]
    EmptyDocument,
}

/// An atomic, independently citable unit of document text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Ordinal index within the corpus
    pub id: usize,

    /// Trimmed segment text
    pub text: String,

    /// Position of the source segment in the document
    pub order: usize,
}

/// Split `text` into chunks.
///
/// Returns `ChunkError::EmptyDocument` only for a zero-length input; any
/// other text yields at least one chunk.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ChunkError> {
    if text.is_empty() {
        return Err(ChunkError::EmptyDocument);
    }

    let normalized = WHITESPACE_RUN.replace_all(text, " ");

    let chunks: Vec<Chunk> = split_sentences(&normalized)
        .into_iter()
        .enumerate()
        .filter(|(_, segment)| segment.chars().count() > config.min_chars)
        .enumerate()
        .map(|(id, (order, segment))| Chunk {
            id,
            text: segment.to_string(),
            order,
        })
        .collect();

    if chunks.is_empty() {
        tracing::debug!(
            min_chars = config.min_chars,
            fallback_chars = config.fallback_chars,
            "No segment passed the length filter, using fallback chunk"
        );
        return Ok(vec![Chunk {
            id: 0,
            text: text.chars().take(config.fallback_chars).collect(),
            order: 0,
        }]);
    }

    tracing::debug!(chunks = chunks.len(), "Chunked document");
    Ok(chunks)
}

/// Cut whitespace-normalized text into trimmed sentence-like segments.
///
/// The terminal punctuation stays with its segment. Empty segments are kept
/// so that segment positions reflect the document.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BOUNDARY.find_iter(text) {
        // Punctuation is a single ASCII byte.
        segments.push(text[start..m.start() + 1].trim());
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        segments.push(rest);
    }

    segments
}
