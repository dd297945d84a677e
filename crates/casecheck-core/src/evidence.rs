//! Evidence items handed to the decision collaborator.
//!
//! Every item points back to a chunk through a stable, zero-padded
//! identifier so that a decision can cite it unambiguously.

use serde::{Deserialize, Serialize};

/// Width of the numeric part of a chunk identifier.
const CHUNK_ID_WIDTH: usize = 5;

/// Format the stable identifier for the chunk at corpus position `position`.
///
/// Identifiers sort lexically in corpus order (`chunk-00000`, `chunk-00001`, ...).
pub fn chunk_id(position: usize) -> String {
    format!("chunk-{:0width$}", position, width = CHUNK_ID_WIDTH)
}

/// A ranked chunk with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceItem {
    /// Stable identifier of the source chunk
    pub chunk_id: String,

    /// Chunk text
    pub text: String,

    /// Cosine similarity to the query
    pub score: f64,
}

impl EvidenceItem {
    /// Create evidence for the chunk at `position`.
    pub fn new(position: usize, text: impl Into<String>, score: f64) -> Self {
        Self {
            chunk_id: chunk_id(position),
            text: text.into(),
            score,
        }
    }

    /// Parse the corpus position back out of the identifier.
    pub fn position(&self) -> Option<usize> {
        self.chunk_id.strip_prefix("chunk-")?.parse().ok()
    }
}
