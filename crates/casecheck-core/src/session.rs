//! Per-session context: the current document and its search index.
//!
//! A loaded document, its chunks and its index form one immutable unit
//! (`IndexedDocument`). Loading a new document builds a fresh unit and swaps
//! the whole thing in under a write lock, so a reader never observes a new
//! corpus paired with an old index. Readers take an `Arc` snapshot and work
//! on it without holding the lock.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::chunker::{chunk_text, Chunk, ChunkError};
use crate::config::PipelineConfig;
use crate::document::Document;
use crate::evidence::EvidenceItem;
use crate::index::{IndexError, SearchIndex};
use crate::retrieval::{retrieve, RetrievalError};
use crate::types::CaseCheckResult;

/// Errors from session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No process description loaded; upload a document first")]
    NoDocument,

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// A document with its chunk corpus and search index.
#[derive(Debug)]
pub struct IndexedDocument {
    document: Document,
    chunks: Vec<Chunk>,
    index: SearchIndex,
    generation: u64,
}

impl IndexedDocument {
    /// Chunk and index a document.
    pub fn build(document: Document, config: &PipelineConfig) -> Result<Self, SessionError> {
        let chunks = chunk_text(&document.text, &config.chunking)?;
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let index = SearchIndex::build(&texts, &config.index)?;

        Ok(Self {
            document,
            chunks,
            index,
            generation: 0,
        })
    }

    /// Top `top_k` evidence items for `query`.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<EvidenceItem>, RetrievalError> {
        retrieve(&self.index, &self.chunks, query, top_k)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Load counter value at the time this document was installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Session state for one reviewer.
#[derive(Debug)]
pub struct CaseSession {
    config: PipelineConfig,
    current: RwLock<Option<Arc<IndexedDocument>>>,
    last_result: RwLock<Option<Arc<CaseCheckResult>>>,
    generation: AtomicU64,
}

impl CaseSession {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            last_result: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Index `document` and make it the session's current document.
    ///
    /// The previous document, index and last result are discarded together.
    /// On error the session keeps its previous state.
    pub fn load_document(&self, document: Document) -> Result<Arc<IndexedDocument>, SessionError> {
        let mut indexed = IndexedDocument::build(document, &self.config)?;
        indexed.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let indexed = Arc::new(indexed);

        {
            let mut current = self.current.write();
            *current = Some(Arc::clone(&indexed));
            *self.last_result.write() = None;
        }

        tracing::info!(
            source = %indexed.document.source,
            chars = indexed.document.char_count(),
            chunks = indexed.chunks.len(),
            vocabulary = indexed.index.vocabulary_len(),
            generation = indexed.generation,
            "Loaded process description"
        );

        Ok(indexed)
    }

    /// Snapshot of the current document.
    pub fn current(&self) -> Result<Arc<IndexedDocument>, SessionError> {
        self.current.read().clone().ok_or(SessionError::NoDocument)
    }

    /// Whether a document is loaded.
    pub fn has_document(&self) -> bool {
        self.current.read().is_some()
    }

    /// Retrieve evidence from the current document using the configured `top_k`.
    pub fn retrieve(&self, query: &str) -> Result<Vec<EvidenceItem>, SessionError> {
        let snapshot = self.current()?;
        Ok(snapshot.retrieve(query, self.config.retrieval.top_k)?)
    }

    /// Remember the result of the latest check.
    ///
    /// Results for a document that has since been replaced are dropped.
    pub fn record_result(&self, result: CaseCheckResult) {
        let current = self.current.read();
        let is_current = current
            .as_ref()
            .is_some_and(|doc| doc.generation == result.generation);
        if is_current {
            *self.last_result.write() = Some(Arc::new(result));
        } else {
            tracing::debug!(generation = result.generation, "Dropping result for a replaced document");
        }
    }

    /// The latest recorded result, if any.
    pub fn last_result(&self) -> Option<Arc<CaseCheckResult>> {
        self.last_result.read().clone()
    }
}

impl Default for CaseSession {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
