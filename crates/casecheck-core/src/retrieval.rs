//! Retriever: ranks chunks against a query.
//!
//! Ranking is cosine similarity, descending, with ties broken by the lower
//! chunk order so that equal scores (duplicate chunks, empty queries) still
//! produce a stable result.

use std::cmp::Ordering;
use thiserror::Error;

use crate::chunker::Chunk;
use crate::evidence::EvidenceItem;
use crate::index::SearchIndex;

/// Errors from retrieval. Only reachable through misuse or misconfiguration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("Index has {index_rows} rows but corpus has {corpus_len} chunks")]
    CorpusMismatch { index_rows: usize, corpus_len: usize },
}

/// Return the `top_k` chunks most similar to `query`.
///
/// `chunks` must be the corpus the index was built from, in the same order.
pub fn retrieve(
    index: &SearchIndex,
    chunks: &[Chunk],
    query: &str,
    top_k: usize,
) -> Result<Vec<EvidenceItem>, RetrievalError> {
    if top_k == 0 {
        return Err(RetrievalError::InvalidTopK);
    }
    if index.len() != chunks.len() {
        return Err(RetrievalError::CorpusMismatch {
            index_rows: index.len(),
            corpus_len: chunks.len(),
        });
    }

    let query_vector = index.project(query);

    let mut scored: Vec<(f64, &Chunk)> = index
        .rows()
        .iter()
        .zip(chunks)
        .map(|(row, chunk)| (query_vector.cosine(row), chunk))
        .collect();

    scored.sort_by(|(a_score, a), (b_score, b)| rank_order(*a_score, a, *b_score, b));
    scored.truncate(top_k);

    tracing::debug!(
        query_terms = query_vector.nnz(),
        returned = scored.len(),
        "Retrieved evidence"
    );

    Ok(scored
        .into_iter()
        .map(|(score, chunk)| EvidenceItem::new(chunk.id, chunk.text.clone(), score))
        .collect())
}

fn rank_order(a_score: f64, a: &Chunk, b_score: f64, b: &Chunk) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| a.order.cmp(&b.order))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, IndexConfig};
    use crate::chunker::chunk_text;

    fn corpus(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                id: i,
                text: t.to_string(),
                order: i,
            })
            .collect()
    }

    fn index_for(chunks: &[Chunk]) -> SearchIndex {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        SearchIndex::build(&texts, &IndexConfig::default()).unwrap()
    }

    #[test]
    fn test_best_match_first() {
        let chunks = corpus(&[
            "The IBAN must belong to the insured person.",
            "Refunds above the invoice amount are rejected.",
            "Queue selection depends on the service offering.",
        ]);
        let index = index_for(&chunks);

        let evidence = retrieve(&index, &chunks, "invoice amount refund", 3).unwrap();
        assert_eq!(evidence[0].chunk_id, "chunk-00001");
        assert!(evidence[0].score > evidence[1].score);
    }

    #[test]
    fn test_ties_keep_document_order() {
        let chunks = corpus(&["same rule text", "same rule text", "same rule text"]);
        let index = index_for(&chunks);

        let evidence = retrieve(&index, &chunks, "rule", 3).unwrap();
        let ids: Vec<_> = evidence.iter().map(|e| e.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["chunk-00000", "chunk-00001", "chunk-00002"]);
    }

    #[test]
    fn test_empty_query_returns_document_order() {
        let chunks = corpus(&["alpha rule", "beta rule", "gamma rule"]);
        let index = index_for(&chunks);

        let evidence = retrieve(&index, &chunks, "", 2).unwrap();
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].chunk_id, "chunk-00000");
        assert_eq!(evidence[1].chunk_id, "chunk-00001");
        assert!(evidence.iter().all(|e| e.score == 0.0));
    }

    #[test]
    fn test_top_k_larger_than_corpus() {
        let chunks = corpus(&["one rule", "two rules"]);
        let index = index_for(&chunks);
        assert_eq!(retrieve(&index, &chunks, "rule", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let chunks = corpus(&["one rule"]);
        let index = index_for(&chunks);
        assert_eq!(
            retrieve(&index, &chunks, "rule", 0),
            Err(RetrievalError::InvalidTopK)
        );
    }

    #[test]
    fn test_mismatched_corpus_rejected() {
        let chunks = corpus(&["one rule", "two rules"]);
        let index = index_for(&chunks);
        assert!(matches!(
            retrieve(&index, &chunks[..1], "rule", 1),
            Err(RetrievalError::CorpusMismatch { index_rows: 2, corpus_len: 1 })
        ));
    }

    #[test]
    fn test_x_chunk_outranks_y_chunk() {
        let text = format!("A. B. {}. {}.", "X".repeat(90), "Y".repeat(90));
        let chunks = chunk_text(&text, &ChunkingConfig::default()).unwrap();
        let index = index_for(&chunks);

        let evidence = retrieve(&index, &chunks, &"X".repeat(90), 5).unwrap();
        assert_eq!(evidence.len(), 2);
        assert!(evidence[0].text.starts_with('X'));
        assert!(evidence[0].score > evidence[1].score);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::config::IndexConfig;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ranking_is_sorted_and_sized(
            texts in prop::collection::vec("[a-d]{2,3}( [a-d]{2,3}){0,6}", 1..20),
            query in "[a-d]{2,3}( [a-d]{2,3}){0,3}",
            top_k in 1usize..25,
        ) {
            let chunks: Vec<Chunk> = texts
                .iter()
                .enumerate()
                .map(|(i, t)| Chunk { id: i, text: t.clone(), order: i })
                .collect();
            let index = SearchIndex::build(&texts, &IndexConfig::default()).unwrap();

            let evidence = retrieve(&index, &chunks, &query, top_k).unwrap();
            prop_assert_eq!(evidence.len(), top_k.min(chunks.len()));

            for pair in evidence.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].position() < pair[1].position());
                }
            }

            let again = SearchIndex::build(&texts, &IndexConfig::default()).unwrap();
            prop_assert_eq!(retrieve(&again, &chunks, &query, top_k).unwrap(), evidence);
        }
    }
}
