//! Search index: TF-IDF vector space over the chunk corpus.
//!
//! Terms are lowercased word unigrams and bigrams (words of two or more
//! word characters). Weights are raw term frequency times smoothed inverse
//! document frequency, `ln((1 + n) / (1 + df)) + 1`, and every row is
//! L2-normalized so that cosine similarity reduces to a dot product.
//!
//! The index is a pure function of the corpus: the vocabulary is capped by
//! corpus frequency (ties broken alphabetically) and columns are assigned in
//! alphabetical term order, so identical corpora produce identical indexes.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::config::IndexConfig;

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\b\w\w+\b").unwrap();
}

/// Errors from index construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Cannot build a search index over an empty corpus")]
    EmptyCorpus,

    #[error("Invalid index configuration: {0}")]
    InvalidConfig(String),
}

/// A sparse, L2-normalized term vector. Entries are sorted by column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    fn from_weights(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(col, _)| *col);
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        Self { entries }
    }

    /// Whether the vector has no non-zero weights.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-zero weights.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// (column, weight) pairs in column order.
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Cosine similarity. Zero when either vector is empty.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }

        let (mut i, mut j, mut dot) = (0, 0, 0.0);
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_w) = self.entries[i];
            let (b_col, b_w) = other.entries[j];
            match a_col.cmp(&b_col) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dot += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }

        dot / denom
    }
}

/// Lowercased word tokens of two or more characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Unigram and bigram term counts for one text.
fn term_counts(text: &str) -> HashMap<String, u32> {
    let tokens = tokenize(text);
    let mut counts = HashMap::new();

    for token in &tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_insert(0) += 1;
    }

    counts
}

/// Immutable TF-IDF index over a chunk corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIndex {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    rows: Vec<SparseVector>,
}

impl SearchIndex {
    /// Build an index with one row per corpus entry.
    pub fn build<S: AsRef<str>>(corpus: &[S], config: &IndexConfig) -> Result<Self, IndexError> {
        if corpus.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }
        if config.max_features == 0 {
            return Err(IndexError::InvalidConfig(
                "max_features must be at least 1".to_string(),
            ));
        }

        let doc_counts: Vec<HashMap<String, u32>> =
            corpus.iter().map(|doc| term_counts(doc.as_ref())).collect();

        // term -> (corpus frequency, document frequency)
        let mut stats: HashMap<&str, (u64, u32)> = HashMap::new();
        for counts in &doc_counts {
            for (term, count) in counts {
                let entry = stats.entry(term.as_str()).or_insert((0, 0));
                entry.0 += u64::from(*count);
                entry.1 += 1;
            }
        }

        let mut terms: Vec<(&str, u64, u32)> = stats
            .into_iter()
            .map(|(term, (total, df))| (term, total, df))
            .collect();
        if terms.len() > config.max_features {
            terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            terms.truncate(config.max_features);
        }
        terms.sort_by(|a, b| a.0.cmp(b.0));

        let n = corpus.len() as f64;
        let vocabulary: BTreeMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(col, (term, _, _))| ((*term).to_string(), col))
            .collect();
        let idf: Vec<f64> = terms
            .iter()
            .map(|(_, _, df)| ((1.0 + n) / (1.0 + f64::from(*df))).ln() + 1.0)
            .collect();

        let index_without_rows = Self {
            vocabulary,
            idf,
            rows: Vec::new(),
        };
        let rows = doc_counts
            .iter()
            .map(|counts| index_without_rows.weigh(counts))
            .collect();

        let index = Self {
            rows,
            ..index_without_rows
        };

        tracing::debug!(
            rows = index.rows.len(),
            vocabulary = index.vocabulary.len(),
            "Built search index"
        );

        Ok(index)
    }

    fn weigh(&self, counts: &HashMap<String, u32>) -> SparseVector {
        let weights = counts
            .iter()
            .filter_map(|(term, tf)| {
                self.vocabulary
                    .get(term)
                    .map(|&col| (col, f64::from(*tf) * self.idf[col]))
            })
            .collect();
        SparseVector::from_weights(weights)
    }

    /// Project a new string into the index's vector space.
    ///
    /// Terms outside the vocabulary are ignored; a query with no known terms
    /// projects to the empty vector.
    pub fn project(&self, text: &str) -> SparseVector {
        self.weigh(&term_counts(text))
    }

    /// Row vectors, one per corpus entry, in corpus order.
    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the index has no rows. Never true for a built index.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of vocabulary terms.
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Whether `term` is part of the vocabulary.
    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(corpus: &[&str]) -> SearchIndex {
        SearchIndex::build(corpus, &IndexConfig::default()).unwrap()
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_single_chars() {
        assert_eq!(
            tokenize("Die Rechnung a B ist OK."),
            vec!["die", "rechnung", "ist", "ok"]
        );
    }

    #[test]
    fn test_vocabulary_has_unigrams_and_bigrams() {
        let index = build(&["invoice amount checked"]);
        assert!(index.contains_term("invoice"));
        assert!(index.contains_term("invoice amount"));
        assert!(index.contains_term("amount checked"));
        assert_eq!(index.vocabulary_len(), 5);
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let corpus: Vec<String> = vec![];
        assert_eq!(
            SearchIndex::build(&corpus, &IndexConfig::default()),
            Err(IndexError::EmptyCorpus)
        );
    }

    #[test]
    fn test_rows_are_normalized() {
        let index = build(&["refund refund limit", "iban holder differs"]);
        for row in index.rows() {
            let norm: f64 = row.entries().iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let config = IndexConfig { max_features: 1 };
        let index = SearchIndex::build(&["alpha beta beta", "beta gamma"], &config).unwrap();
        assert_eq!(index.vocabulary_len(), 1);
        assert!(index.contains_term("beta"));
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let index = build(&["common rare", "common other", "common third"]);
        let row = &index.rows()[0];
        let common = index.vocabulary["common"];
        let rare = index.vocabulary["rare"];
        let weight = |col: usize| {
            row.entries()
                .iter()
                .find(|(c, _)| *c == col)
                .map(|(_, w)| *w)
                .unwrap()
        };
        assert!(weight(rare) > weight(common));
    }

    #[test]
    fn test_unknown_query_projects_to_empty() {
        let index = build(&["invoice amount checked"]);
        let query = index.project("völlig unbekannt");
        assert!(query.is_empty());
        assert_eq!(query.cosine(&index.rows()[0]), 0.0);
    }

    #[test]
    fn test_identical_text_has_cosine_one() {
        let index = build(&["refund limit applies", "iban must match"]);
        let query = index.project("refund limit applies");
        assert!((query.cosine(&index.rows()[0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_is_deterministic() {
        let corpus = ["one two three", "two three four", "four five"];
        assert_eq!(build(&corpus), build(&corpus));
    }

    #[test]
    fn test_fallback_chunk_without_terms_still_indexes() {
        let index = build(&["   "]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.vocabulary_len(), 0);
        assert!(index.project("anything").is_empty());
    }
}
