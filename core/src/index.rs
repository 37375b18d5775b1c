use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tokenizer::{Normalizer, Stem};

pub type DocId = String;
pub type Term = String;
/// Term -> raw occurrence count within one document.
pub type TermFreqs = HashMap<Term, u32>;

/// Aggregate statistics the BM25 ranker needs. Built once per corpus.
///
/// Field names on the wire match the legacy `cache.json` layout so a JSON
/// snapshot stays readable by the older tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusIndex {
    pub avg_doc_len: f64,
    #[serde(rename = "N")]
    pub num_docs: u32,
    pub docs: HashMap<DocId, TermFreqs>,
    #[serde(rename = "frequency")]
    pub df: HashMap<Term, u32>,
    pub doc_len: HashMap<DocId, u32>,
}

impl CorpusIndex {
    pub fn new() -> Self { Self::default() }

    pub fn num_terms(&self) -> usize { self.df.len() }

    pub fn is_empty(&self) -> bool { self.num_docs == 0 }

    /// Raw count of `term` in `doc`, 0 when either is unknown.
    pub fn term_freq(&self, doc: &str, term: &str) -> u32 {
        self.docs.get(doc).and_then(|tf| tf.get(term)).copied().unwrap_or(0)
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.df.get(term).copied().unwrap_or(0)
    }

    pub fn doc_len(&self, doc: &str) -> u32 {
        self.doc_len.get(doc).copied().unwrap_or(0)
    }
}

/// Accumulates a [`CorpusIndex`] one document at a time.
pub struct Indexer<S> {
    normalizer: Normalizer<S>,
    index: CorpusIndex,
    total_len: u64,
}

impl<S: Stem> Indexer<S> {
    pub fn new(normalizer: Normalizer<S>) -> Self {
        Self { normalizer, index: CorpusIndex::new(), total_len: 0 }
    }

    /// Tokenize `text` line by line and fold it into the index under `id`.
    /// Returns `false` (and leaves the index untouched) if `id` was already added.
    pub fn add_document(&mut self, id: &str, text: &str) -> bool {
        if self.index.docs.contains_key(id) {
            tracing::warn!(doc_id = id, "duplicate document id, skipping");
            return false;
        }

        let mut tf: TermFreqs = HashMap::new();
        let mut len: u32 = 0;
        for line in text.lines() {
            for term in self.normalizer.normalize(line) {
                len += 1;
                *tf.entry(term).or_insert(0) += 1;
            }
        }
        // each key is a 0 -> 1 transition for this document
        for term in tf.keys() {
            *self.index.df.entry(term.clone()).or_insert(0) += 1;
        }

        self.total_len += u64::from(len);
        self.index.doc_len.insert(id.to_string(), len);
        self.index.docs.insert(id.to_string(), tf);
        self.index.num_docs += 1;
        true
    }

    pub fn num_docs(&self) -> u32 { self.index.num_docs }

    /// Finalize corpus-wide statistics. An empty corpus has an average length of 0.
    pub fn finish(mut self) -> CorpusIndex {
        self.index.avg_doc_len = if self.index.num_docs == 0 {
            0.0
        } else {
            self.total_len as f64 / f64::from(self.index.num_docs)
        };
        tracing::info!(
            num_docs = self.index.num_docs,
            num_terms = self.index.num_terms(),
            avg_doc_len = self.index.avg_doc_len,
            cached_stems = self.normalizer.cached_stems(),
            "index built"
        );
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Stopwords;

    fn indexer() -> Indexer<rust_stemmers::Stemmer> {
        Indexer::new(Normalizer::english(Stopwords::new(["the", "a"])))
    }

    #[test]
    fn df_counts_documents_not_occurrences() {
        let mut ix = indexer();
        ix.add_document("1", "cat dog cat\ncat");
        ix.add_document("2", "dog dog dog");
        let index = ix.finish();
        assert_eq!(index.doc_freq("cat"), 1);
        assert_eq!(index.doc_freq("dog"), 2);
        assert_eq!(index.term_freq("1", "cat"), 3);
        assert_eq!(index.doc_len("1"), 4);
        assert_eq!(index.num_docs, 2);
        assert!((index.avg_doc_len - 3.5).abs() < 1e-12);
    }

    #[test]
    fn stopwords_do_not_count_toward_length() {
        let mut ix = indexer();
        ix.add_document("1", "The cat and a dog");
        let index = ix.finish();
        assert_eq!(index.doc_len("1"), 3);
        assert_eq!(index.term_freq("1", "the"), 0);
    }

    #[test]
    fn punctuation_tokens_count_toward_length() {
        let mut ix = Indexer::new(Normalizer::english(Stopwords::new(["the"])));
        ix.add_document("1", "cat -- dog ... cat");
        let index = ix.finish();
        assert_eq!(index.doc_len("1"), 5);
        assert_eq!(index.term_freq("1", ""), 2);
        assert_eq!(index.doc_freq(""), 1);
        assert!((index.avg_doc_len - 5.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_ids_are_skipped() {
        let mut ix = indexer();
        assert!(ix.add_document("7", "cat"));
        assert!(!ix.add_document("7", "dog"));
        let index = ix.finish();
        assert_eq!(index.num_docs, 1);
        assert_eq!(index.doc_freq("dog"), 0);
    }

    #[test]
    fn empty_corpus_has_zero_average() {
        let index = indexer().finish();
        assert!(index.is_empty());
        assert_eq!(index.avg_doc_len, 0.0);
    }
}
