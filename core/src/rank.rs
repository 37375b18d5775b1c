//! BM25 ranking over a [`CorpusIndex`].
//!
//! Per distinct query term `t` and document `d`:
//!
//! ```text
//! max(0, f(t,d)·(k+1) / (f(t,d) + k·(1 − b + b·len(d)/avgLen)) · log2((N − df(t) + 0.5) / (df(t) + 0.5)))
//! ```
//!
//! The clamp keeps a document that contains a very common term from scoring
//! below one that does not contain it at all. Every document in the index is
//! scored; top-K truncation happens in [`crate::runner`].

use rust_stemmers::Stemmer;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::config::Bm25Params;
use crate::index::{CorpusIndex, DocId, Term, TermFreqs};
use crate::tokenizer::{Normalizer, Stem};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Distinct normalized query terms. Ordered so score sums are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub terms: BTreeSet<Term>,
}

impl Query {
    pub fn from_terms<I: IntoIterator<Item = Term>>(terms: I) -> Self {
        Self { terms: terms.into_iter().collect() }
    }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

#[inline]
pub fn bm25_term(tf: u32, doc_len: u32, avg_doc_len: f64, n: u32, df: u32, params: Bm25Params) -> f64 {
    if tf == 0 {
        return 0.0;
    }
    let tf = f64::from(tf);
    let (n, df) = (f64::from(n), f64::from(df));
    let ntf = (tf * (params.k + 1.0)) / (tf + params.k * (1.0 - params.b + params.b * f64::from(doc_len) / avg_doc_len));
    let idf = ((n - df + 0.5) / (df + 0.5)).log2();
    let w = ntf * idf;
    if w > 0.0 { w } else { 0.0 }
}

/// Ascending document ID. All-digit IDs compare by numeric value so `9`
/// sorts before `10`; anything else compares as a plain string.
pub fn compare_doc_ids(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    if numeric(a) && numeric(b) {
        let (ta, tb) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
        ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb)).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

/// Sum of per-term contributions of `query` for one document.
pub fn score_document(index: &CorpusIndex, params: Bm25Params, doc_id: &str, tf: &TermFreqs, query: &Query) -> f64 {
    let len = index.doc_len(doc_id);
    query
        .terms
        .iter()
        .map(|t| {
            let f = tf.get(t).copied().unwrap_or(0);
            bm25_term(f, len, index.avg_doc_len, index.num_docs, index.doc_freq(t), params)
        })
        .fold(0.0, |acc, w| acc + w)
}

/// Descending score, then ascending document ID.
pub fn sort_ranked(scored: &mut [ScoredDoc]) {
    scored.sort_by(|x, y| y.score.total_cmp(&x.score).then_with(|| compare_doc_ids(&x.doc_id, &y.doc_id)));
}

pub struct Ranker<'a, S = Stemmer> {
    index: &'a CorpusIndex,
    params: Bm25Params,
    normalizer: Normalizer<S>,
}

impl<'a, S: Stem> Ranker<'a, S> {
    pub fn new(index: &'a CorpusIndex, params: Bm25Params, normalizer: Normalizer<S>) -> Self {
        Self { index, params, normalizer }
    }

    pub fn index(&self) -> &CorpusIndex { self.index }

    /// Normalize free text with the same pipeline used at indexing time.
    pub fn parse_query(&mut self, text: &str) -> Query {
        Query::from_terms(self.normalizer.normalize(text))
    }

    pub fn rank(&mut self, text: &str) -> Vec<ScoredDoc> {
        let query = self.parse_query(text);
        tracing::debug!(query = text, terms = ?query.terms, "ranking");
        self.rank_query(&query)
    }

    /// Score every document in the index and sort the result.
    pub fn rank_query(&self, query: &Query) -> Vec<ScoredDoc> {
        #[cfg(feature = "parallel")]
        let docs = self.index.docs.par_iter();
        #[cfg(not(feature = "parallel"))]
        let docs = self.index.docs.iter();

        let (index, params) = (self.index, self.params);
        let mut scored: Vec<ScoredDoc> = docs
            .map(|(doc_id, tf)| ScoredDoc { doc_id: doc_id.clone(), score: score_document(index, params, doc_id, tf, query) })
            .collect();
        sort_ranked(&mut scored);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Indexer;
    use crate::tokenizer::Stopwords;

    fn build(docs: &[(&str, &str)]) -> CorpusIndex {
        let mut ix = Indexer::new(Normalizer::english(Stopwords::default()));
        for (id, text) in docs {
            ix.add_document(id, text);
        }
        ix.finish()
    }

    #[test]
    fn term_weight_matches_formula() {
        // tf=2, len=4, avg=3, N=10, df=2, k=1, b=0.75
        let got = bm25_term(2, 4, 3.0, 10, 2, Bm25Params::default());
        let ntf = 2.0 * 2.0 / (2.0 + (1.0 - 0.75 + 0.75 * 4.0 / 3.0));
        let want = ntf * (8.5f64 / 2.5).log2();
        assert!((got - want).abs() < 1e-12);
    }

    #[test]
    fn common_terms_clamp_to_zero() {
        // df > N/2 makes the log negative
        assert_eq!(bm25_term(3, 3, 3.0, 2, 2, Bm25Params::default()), 0.0);
        assert_eq!(bm25_term(0, 3, 0.0, 0, 0, Bm25Params::default()), 0.0);
    }

    #[test]
    fn numeric_ids_sort_by_value() {
        assert_eq!(compare_doc_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_doc_ids("010", "9"), Ordering::Greater);
        assert_eq!(compare_doc_ids("GX10", "GX9"), Ordering::Less);
        assert_ne!(compare_doc_ids("07", "7"), Ordering::Equal);
    }

    #[test]
    fn ties_break_on_doc_id() {
        let index = build(&[("10", "apple"), ("9", "apple"), ("2", "pear"), ("11", "plum"), ("3", "kiwi"), ("4", "fig")]);
        let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(Stopwords::default()));
        let ranked = ranker.rank("apple");
        let ids: Vec<&str> = ranked.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["9", "10", "2", "3", "4", "11"]);
        assert!(ranked[0].score > 0.0);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn repeated_query_terms_count_once() {
        let index = build(&[("1", "cat dog"), ("2", "bird fish"), ("3", "cow pig")]);
        let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(Stopwords::default()));
        let once = ranker.rank("cat");
        let thrice = ranker.rank("cat cat CAT");
        assert_eq!(once, thrice);
    }

    #[test]
    fn empty_query_scores_positive_zero() {
        let index = build(&[("1", "cat dog"), ("2", "bird fish")]);
        let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(Stopwords::new(["the"])));
        let ranked = ranker.rank("the");
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|r| r.score == 0.0 && r.score.is_sign_positive()));
        assert_eq!(ranked[0].score.to_string(), "0");
    }
}
