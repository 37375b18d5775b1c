//! BM25 indexing, ranking and retrieval evaluation over plain-text corpora.

pub mod config;
pub mod corpus;
pub mod eval;
pub mod index;
pub mod persist;
pub mod rank;
pub mod runner;
pub mod tokenizer;

pub use config::{Bm25Params, DocIdConvention, SearchConfig};
pub use index::{CorpusIndex, DocId, Indexer, Term, TermFreqs};
pub use rank::{Query, Ranker, ScoredDoc};
pub use tokenizer::{Normalizer, Stem, Stopwords};
