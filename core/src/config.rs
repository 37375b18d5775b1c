use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::persist::SnapshotFormat;

lazy_static! {
    static ref NUMERIC_ID: Regex = Regex::new(r"^[0-9]+$").expect("valid regex");
}

/// Which file names count as document IDs in a corpus.
#[derive(Debug, Clone, Default)]
pub enum DocIdConvention {
    /// Purely numeric names, e.g. `1042`.
    #[default]
    Numeric,
    /// Names starting with a fixed prefix, e.g. `GX000-00-0000000`.
    Prefix(String),
    /// Names matching a regular expression, e.g. `^doc-[0-9]{3}$`.
    Pattern(Regex),
}

impl DocIdConvention {
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            DocIdConvention::Numeric => NUMERIC_ID.is_match(name),
            DocIdConvention::Prefix(p) => name.starts_with(p.as_str()),
            DocIdConvention::Pattern(re) => re.is_match(name),
        }
    }
}

impl FromStr for DocIdConvention {
    type Err = anyhow::Error;

    /// `numeric`, `prefix:<P>` or `regex:<R>`.
    fn from_str(s: &str) -> Result<Self> {
        if s == "numeric" {
            return Ok(DocIdConvention::Numeric);
        }
        match s.split_once(':') {
            Some(("prefix", p)) if !p.is_empty() => Ok(DocIdConvention::Prefix(p.to_string())),
            Some(("regex", r)) => Regex::new(r)
                .map(DocIdConvention::Pattern)
                .map_err(|e| anyhow!("invalid document id regex {r:?}: {e}")),
            _ => bail!("unknown document id convention {s:?} (expected numeric, prefix:<P> or regex:<R>)"),
        }
    }
}

impl fmt::Display for DocIdConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocIdConvention::Numeric => write!(f, "numeric"),
            DocIdConvention::Prefix(p) => write!(f, "prefix:{p}"),
            DocIdConvention::Pattern(re) => write!(f, "regex:{}", re.as_str()),
        }
    }
}

/// BM25 tuning constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k: 1.0, b: 0.75 } }
}

pub const DEFAULT_TOP_K: usize = 15;
pub const QUIT_SENTINEL: &str = "QUIT";

/// Everything a search run needs to locate its inputs and outputs.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub documents: PathBuf,
    pub stopwords: PathBuf,
    pub queries: PathBuf,
    pub results: PathBuf,
    pub index_dir: PathBuf,
    pub convention: DocIdConvention,
    pub format: SnapshotFormat,
    pub params: Bm25Params,
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            documents: PathBuf::from("./documents"),
            stopwords: PathBuf::from("./files/stopwords.txt"),
            queries: PathBuf::from("./files/queries.txt"),
            results: PathBuf::from("results.txt"),
            index_dir: PathBuf::from("./index"),
            convention: DocIdConvention::default(),
            format: SnapshotFormat::default(),
            params: Bm25Params::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}
