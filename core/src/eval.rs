//! Retrieval effectiveness metrics over a results file and relevance judgments.
//!
//! Every metric is computed per query and macro-averaged over the queries
//! present in the run. Zero denominators are defined as 0.0: a query with no
//! results scores 0 precision, and a query with no relevant documents scores 0
//! recall, R-precision, average precision and bpref.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::runner::ResultLine;

pub type DocSet = HashSet<String>;

/// Which documents advance bpref's count of non-relevant documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BprefMode {
    /// Anything not judged relevant counts as non-relevant.
    #[default]
    JudgedOnly,
    /// Only documents explicitly judged non-relevant count; unjudged ones are skipped.
    Explicit,
}

impl FromStr for BprefMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "judged" | "judged-only" => Ok(BprefMode::JudgedOnly),
            "explicit" => Ok(BprefMode::Explicit),
            other => bail!("unknown bpref mode {other:?} (expected judged or explicit)"),
        }
    }
}

/// Relevance judgments per query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qrels {
    relevant: HashMap<String, DocSet>,
    non_relevant: HashMap<String, DocSet>,
}

impl Qrels {
    /// Parse `<query_id> <iteration> <doc_id> <relevance>` lines. Relevance `0`
    /// marks a document explicitly non-relevant, anything else relevant.
    pub fn parse(text: &str) -> Result<Self> {
        let mut qrels = Qrels::default();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [query_id, _iteration, doc_id, relevance] = fields.as_slice() else {
                bail!("line {}: expected 4 fields (query_id iteration doc_id relevance), found {}", lineno + 1, fields.len());
            };
            let target = if *relevance == "0" { &mut qrels.non_relevant } else { &mut qrels.relevant };
            target.entry(query_id.to_string()).or_default().insert(doc_id.to_string());
        }
        Ok(qrels)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading judgments from {}", path.display()))?;
        let qrels = Self::parse(&text).with_context(|| format!("parsing judgments in {}", path.display()))?;
        tracing::info!(path = %path.display(), queries = qrels.relevant.len(), "loaded relevance judgments");
        Ok(qrels)
    }

    pub fn relevant(&self, query_id: &str) -> Option<&DocSet> { self.relevant.get(query_id) }

    pub fn non_relevant(&self, query_id: &str) -> Option<&DocSet> { self.non_relevant.get(query_id) }

    pub fn insert(&mut self, query_id: &str, doc_id: &str, relevant: bool) {
        let target = if relevant { &mut self.relevant } else { &mut self.non_relevant };
        target.entry(query_id.to_string()).or_default().insert(doc_id.to_string());
    }
}

/// Ranked document IDs per query, in results-file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub queries: BTreeMap<String, Vec<String>>,
}

impl Run {
    /// Parse a results file. Zero-score lines are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut run = Run::default();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let hit: ResultLine = line.parse().with_context(|| format!("line {}", lineno + 1))?;
            if hit.score == 0.0 {
                continue;
            }
            run.queries.entry(hit.query_id).or_default().push(hit.doc_id);
        }
        Ok(run)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading results from {}", path.display()))?;
        let run = Self::parse(&text).with_context(|| format!("parsing results in {}", path.display()))?;
        tracing::info!(path = %path.display(), queries = run.queries.len(), "loaded results");
        Ok(run)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn hits(res: &[String], rel: &DocSet) -> usize {
    res.iter().filter(|d| rel.contains(*d)).count()
}

pub fn precision(res: &[String], rel: &DocSet) -> f64 {
    ratio(hits(res, rel), res.len())
}

pub fn recall(res: &[String], rel: &DocSet) -> f64 {
    ratio(hits(res, rel), rel.len())
}

/// Relevant documents among the first `n` results, divided by `n` even when fewer were returned.
pub fn precision_at(res: &[String], rel: &DocSet, n: usize) -> f64 {
    let cut = n.min(res.len());
    ratio(hits(&res[..cut], rel), n)
}

pub fn r_precision(res: &[String], rel: &DocSet) -> f64 {
    precision_at(res, rel, rel.len())
}

/// Sum of precision at each relevant rank, divided by the number of relevant documents.
pub fn average_precision(res: &[String], rel: &DocSet) -> f64 {
    if rel.is_empty() {
        return 0.0;
    }
    let mut found = 0usize;
    let mut sum = 0.0;
    for (i, doc) in res.iter().enumerate() {
        if rel.contains(doc) {
            found += 1;
            sum += found as f64 / (i + 1) as f64;
        }
    }
    sum / rel.len() as f64
}

pub fn bpref(res: &[String], rel: &DocSet, non_rel: &DocSet, mode: BprefMode) -> f64 {
    let r = rel.len();
    if r == 0 {
        return 0.0;
    }
    let mut nr = 0usize;
    let mut sum = 0.0;
    for doc in res {
        match mode {
            BprefMode::JudgedOnly => {
                if rel.contains(doc) {
                    sum += 1.0 - nr.min(r) as f64 / r as f64;
                } else {
                    nr += 1;
                }
            }
            BprefMode::Explicit => {
                if non_rel.contains(doc) {
                    nr += 1;
                } else if rel.contains(doc) {
                    sum += (1.0 - nr as f64 / r as f64).max(0.0);
                }
            }
        }
    }
    sum / r as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetrics {
    pub query_id: String,
    pub precision: f64,
    pub recall: f64,
    pub r_precision: f64,
    pub p_at_10: f64,
    pub average_precision: f64,
    pub bpref: f64,
}

/// Macro-averaged metrics over every query in the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricReport {
    pub queries: usize,
    pub precision: f64,
    pub recall: f64,
    pub r_precision: f64,
    pub p_at_10: f64,
    pub map: f64,
    pub bpref: f64,
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation: {:>10}", "results:")?;
        writeln!(f, "Precision:    {:>10}", self.precision)?;
        writeln!(f, "Recall:       {:>10}", self.recall)?;
        writeln!(f, "R-precision:  {:>10}", self.r_precision)?;
        writeln!(f, "P@10:         {:>10}", self.p_at_10)?;
        writeln!(f, "MAP:          {:>10}", self.map)?;
        write!(f, "bpref:        {:>10}", self.bpref)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub per_query: Vec<QueryMetrics>,
    pub summary: MetricReport,
}

pub fn evaluate(run: &Run, qrels: &Qrels, mode: BprefMode) -> Evaluation {
    let empty = DocSet::new();
    let per_query: Vec<QueryMetrics> = run
        .queries
        .iter()
        .map(|(qid, res)| {
            let rel = qrels.relevant(qid).unwrap_or_else(|| {
                tracing::warn!(query_id = %qid, "no relevant documents judged for query");
                &empty
            });
            let non_rel = qrels.non_relevant(qid).unwrap_or(&empty);
            QueryMetrics {
                query_id: qid.clone(),
                precision: precision(res, rel),
                recall: recall(res, rel),
                r_precision: r_precision(res, rel),
                p_at_10: precision_at(res, rel, 10),
                average_precision: average_precision(res, rel),
                bpref: bpref(res, rel, non_rel, mode),
            }
        })
        .collect();

    let n = per_query.len();
    let mean = |f: fn(&QueryMetrics) -> f64| if n == 0 { 0.0 } else { per_query.iter().map(f).sum::<f64>() / n as f64 };
    let summary = MetricReport {
        queries: n,
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        r_precision: mean(|m| m.r_precision),
        p_at_10: mean(|m| m.p_at_10),
        map: mean(|m| m.average_precision),
        bpref: mean(|m| m.bpref),
    };
    Evaluation { per_query, summary }
}
