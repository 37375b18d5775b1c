//! Drives the ranker over query input: the batch run that writes a results
//! file and the interactive read-rank-print loop.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::config::QUIT_SENTINEL;
use crate::rank::{Ranker, ScoredDoc};
use crate::tokenizer::Stem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLine {
    pub id: String,
    pub text: String,
}

/// One query per line: the first whitespace token is the ID, the rest is the text.
pub fn parse_queries(text: &str) -> Vec<QueryLine> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let mut parts = line.splitn(2, char::is_whitespace);
            let id = parts.next().filter(|id| !id.is_empty())?;
            let text = parts.next().unwrap_or("").trim();
            Some(QueryLine { id: id.to_string(), text: text.to_string() })
        })
        .collect()
}

pub fn load_queries<P: AsRef<Path>>(path: P) -> Result<Vec<QueryLine>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading queries from {}", path.display()))?;
    Ok(parse_queries(&text))
}

/// A line of the results file: `<query_id> <doc_id> <rank> <score>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    pub query_id: String,
    pub doc_id: String,
    pub rank: usize,
    pub score: f64,
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.query_id, self.doc_id, self.rank, self.score)
    }
}

impl FromStr for ResultLine {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [query_id, doc_id, rank, score] = fields.as_slice() else {
            bail!("expected 4 fields (query_id doc_id rank score), found {}", fields.len());
        };
        let rank: usize = rank.parse().with_context(|| format!("invalid rank {rank:?}"))?;
        if rank == 0 {
            bail!("rank must start at 1");
        }
        let score: f64 = score.parse().with_context(|| format!("invalid score {score:?}"))?;
        Ok(ResultLine { query_id: query_id.to_string(), doc_id: doc_id.to_string(), rank, score })
    }
}

/// The first `k` positive-score entries of a ranked list, with 1-based ranks.
pub fn top_hits(query_id: &str, ranked: &[ScoredDoc], k: usize) -> Vec<ResultLine> {
    ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, hit)| hit.score != 0.0)
        .map(|(i, hit)| ResultLine { query_id: query_id.to_string(), doc_id: hit.doc_id.clone(), rank: i + 1, score: hit.score })
        .collect()
}

/// Rank every query and write its top-K hits to `out`. Returns the number of lines written.
pub fn run_batch<S: Stem, W: Write>(ranker: &mut Ranker<'_, S>, queries: &[QueryLine], k: usize, out: &mut W) -> Result<usize> {
    let mut written = 0;
    for q in queries {
        let ranked = ranker.rank(&q.text);
        let hits = top_hits(&q.id, &ranked, k);
        tracing::debug!(query_id = %q.id, hits = hits.len(), "query ranked");
        for hit in &hits {
            writeln!(out, "{hit}")?;
        }
        written += hits.len();
    }
    Ok(written)
}

pub fn write_results_file<S: Stem, P: AsRef<Path>>(ranker: &mut Ranker<'_, S>, queries: &[QueryLine], k: usize, path: P) -> Result<usize> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("creating results file {}", path.display()))?;
    let mut w = BufWriter::new(f);
    let written = run_batch(ranker, queries, k, &mut w)?;
    w.flush()?;
    tracing::info!(path = %path.display(), queries = queries.len(), lines = written, "results written");
    Ok(written)
}

/// Read queries from `input` until `QUIT` or end of input, printing the top
/// `k` documents of each as `rank doc_id score`.
pub fn run_interactive<S: Stem, R: BufRead, W: Write>(ranker: &mut Ranker<'_, S>, mut input: R, out: &mut W, k: usize) -> Result<()> {
    writeln!(out, "Input {QUIT_SENTINEL} to exit the program")?;
    loop {
        write!(out, "Enter query: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let query = line.trim();
        if query == QUIT_SENTINEL {
            break;
        }
        for (i, hit) in ranker.rank(query).iter().take(k).enumerate() {
            writeln!(out, "{} {} {}", i + 1, hit.doc_id, hit.score)?;
        }
    }
    Ok(())
}
