use anyhow::Result;
use clap::{Parser, ValueEnum};
use okapi_core::config::{Bm25Params, DocIdConvention, SearchConfig, DEFAULT_TOP_K};
use okapi_core::corpus::index_corpus;
use okapi_core::persist::{load_or_build, IndexPaths, SnapshotFormat};
use okapi_core::runner::{load_queries, run_interactive, write_results_file};
use okapi_core::{Normalizer, Ranker, Stopwords};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Read queries from the terminal until QUIT
    Interactive,
    /// Rank every query in the query file and write the results file
    Automatic,
}

#[derive(Parser)]
#[command(name = "search")]
#[command(about = "Rank documents against queries with BM25", long_about = None)]
struct Args {
    #[arg(short, long, value_enum)]
    mode: Mode,
    /// Corpus root, walked recursively when no snapshot exists
    #[arg(long, default_value = "./documents")]
    documents: PathBuf,
    #[arg(long, default_value = "./files/stopwords.txt")]
    stopwords: PathBuf,
    /// Query file for automatic mode, `<id> <text>` per line
    #[arg(long, default_value = "./files/queries.txt")]
    queries: PathBuf,
    /// Results file written in automatic mode
    #[arg(long, default_value = "results.txt")]
    results: PathBuf,
    /// Index snapshot directory
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Document id convention: numeric, prefix:<P> or regex:<R>
    #[arg(long, default_value = "numeric")]
    ids: DocIdConvention,
    /// Encoding used when a new snapshot is written: bincode or json
    #[arg(long, default_value = "bincode")]
    format: SnapshotFormat,
    #[arg(long, default_value_t = 1.0)]
    k: f64,
    #[arg(long, default_value_t = 0.75)]
    b: f64,
    /// Number of ranked documents reported per query
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
}

impl From<Args> for SearchConfig {
    fn from(a: Args) -> Self {
        SearchConfig {
            documents: a.documents,
            stopwords: a.stopwords,
            queries: a.queries,
            results: a.results,
            index_dir: a.index,
            convention: a.ids,
            format: a.format,
            params: Bm25Params { k: a.k, b: a.b },
            top_k: a.top_k,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let args = Args::parse();
    let mode = args.mode;
    let config = SearchConfig::from(args);

    let stopwords = Stopwords::load(&config.stopwords)?;
    let paths = IndexPaths::new(&config.index_dir);
    let index = load_or_build(&paths, config.format, || {
        index_corpus(&config.documents, &config.convention, Normalizer::english(stopwords.clone()))
    })?;
    tracing::info!(num_docs = index.num_docs, num_terms = index.num_terms(), "index ready");

    let mut ranker = Ranker::new(&index, config.params, Normalizer::english(stopwords));
    match mode {
        Mode::Interactive => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            run_interactive(&mut ranker, stdin.lock(), &mut stdout, config.top_k)?;
        }
        Mode::Automatic => {
            let queries = load_queries(&config.queries)?;
            write_results_file(&mut ranker, &queries, config.top_k, &config.results)?;
        }
    }
    Ok(())
}
