use anyhow::Result;
use clap::{Parser, Subcommand};
use okapi_core::config::DocIdConvention;
use okapi_core::corpus::index_corpus;
use okapi_core::persist::{load_index, load_meta, save_index, IndexPaths, SnapshotFormat};
use okapi_core::{Normalizer, Stopwords};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect BM25 corpus index snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every document under a directory and write a snapshot
    Build {
        /// Corpus root, walked recursively
        #[arg(long, default_value = "./documents")]
        documents: String,
        /// Stopword list, one per line
        #[arg(long, default_value = "./files/stopwords.txt")]
        stopwords: String,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: String,
        /// Document id convention: numeric, prefix:<P> or regex:<R>
        #[arg(long, default_value = "numeric")]
        ids: DocIdConvention,
        /// Snapshot encoding: bincode or json
        #[arg(long, default_value = "bincode")]
        format: SnapshotFormat,
    },
    /// Print statistics for an existing snapshot
    Inspect {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Also list the most frequent terms
        #[arg(long, default_value_t = 0)]
        top_terms: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { documents, stopwords, output, ids, format } => build(&documents, &stopwords, &output, &ids, format),
        Commands::Inspect { index, top_terms } => inspect(&index, top_terms),
    }
}

fn build(documents: &str, stopwords: &str, output: &str, ids: &DocIdConvention, format: SnapshotFormat) -> Result<()> {
    let stopwords = Stopwords::load(stopwords)?;
    let index = index_corpus(Path::new(documents), ids, Normalizer::english(stopwords))?;
    let paths = IndexPaths::new(output);
    save_index(&paths, &index, format)?;
    tracing::info!(output, num_docs = index.num_docs, "index build complete");
    Ok(())
}

fn inspect(dir: &str, top_terms: usize) -> Result<()> {
    let paths = IndexPaths::new(dir);
    let Some((format, path)) = paths.existing_snapshot() else {
        anyhow::bail!("no snapshot found in {dir}");
    };
    let index = load_index(&paths, format)?;

    println!("snapshot:     {}", path.display());
    if let Ok(meta) = load_meta(&paths) {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    }
    println!("documents:    {}", index.num_docs);
    println!("terms:        {}", index.num_terms());
    println!("avg length:   {}", index.avg_doc_len);

    if top_terms > 0 {
        let mut terms: Vec<(&String, &u32)> = index.df.iter().collect();
        terms.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (term, df) in terms.into_iter().take(top_terms) {
            println!("{df:>8} {term}");
        }
    }
    Ok(())
}
