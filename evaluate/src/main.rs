use anyhow::Result;
use clap::Parser;
use okapi_core::eval::{evaluate, BprefMode, Qrels, Run};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "evaluate")]
#[command(about = "Score a results file against relevance judgments", long_about = None)]
struct Args {
    /// Results file, `<query_id> <doc_id> <rank> <score>` per line
    #[arg(long, default_value = "results.txt")]
    results: PathBuf,
    /// Judgments, `<query_id> <iteration> <doc_id> <relevance>` per line
    #[arg(long, default_value = "./files/qrels.txt")]
    qrels: PathBuf,
    /// bpref variant: judged (unjudged count as non-relevant) or explicit
    #[arg(long, default_value = "judged")]
    bpref: BprefMode,
    /// Print metrics for every query before the averages
    #[arg(long)]
    per_query: bool,
    /// Emit the evaluation as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))).init();
    let args = Args::parse();

    let run = Run::load(&args.results)?;
    let qrels = Qrels::load(&args.qrels)?;
    let eval = evaluate(&run, &qrels, args.bpref);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&eval)?);
        return Ok(());
    }
    if args.per_query {
        println!("{:<12} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}", "query", "P", "R", "R-prec", "P@10", "AP", "bpref");
        for m in &eval.per_query {
            println!(
                "{:<12} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
                m.query_id, m.precision, m.recall, m.r_precision, m.p_at_10, m.average_precision, m.bpref
            );
        }
        println!();
    }
    println!("{}", eval.summary);
    Ok(())
}
