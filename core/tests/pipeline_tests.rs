use okapi_core::corpus::index_corpus;
use okapi_core::eval::{evaluate, BprefMode, Qrels, Run};
use okapi_core::persist::{load_index, load_or_build, save_index, IndexPaths, SnapshotFormat};
use okapi_core::runner::{parse_queries, run_interactive, write_results_file};
use okapi_core::{Bm25Params, CorpusIndex, DocIdConvention, Indexer, Normalizer, Ranker, Stopwords};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const DOCS: &[(&str, &str)] = &[
    ("1", "Supersonic flow over a flat plate.\nThe boundary layer on the plate."),
    ("2", "Heat transfer in turbulent flow, measured at high Mach numbers."),
    ("3", "Flutter of thin wings and panels in supersonic flow!"),
    ("4", "The theory of laminar boundary layers."),
    ("5", "Wing flutter, panel flutter, and flutter suppression."),
];

fn stopwords() -> Stopwords {
    Stopwords::parse("a\nthe\nof\nin\non\nand\nat\nover\n")
}

fn build_index() -> CorpusIndex {
    let mut ix = Indexer::new(Normalizer::english(stopwords()));
    for (id, text) in DOCS {
        ix.add_document(id, text);
    }
    ix.finish()
}

fn write_corpus(dir: &Path) {
    for (id, text) in DOCS {
        fs::write(dir.join(id), text).unwrap();
    }
    fs::write(dir.join("README"), "not a document").unwrap();
}

#[test]
fn doc_lengths_equal_term_count_sums() {
    let index = build_index();
    for (doc, tf) in &index.docs {
        assert_eq!(tf.values().sum::<u32>(), index.doc_len(doc), "doc {doc}");
    }
    let total: u32 = index.doc_len.values().sum();
    assert!((index.avg_doc_len - f64::from(total) / f64::from(index.num_docs)).abs() < 1e-12);
}

#[test]
fn df_equals_containing_documents() {
    let index = build_index();
    for (term, df) in &index.df {
        let containing = index.docs.values().filter(|tf| tf.get(term).copied().unwrap_or(0) > 0).count();
        assert_eq!(*df as usize, containing, "term {term}");
    }
    for tf in index.docs.values() {
        for term in tf.keys() {
            assert!(index.df.contains_key(term));
        }
    }
}

#[test]
fn scores_are_non_negative_and_stable() {
    let index = build_index();
    let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(stopwords()));
    for q in ["flow", "supersonic flutter", "the of a", "boundary layer plate", "unseen words"] {
        let first = ranker.rank(q);
        let second = ranker.rank(q);
        assert_eq!(first, second, "query {q:?}");
        assert_eq!(first.len(), DOCS.len());
        assert!(first.iter().all(|r| r.score >= 0.0));
        assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[test]
fn term_present_ranks_above_term_absent() {
    let mut ix = Indexer::new(Normalizer::english(Stopwords::default()));
    ix.add_document("A", "cat dog cat");
    ix.add_document("B", "dog dog dog");
    ix.add_document("C", "bird");
    let index = ix.finish();
    assert_eq!(index.doc_len("A"), 3);
    assert_eq!(index.doc_len("B"), 3);

    let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(Stopwords::default()));
    let ranked = ranker.rank("cat");
    assert_eq!(ranked[0].doc_id, "A");
    assert!(ranked[0].score > 0.0);
    let b = ranked.iter().find(|r| r.doc_id == "B").unwrap();
    assert_eq!(b.score, 0.0);
}

#[test]
fn very_common_terms_never_go_negative() {
    let mut ix = Indexer::new(Normalizer::english(Stopwords::default()));
    ix.add_document("1", "common rare");
    ix.add_document("2", "common");
    ix.add_document("3", "common");
    let index = ix.finish();
    let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(Stopwords::default()));
    let ranked = ranker.rank("common");
    assert!(ranked.iter().all(|r| r.score == 0.0));
}

#[test]
fn snapshot_round_trip_is_exact() {
    let index = build_index();
    let dir = tempdir().unwrap();
    for format in [SnapshotFormat::Bincode, SnapshotFormat::Json] {
        let paths = IndexPaths::new(dir.path().join(format.to_string()));
        save_index(&paths, &index, format).unwrap();
        let loaded = load_index(&paths, format).unwrap();
        assert_eq!(loaded, index, "{format}");
        assert_eq!(loaded.avg_doc_len.to_bits(), index.avg_doc_len.to_bits());
    }
}

#[test]
fn existing_snapshot_is_trusted_over_corpus() {
    let corpus = tempdir().unwrap();
    write_corpus(corpus.path());
    let out = tempdir().unwrap();
    let paths = IndexPaths::new(out.path());

    let build = || index_corpus(corpus.path(), &DocIdConvention::Numeric, Normalizer::english(stopwords()));
    let first = load_or_build(&paths, SnapshotFormat::Bincode, build).unwrap();
    assert_eq!(first.num_docs, 5);

    fs::write(corpus.path().join("6"), "a late arrival").unwrap();
    let second = load_or_build(&paths, SnapshotFormat::Bincode, build).unwrap();
    assert_eq!(second, first);
}

#[test]
fn batch_run_then_evaluate() {
    let corpus = tempdir().unwrap();
    write_corpus(corpus.path());
    let index = index_corpus(corpus.path(), &DocIdConvention::Numeric, Normalizer::english(stopwords())).unwrap();
    assert_eq!(index, build_index());

    let queries = parse_queries("q1 supersonic flutter\nq2 boundary layer\nq3 zzz\n");
    let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(stopwords()));
    let out = tempdir().unwrap();
    let results = out.path().join("results.txt");
    let written = write_results_file(&mut ranker, &queries, 15, &results).unwrap();

    let text = fs::read_to_string(&results).unwrap();
    assert_eq!(text.lines().count(), written);
    let mut per_query: HashMap<&str, Vec<&str>> = HashMap::new();
    for line in text.lines() {
        let f: Vec<&str> = line.split(' ').collect();
        assert_eq!(f.len(), 4);
        assert!(f[3].parse::<f64>().unwrap() > 0.0);
        per_query.entry(f[0]).or_default().push(f[1]);
    }
    assert!(!per_query.contains_key("q3"));
    assert_eq!(per_query["q1"][0], "3");

    let run = Run::load(&results).unwrap();
    let qrels = Qrels::parse("q1 0 3 1\nq1 0 5 1\nq1 0 1 0\nq2 0 4 1\nq2 0 1 2\n").unwrap();
    let eval = evaluate(&run, &qrels, BprefMode::Explicit);
    assert_eq!(eval.summary.queries, 2);
    assert!(eval.summary.recall > 0.0 && eval.summary.recall <= 1.0);
    assert!(eval.summary.bpref >= 0.0 && eval.summary.bpref <= 1.0);
}

#[test]
fn interactive_loop_stops_at_quit() {
    let index = build_index();
    let mut ranker = Ranker::new(&index, Bm25Params::default(), Normalizer::english(stopwords()));
    let input = "flutter\nQUIT\nflow\n".as_bytes();
    let mut out = Vec::new();
    run_interactive(&mut ranker, input, &mut out, 2).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out.matches("Enter query: ").count(), 2);
    assert!(out.contains("Enter query: 1 5 "));
    assert!(out.contains("\n2 3 "));
    assert_eq!(out.lines().count(), 4);
}
