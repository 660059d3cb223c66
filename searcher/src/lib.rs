//! Frontends around the scoring core: an interactive prompt and a batch
//! evaluation run. Both load the persisted index when it exists; a missing
//! index is not an error, it triggers the build path.

use anyhow::{Context, Result};
use okapi_core::builder::IndexBuilder;
use okapi_core::eval::{evaluate, EvalParams, MetricsReport, RelevanceJudgments};
use okapi_core::persist::{load_index, save_index};
use okapi_core::query::parse_query_file;
use okapi_core::retrieval::{score, score_queries, write_run, Bm25Params};
use okapi_core::{IndexSnapshot, Normalizer, Query, RankedHit, RankedResults, StemmingCache};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Sentinel line that ends the interactive loop. Case-sensitive.
pub const QUIT_WORD: &str = "QUIT";

/// Load the index at `index_path`, or build it from `corpus` and persist it
/// when no index file exists yet.
pub fn open_index(
    index_path: &Path,
    corpus: Option<&Path>,
    normalizer: &Normalizer,
) -> Result<IndexSnapshot> {
    if index_path.exists() {
        tracing::info!(index = %index_path.display(), "loading index");
        return load_index(index_path);
    }
    let corpus = corpus.with_context(|| {
        format!("no index at {} and no --corpus to build one from", index_path.display())
    })?;
    tracing::info!(corpus = %corpus.display(), "index not found; building");
    let file =
        File::open(corpus).with_context(|| format!("cannot open corpus {}", corpus.display()))?;
    let snapshot = IndexBuilder::new(normalizer).build(BufReader::new(file))?;
    save_index(index_path, &snapshot)?;
    Ok(snapshot)
}

/// Score one free-text query. The interactive loop is a thin collaborator
/// that calls this until it chooses to stop.
pub fn score_text(
    text: &str,
    index: &IndexSnapshot,
    normalizer: &Normalizer,
    cache: &mut StemmingCache,
    params: &Bm25Params,
) -> Vec<RankedHit> {
    let query = Query::from_text(text, normalizer, cache);
    score(&query, index, params)
}

/// Read queries from `input` until the quit sentinel or end of input,
/// printing a ranked table for each.
pub fn run_manual<R: BufRead, W: Write>(
    index: &IndexSnapshot,
    normalizer: &Normalizer,
    params: &Bm25Params,
    mut input: R,
    mut output: W,
) -> Result<()> {
    let mut cache = StemmingCache::from_table(index.stemming.clone());
    loop {
        write!(output, "Enter query (type \"{QUIT_WORD}\" to stop): ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text == QUIT_WORD {
            break;
        }
        let hits = score_text(text, index, normalizer, &mut cache, params);
        writeln!(output, "Rank\tID\tScore")?;
        for hit in hits {
            writeln!(output, "{}\t{}\t{}", hit.rank, hit.doc_id, hit.score)?;
        }
    }
    Ok(())
}

/// Batch-score a tagged query file against the index.
pub fn run_queries(
    index: &IndexSnapshot,
    normalizer: &Normalizer,
    params: &Bm25Params,
    query_path: &Path,
) -> Result<RankedResults> {
    let file = File::open(query_path)
        .with_context(|| format!("cannot open query file {}", query_path.display()))?;
    let mut cache = StemmingCache::from_table(index.stemming.clone());
    let queries = parse_query_file(BufReader::new(file), normalizer, &mut cache)?;
    tracing::info!(num_queries = queries.len(), "scoring query batch");
    Ok(score_queries(&queries, index, params))
}

/// Score a query file, optionally write the run, and measure it against the
/// judgment file.
pub fn run_evaluation(
    index: &IndexSnapshot,
    normalizer: &Normalizer,
    params: &Bm25Params,
    eval_params: &EvalParams,
    query_path: &Path,
    relevance_path: &Path,
    run_output: Option<&Path>,
) -> Result<MetricsReport> {
    let results = run_queries(index, normalizer, params, query_path)?;
    if let Some(path) = run_output {
        let file = File::create(path)
            .with_context(|| format!("cannot create run output {}", path.display()))?;
        write_run(&results, file)?;
        tracing::info!(output = %path.display(), "run written");
    }
    let file = File::open(relevance_path)
        .with_context(|| format!("cannot open judgment file {}", relevance_path.display()))?;
    let judgments = RelevanceJudgments::from_reader(BufReader::new(file))?;
    Ok(evaluate(&results, &judgments, eval_params))
}

/// Render the report in the evaluation output layout.
pub fn format_report(report: &MetricsReport, eval_params: &EvalParams) -> String {
    let mut out = String::new();
    out.push_str("Evaluation Results:\n");
    out.push_str(&format!("Precision: {}\n", report.precision));
    out.push_str(&format!("Recall: {}\n", report.recall));
    out.push_str(&format!("P@{}: {}\n", eval_params.n, report.p_at_n));
    out.push_str(&format!("Mean Average Precision: {}\n", report.mean_average_precision));
    out.push_str(&format!("Mean NDCG@{}: {}\n", eval_params.n, report.mean_ndcg));
    for (query_id, curve) in &report.ndcg_curves {
        let values: Vec<String> = curve.iter().map(|value| value.to_string()).collect();
        out.push_str(&format!(
            "NDCG@{} <Query {}>: [{}]\n",
            eval_params.n,
            query_id,
            values.join(", ")
        ));
    }
    out.push_str(&format!(
        "Queries evaluated: {} ({} excluded from recall/MAP/NDCG averages)\n",
        report.evaluated_queries,
        report.excluded_queries.len()
    ));
    out
}
