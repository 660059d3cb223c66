use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use okapi_core::eval::EvalParams;
use okapi_core::normalize::read_stop_words;
use okapi_core::{Bm25Params, Normalizer};
use okapi_searcher::{format_report, open_index, run_evaluation, run_manual};
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "okapi-searcher")]
#[command(about = "Query a BM25 index and evaluate ranking quality", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IndexArgs {
    /// Index file; built from --corpus and saved here when missing
    #[arg(long, default_value = "index.json")]
    index: PathBuf,
    /// Tagged corpus file, used only when the index must be built
    #[arg(long)]
    corpus: Option<PathBuf>,
    /// Stop-word list, one word per line
    #[arg(long)]
    stopwords: Option<PathBuf>,
}

#[derive(Args)]
struct ScoringArgs {
    /// BM25 term-frequency saturation
    #[arg(long, default_value_t = 1.0)]
    k1: f64,
    /// BM25 length-normalization weight
    #[arg(long, default_value_t = 0.75)]
    b: f64,
    /// Return at most this many documents per query
    #[arg(long, default_value_t = 15)]
    top: usize,
    /// Keep documents whose aggregate score is zero or negative
    #[arg(long, default_value_t = false)]
    include_nonpositive: bool,
}

impl ScoringArgs {
    fn params(&self) -> Bm25Params {
        Bm25Params {
            k1: self.k1,
            b: self.b,
            top_k: self.top,
            include_nonpositive: self.include_nonpositive,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive query prompt; type QUIT to stop
    Manual {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        scoring: ScoringArgs,
    },
    /// Batch-score a query file and report precision, recall, P@N, MAP, NDCG@N
    Evaluate {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        scoring: ScoringArgs,
        /// Tagged query file, one record per query
        #[arg(long)]
        queries: PathBuf,
        /// Relevance judgments: `queryID documentID grade` per line
        #[arg(long)]
        relevance: PathBuf,
        /// Write `queryID documentID rank` triples to this file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Rank cutoff for P@N and NDCG@N
        #[arg(long, default_value_t = 10)]
        n: usize,
        /// Judged documents with grade at or below this are relevant
        #[arg(long, default_value_t = 4)]
        threshold: i32,
        /// Minuend converting grades into NDCG gains
        #[arg(long, default_value_t = 5)]
        gain_fix: i32,
    },
}

fn load_normalizer(args: &IndexArgs) -> Result<Normalizer> {
    let stop_words = match &args.stopwords {
        Some(path) => read_stop_words(path)?,
        None => {
            tracing::info!("no stop-word list supplied; keeping every term");
            HashSet::new()
        }
    };
    Ok(Normalizer::new(stop_words))
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Manual { index, scoring } => {
            let normalizer = load_normalizer(&index)?;
            let snapshot = open_index(&index.index, index.corpus.as_deref(), &normalizer)?;
            let stdin = io::stdin();
            run_manual(&snapshot, &normalizer, &scoring.params(), stdin.lock(), io::stdout())
        }
        Commands::Evaluate {
            index,
            scoring,
            queries,
            relevance,
            output,
            n,
            threshold,
            gain_fix,
        } => {
            let normalizer = load_normalizer(&index)?;
            let snapshot = open_index(&index.index, index.corpus.as_deref(), &normalizer)?;
            let eval_params = EvalParams { relevance_threshold: threshold, n, gain_fix };
            let report = run_evaluation(
                &snapshot,
                &normalizer,
                &scoring.params(),
                &eval_params,
                &queries,
                &relevance,
                output.as_deref(),
            )?;
            print!("{}", format_report(&report, &eval_params));
            Ok(())
        }
    }
}
