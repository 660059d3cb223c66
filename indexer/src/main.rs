use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use okapi_core::builder::IndexBuilder;
use okapi_core::normalize::{read_stop_words, Normalizer};
use okapi_core::persist::save_index;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "okapi-indexer")]
#[command(about = "Build a BM25 index from a tagged text collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus file
    Build {
        /// Tagged corpus file (.I/.T/.A/.B/.W records)
        #[arg(long)]
        corpus: PathBuf,
        /// Stop-word list, one word per line
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Output index file
        #[arg(long, default_value = "index.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus, stopwords, output } => build(&corpus, stopwords.as_deref(), &output),
    }
}

fn build(corpus: &std::path::Path, stopwords: Option<&std::path::Path>, output: &std::path::Path) -> Result<()> {
    let stop_words = match stopwords {
        Some(path) => read_stop_words(path)?,
        None => {
            tracing::info!("no stop-word list supplied; indexing every term");
            HashSet::new()
        }
    };
    let normalizer = Normalizer::new(stop_words);

    let file =
        File::open(corpus).with_context(|| format!("cannot open corpus {}", corpus.display()))?;
    let snapshot = IndexBuilder::new(&normalizer).build(BufReader::new(file))?;
    save_index(output, &snapshot)?;
    tracing::info!(output = %output.display(), "index written");
    Ok(())
}
