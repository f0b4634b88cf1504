//! CLI argument definitions using clap
//!
//! Commands:
//! - corpusdb build --manifest <path>
//! - corpusdb resolve --manifest <path> --index <id> (--chunk <n> | --key <key>)
//! - corpusdb read --manifest <path> --index <id> --chunk <n>
//! - corpusdb strategies

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// corpusdb - chunked access to large annotated corpora
#[derive(Parser, Debug)]
#[command(name = "corpusdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that opens a corpus
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Path to the corpus manifest (JSON)
    #[arg(long)]
    pub manifest: PathBuf,

    /// Path to the engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory relative source paths resolve against
    /// (defaults to the manifest's directory)
    #[arg(long)]
    pub base: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every index in the manifest and report the result
    Build {
        #[command(flatten)]
        corpus: CorpusArgs,
    },

    /// Print the physical location of one chunk
    Resolve {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Index manifest id
        #[arg(long)]
        index: String,

        /// Zero-based chunk index
        #[arg(long, allow_hyphen_values = true, conflicts_with = "key")]
        chunk: Option<i64>,

        /// Key to look up in a keyed index
        #[arg(long)]
        key: Option<String>,
    },

    /// Print the contents of one chunk
    Read {
        #[command(flatten)]
        corpus: CorpusArgs,

        #[arg(long)]
        index: String,

        #[arg(long, allow_hyphen_values = true)]
        chunk: i64,
    },

    /// List the built-in index strategies
    Strategies,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
