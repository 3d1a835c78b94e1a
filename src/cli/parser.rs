//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fisco-rs: retrieval engine for Mexican tax law.
///
/// Routes natural-language questions to statutory articles, RMF rules, or
/// hybrid vector search, and manages corpus ingestion.
#[derive(Parser, Debug)]
#[command(name = "fisco-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the SQLite database file.
    ///
    /// Defaults to `.fisco/fisco.db` in the current directory.
    #[arg(short, long, env = "FISCO_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the database schema.
    Init {
        /// Force re-initialization (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Show corpus statistics.
    Status,

    /// Re-ingest source documents.
    Reingest {
        /// What to re-ingest.
        #[command(subcommand)]
        target: ReingestTarget,
    },

    /// Ask a question and stream the grounded answer.
    Ask {
        /// The question, in natural language.
        question: String,

        /// Fiscal year the question refers to.
        #[arg(long, default_value_t = 2025)]
        ejercicio: i32,

        /// Tax regime framing (e.g. "General").
        #[arg(long)]
        regimen: Option<String>,

        /// Print the retrieval trace after the answer.
        #[arg(long)]
        trace: bool,
    },
}

/// Re-ingestion targets.
#[derive(Subcommand, Debug)]
pub enum ReingestTarget {
    /// Federal laws and regulations (article-first chunking).
    Laws {
        /// Directory holding the law PDFs.
        #[arg(long, default_value = "data/LEYES_FEDERALES")]
        base_path: PathBuf,

        /// Process every document in the baseline manifest.
        #[arg(long)]
        all: bool,

        /// Process only these document IDs (repeatable).
        #[arg(long = "doc")]
        doc: Vec<String>,

        /// Chunk and report counts without touching the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// RMF resolutions and annexes (rule-first chunking).
    Rmf {
        /// Directory holding the RMF PDFs.
        #[arg(long, default_value = "data/RMF")]
        base_path: PathBuf,

        /// Exercise year override when filenames carry none.
        #[arg(long)]
        year: Option<i32>,

        /// Chunk and report counts without touching the database.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::config::DEFAULT_DB_PATH))
    }
}
