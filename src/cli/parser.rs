//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. Every subcommand maps
//! to exactly one public library entry point (`Pipeline::ingest`,
//! `Router::query`, `drift::run`, `purge::run`) against the `SQLite`
//! reference store — a thin harness, not a reimplementation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// brochure-kb: hybrid structured/semantic retrieval over per-tenant,
/// multi-campaign product brochures.
#[derive(Parser, Debug)]
#[command(name = "brochure-kb")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the `SQLite` database file.
    ///
    /// Defaults to `.brochure-kb/brochure-kb.db` in the current directory.
    #[arg(short, long, env = "BROCHURE_KB_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a Markdown brochure for a tenant/product/campaign-variant.
    Ingest {
        /// Tenant name. Resolved to a stable tenant id; repeated calls with
        /// the same name address the same tenant.
        tenant: String,

        /// Product name, scoped to the tenant.
        product: String,

        /// Path to the Markdown brochure document.
        file: PathBuf,

        /// Campaign locale.
        #[arg(long, default_value = "en-US")]
        locale: String,

        /// Campaign trim.
        #[arg(long, default_value = "base")]
        trim: String,

        /// Campaign market.
        #[arg(long, default_value = "US")]
        market: String,

        /// Source document identifier recorded on lineage events. Defaults
        /// to the input file's path.
        #[arg(long)]
        source_doc: Option<String>,

        /// Operator name recorded on lineage events.
        #[arg(long, default_value = "cli")]
        operator: String,

        /// Embedding dimension for the reference hash embedder.
        #[arg(long, default_value_t = crate::DEFAULT_DIMENSION)]
        dimension: usize,
    },

    /// Answer a natural-language question against a tenant's knowledge base.
    Query {
        /// Tenant name.
        tenant: String,

        /// The question to ask.
        question: String,

        /// Restrict to these product names. May be repeated.
        #[arg(long = "product")]
        products: Vec<String>,

        /// Maximum semantic chunks to return.
        #[arg(long)]
        max_chunks: Option<usize>,

        /// Embedding dimension for the reference hash embedder.
        #[arg(long, default_value_t = crate::DEFAULT_DIMENSION)]
        dimension: usize,
    },

    /// Run drift detection (stale campaigns, hash mismatches, embedding-version mixes).
    Drift {
        /// Tenant name.
        tenant: String,
    },

    /// Purge rows past the tenant's retention window.
    Purge {
        /// Tenant name.
        tenant: String,

        /// Compute counts without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}
