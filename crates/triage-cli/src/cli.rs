use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use triage_store::{DuplicatePolicy, UnknownCategoryPolicy};

#[derive(Parser)]
#[command(
    name = "triage",
    about = "Triage: durable, deduplicating intake for categorized emergency-call cases",
    version
)]
pub struct Cli {
    /// Log filter (trace, debug, info, warn, error, or a full directive).
    /// RUST_LOG takes precedence when set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// TOML configuration file; command-line flags override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the store file with empty categories (idempotent)
    Init {
        /// Path to the store file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Recognised category (repeatable; replaces the configured set)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP ingestion server
    Serve {
        /// Path to the store file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Listen address
        #[arg(long)]
        bind: Option<String>,

        /// Recognised category (repeatable; replaces the configured set)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// What to do with a case whose number is already stored
        #[arg(long, value_enum)]
        duplicate_policy: Option<DuplicatePolicyArg>,

        /// What to do with a batch entry for an unrecognised category
        #[arg(long, value_enum)]
        unknown_category: Option<UnknownCategoryArg>,
    },

    /// Poll the store file and print a summary on every change
    Watch {
        /// Path to the store file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Consecutive failed reads tolerated before giving up (0 = never give up)
        #[arg(long)]
        max_read_failures: Option<u32>,

        /// Print one JSON view per line instead of a text summary
        #[arg(long)]
        json: bool,
    },

    /// Print the current view of the store file once
    Show {
        /// Path to the store file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicatePolicyArg {
    FirstWriteWins,
    LastWriteWins,
}

impl From<DuplicatePolicyArg> for DuplicatePolicy {
    fn from(arg: DuplicatePolicyArg) -> Self {
        match arg {
            DuplicatePolicyArg::FirstWriteWins => Self::FirstWriteWins,
            DuplicatePolicyArg::LastWriteWins => Self::LastWriteWins,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnknownCategoryArg {
    Reject,
    Ignore,
}

impl From<UnknownCategoryArg> for UnknownCategoryPolicy {
    fn from(arg: UnknownCategoryArg) -> Self {
        match arg {
            UnknownCategoryArg::Reject => Self::Reject,
            UnknownCategoryArg::Ignore => Self::Ignore,
        }
    }
}
