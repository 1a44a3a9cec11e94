//! Triage CLI: the `triage` command.

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.config;
    match cli.command {
        Commands::Init {
            store,
            categories,
            json,
        } => commands::init::run(commands::init::Args {
            config,
            store,
            categories,
            json,
        }),

        Commands::Serve {
            store,
            bind,
            categories,
            duplicate_policy,
            unknown_category,
        } => commands::serve::run(commands::serve::Args {
            config,
            store,
            bind,
            categories,
            duplicate_policy,
            unknown_category,
        }),

        Commands::Watch {
            store,
            interval_ms,
            max_read_failures,
            json,
        } => commands::watch::run(commands::watch::Args {
            config,
            store,
            interval_ms,
            max_read_failures,
            json,
        }),

        Commands::Show { store, json } => commands::show::run(config, store, json),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
