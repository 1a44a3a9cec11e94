use super::show::print_view;
use super::{exit_on_err, load_config_or_exit, shutdown_signal};
use chrono::{SecondsFormat, Utc};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use triage_store::Snapshot;
use triage_watch::{ChangeDetectingReader, DashboardView, FileSource, watch};

pub struct Args {
    pub config: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub interval_ms: Option<u64>,
    pub max_read_failures: Option<u32>,
    pub json: bool,
}

pub fn run(args: Args) {
    let mut config = load_config_or_exit(args.config.as_ref());
    config.override_store_path(args.store);
    if let Some(interval_ms) = args.interval_ms {
        config.watch.interval_ms = interval_ms;
    }
    if let Some(max) = args.max_read_failures {
        config.watch.max_read_failures = max;
    }
    let interval = exit_on_err(config.watch.interval());

    let source = FileSource::new(&config.store.path);
    let mut reader = ChangeDetectingReader::new(source)
        .with_max_consecutive_failures(config.watch.failure_ceiling());

    if !args.json {
        println!("triage watch");
        println!("  store: {}", config.store.path.display());
        println!("  interval: {}ms", interval.as_millis());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });

    let json = args.json;
    let on_change = |snapshot: &Arc<Snapshot>| {
        let view = DashboardView::from_snapshot(snapshot);
        if json {
            match serde_json::to_string(&view) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to encode view"),
            }
        } else {
            println!();
            println!("[{}]", Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
            print_view(&view);
        }
    };
    let result = runtime.block_on(async {
        let shutdown = shutdown_signal();
        watch(&mut reader, interval, on_change, shutdown).await
    });

    match result {
        Ok(polls) => tracing::info!(polls, "watch stopped"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
