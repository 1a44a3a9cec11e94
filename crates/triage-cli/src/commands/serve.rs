use super::{exit_on_err, load_config_or_exit, shutdown_signal};
use crate::cli::{DuplicatePolicyArg, UnknownCategoryArg};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use triage_store::CategoryStore;

pub struct Args {
    pub config: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub bind: Option<String>,
    pub categories: Vec<String>,
    pub duplicate_policy: Option<DuplicatePolicyArg>,
    pub unknown_category: Option<UnknownCategoryArg>,
}

pub fn run(args: Args) {
    let mut config = load_config_or_exit(args.config.as_ref());
    config.override_store_path(args.store);
    exit_on_err(config.override_categories(args.categories));
    exit_on_err(config.override_bind(args.bind));
    if let Some(policy) = args.duplicate_policy {
        config.store.duplicates = policy.into();
    }
    if let Some(policy) = args.unknown_category {
        config.store.unknown_categories = policy.into();
    }

    let store = exit_on_err(CategoryStore::initialize(
        &config.store.path,
        config.store.store_config(),
    ));
    let store = Arc::new(store);
    let categories: Vec<&str> = store.categories().iter().collect();

    println!("triage serve");
    println!("  bind: {}", config.server.bind);
    println!("  store: {}", store.path().display());
    println!("  categories: {}", categories.join(", "));
    println!("  duplicates: {:?}", store.policy().duplicates);
    println!("  unknown categories: {:?}", store.policy().unknown_categories);
    println!("  routes:");
    println!("    POST /webhook");
    println!("    GET /healthz");
    println!("    GET /snapshot");
    println!("    GET /summary");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });

    // The store (and its writer lock) is dropped before any exit below.
    let result = runtime.block_on(async move {
        let shutdown = shutdown_signal();
        triage_ingest::serve(&config.server, store, shutdown).await
    });
    if let Err(e) = result {
        eprintln!("error: ingestion server failed: {e}");
        process::exit(1);
    }
}
