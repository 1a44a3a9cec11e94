use super::{exit_on_err, load_config_or_exit};
use serde::Serialize;
use std::path::{Path, PathBuf};
use triage_store::{CategoryStore, StoreConfig};

pub struct Args {
    pub config: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub categories: Vec<String>,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitOutcome {
    pub store: PathBuf,
    pub created: bool,
    pub categories: Vec<String>,
    pub cases: usize,
}

pub fn init_store(path: &Path, config: StoreConfig) -> Result<InitOutcome, String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create store directory {}: {e}", parent.display()))?;
    }
    let created = !path.exists();

    let store = CategoryStore::initialize(path, config).map_err(|e| e.to_string())?;
    let snapshot = store.snapshot().map_err(|e| e.to_string())?;

    Ok(InitOutcome {
        store: path.to_path_buf(),
        created,
        categories: snapshot.category_names().map(str::to_string).collect(),
        cases: snapshot.total_cases(),
    })
}

pub fn run(args: Args) {
    let mut config = load_config_or_exit(args.config.as_ref());
    config.override_store_path(args.store);
    exit_on_err(config.override_categories(args.categories));

    let outcome = exit_on_err(init_store(&config.store.path, config.store.store_config()));

    if args.json {
        println!("{}", exit_on_err(serde_json::to_string_pretty(&outcome)));
        return;
    }
    println!("triage init");
    println!();
    println!("  store: {}", outcome.store.display());
    println!("  created: {}", if outcome.created { "yes" } else { "no" });
    println!("  categories: {}", outcome.categories.join(", "));
    println!("  cases: {}", outcome.cases);
}
