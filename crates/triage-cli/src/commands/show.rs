use super::{exit_on_err, load_config_or_exit};
use std::path::PathBuf;
use triage_store::read_snapshot_from_path;
use triage_watch::DashboardView;

pub fn run(config: Option<PathBuf>, store: Option<PathBuf>, json: bool) {
    let mut config = load_config_or_exit(config.as_ref());
    config.override_store_path(store);

    let snapshot = exit_on_err(read_snapshot_from_path(&config.store.path));
    let view = DashboardView::from_snapshot(&snapshot);

    if json {
        println!("{}", exit_on_err(serde_json::to_string_pretty(&view)));
        return;
    }
    print_view(&view);
}

/// Text rendering shared with `watch`.
pub fn print_view(view: &DashboardView) {
    println!("{}", view.headline());
    for row in &view.rows {
        println!(
            "  [{}] {} #{} {} | {} | {} | {}",
            row.category,
            row.case.open_status,
            row.case.stack_rank,
            row.case.case_number,
            row.case.location,
            row.case.dispatch,
            row.case.situation
        );
    }
}
