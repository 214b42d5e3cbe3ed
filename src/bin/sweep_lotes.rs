// Re-check every open lote and mark the ones whose units are all in stock as CORTADO.
//
// Usage:
//   cargo run --bin sweep_lotes -- [db_path]
//
// Safe to run repeatedly (e.g. from cron): lotes already CORTADO are left untouched.

use anyhow::Context;
use pu_stock::app::{get_default_db_path, AppState};
use pu_stock::logging;

fn main() -> anyhow::Result<()> {
    logging::init();
    pu_stock::i18n::init_from_env();

    let db_path = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);

    let state = AppState::new(db_path.clone())
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("failed to open database at {}", db_path))?;
    let completed = state
        .storage_api
        .sweep_lote_statuses()
        .context("lote sweep failed")?;

    for id_lote in &completed {
        println!("{}", pu_stock::i18n::t_with_args("lote.completed", &[("id", id_lote)]));
    }
    println!("completed={}", completed.len());
    Ok(())
}
