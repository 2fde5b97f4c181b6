// quarry/src/commands/stage.rs
//
// USE CASE: Run one stage (load | clean | analytics).

use anyhow::Context;
use std::path::PathBuf;

use quarry_core::application::{Stage, run_stage};
use quarry_core::infrastructure::adapters::DuckDbTableStore;

pub async fn execute(
    stage: Stage,
    project_dir: PathBuf,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let config = super::load_config(&project_dir, config.as_ref())?;
    let store = DuckDbTableStore::in_memory().context("Failed to initialize DuckDB")?;

    println!("🪜 Stage '{}'...", stage);
    match run_stage(&store, &config, &project_dir, stage).await {
        Ok(meta) => {
            for (label, rows) in &meta.rows {
                println!("   {}: {}", label, rows);
            }
            for (label, path) in &meta.outputs {
                println!("   ➜ {} -> {}", label, path);
            }
            println!("\n✨ Stage '{}' finished in {:.2?}", stage, start.elapsed());
            Ok(())
        }
        Err(e) => {
            super::run::report_failure(e);
            std::process::exit(1);
        }
    }
}
