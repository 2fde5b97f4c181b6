// quarry/src/commands/run.rs
//
// USE CASE: Run the full ETL.

use anyhow::Context;
use std::path::PathBuf;

use quarry_core::QuarryError;
use quarry_core::application::run_etl;
use quarry_core::infrastructure::adapters::DuckDbTableStore;

pub async fn execute(project_dir: PathBuf, config: Option<PathBuf>) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let config = super::load_config(&project_dir, config.as_ref())?;
    println!("   Pipeline: {}", config.name);

    // B. Instantiate the table I/O adapter
    let store = DuckDbTableStore::in_memory().context("Failed to initialize DuckDB")?;

    // C. Run the Pipeline (Application Layer)
    match run_etl(&store, &config, &project_dir).await {
        Ok(run) => {
            let meta = &run.metadata;
            println!(
                "   Orders: {} raw -> {} clean ({} duplicates dropped)",
                meta.rows_in_orders_raw, meta.rows_out_orders_clean, meta.duplicates_dropped
            );
            println!(
                "   Analytics: {} rows, join match rate {:.1}%",
                meta.rows_out_analytics,
                meta.join_match_rate * 100.0
            );
            println!("   Outputs: {}", run.outputs.analytics.display());
            println!("\n✨ SUCCESS! Pipeline finished in {:.2?}", start.elapsed());
            Ok(())
        }
        Err(e) => {
            report_failure(e);
            std::process::exit(1);
        }
    }
}

/// Quality gate failures get the full diagnostic; everything else a one-liner.
pub(crate) fn report_failure(err: QuarryError) {
    if err.is_data_quality() {
        eprintln!("\n❌ QUALITY GATE FAILED. No output was written.");
    } else {
        eprintln!("\n💥 CRITICAL PIPELINE ERROR");
    }
    match err {
        QuarryError::Domain(e) => eprintln!("{:?}", miette::Report::new(e)),
        QuarryError::Infrastructure(e) => eprintln!("{:?}", miette::Report::new(e)),
    }
}
