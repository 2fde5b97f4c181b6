// quarry/src/commands/report.rs
//
// USE CASE: Missingness report of any table file.

use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Table as AsciiTable};
use std::path::PathBuf;

use quarry_core::domain::quality::{MissingnessReport, missingness_report};
use quarry_core::infrastructure::adapters::DuckDbTableStore;
use quarry_core::ports::TableStore;

use crate::cli::ReportFormat;

pub async fn execute(input: PathBuf, format: ReportFormat) -> anyhow::Result<()> {
    let store = DuckDbTableStore::in_memory().context("Failed to initialize DuckDB")?;
    let df = store
        .read_table(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let report = missingness_report(&df);

    match format {
        ReportFormat::Table => {
            println!("\n📊 Missingness: {} ({} rows)", input.display(), report.rows);
            println!("{}", render(&report));
        }
        ReportFormat::Csv => print!("{}", report.to_csv()),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn render(report: &MissingnessReport) -> AsciiTable {
    let mut out = AsciiTable::new();
    out.load_preset(UTF8_FULL)
        .set_header(vec!["column", "n_missing", "p_missing"]);
    for e in &report.entries {
        out.add_row(vec![
            Cell::new(&e.column),
            Cell::new(e.n_missing),
            Cell::new(format!("{:.2}%", e.p_missing * 100.0)),
        ]);
    }
    out
}
