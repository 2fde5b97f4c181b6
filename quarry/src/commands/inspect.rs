// quarry/src/commands/inspect.rs
//
// USE CASE: Inspect a CSV or parquet file (columns + sample rows).

use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table as AsciiTable;
use polars::prelude::{DataType, Series};
use std::path::PathBuf;

use quarry_core::infrastructure::adapters::DuckDbTableStore;
use quarry_core::ports::TableStore;

pub async fn execute(input: PathBuf, limit: usize) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!(
            "❌ File not found: {}\n👉 Have you run 'quarry run'?",
            input.display()
        );
    }

    let store = DuckDbTableStore::in_memory().context("Failed to initialize DuckDB")?;
    let df = store
        .read_table(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    println!("\n🔍 Inspecting: '{}'", input.display());
    println!(
        "   {} rows x {} columns: [{}]",
        df.height(),
        df.width(),
        df.get_column_names().join(", ")
    );
    println!("   --- Rows (Limit {}) ---", limit);

    let text = df
        .get_columns()
        .iter()
        .map(|s| s.cast(&DataType::String))
        .collect::<Result<Vec<Series>, _>>()?;
    let mut out = AsciiTable::new();
    out.load_preset(UTF8_FULL).set_header(df.get_column_names());
    for row in 0..df.height().min(limit) {
        out.add_row(text.iter().map(|s| {
            s.str()
                .ok()
                .and_then(|ca| ca.get(row))
                .unwrap_or("null")
                .to_string()
        }));
    }
    println!("{}", out);
    Ok(())
}
