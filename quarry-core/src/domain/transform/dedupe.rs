// quarry-core/src/domain/transform/dedupe.rs

use polars::prelude::*;
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::quality::gate::require_columns;

/// Keep one row per business key: the one with the latest timestamp.
///
/// Rows are stably sorted ascending by `ts_column` with nulls first, so a
/// row with a timestamp always beats a row without one. Among equal
/// timestamps the row that came later in the input wins. The surviving rows
/// are returned in that sorted order.
pub fn dedupe_keep_latest(
    df: &DataFrame,
    key_columns: &[&str],
    ts_column: &str,
) -> Result<DataFrame, DomainError> {
    let mut needed = key_columns.to_vec();
    needed.push(ts_column);
    require_columns(df, &needed)?;

    let subset: Vec<String> = key_columns.iter().map(|k| k.to_string()).collect();
    let out = df
        .clone()
        .lazy()
        .sort(
            [ts_column],
            SortMultipleOptions {
                descending: vec![false],
                nulls_last: false,
                maintain_order: true,
                ..Default::default()
            },
        )
        .unique_stable(Some(subset), UniqueKeepStrategy::Last)
        .collect()?;

    let dropped = df.height() - out.height();
    if dropped > 0 {
        info!(dropped, keys = ?key_columns, "duplicate keys collapsed");
    }
    Ok(out)
}
