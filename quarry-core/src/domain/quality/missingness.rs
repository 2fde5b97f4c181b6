// quarry-core/src/domain/quality/missingness.rs

use polars::prelude::*;
use serde::Serialize;

use crate::domain::error::DomainError;
use crate::domain::frame::put;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingnessEntry {
    pub column: String,
    pub n_missing: usize,
    pub p_missing: f64,
}

/// Per-column null count and fraction, most-missing first.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MissingnessReport {
    pub rows: usize,
    pub entries: Vec<MissingnessEntry>,
}

impl MissingnessReport {
    pub fn get(&self, column: &str) -> Option<&MissingnessEntry> {
        self.entries.iter().find(|e| e.column == column)
    }

    /// Frame form, ready for a delimited-text writer.
    pub fn to_frame(&self) -> Result<DataFrame, DomainError> {
        let columns: Vec<&str> = self.entries.iter().map(|e| e.column.as_str()).collect();
        let counts: Vec<i64> = self.entries.iter().map(|e| e.n_missing as i64).collect();
        let fractions: Vec<f64> = self.entries.iter().map(|e| e.p_missing).collect();
        Ok(DataFrame::new(vec![
            Series::new("column", columns),
            Series::new("n_missing", counts),
            Series::new("p_missing", fractions),
        ])?)
    }

    /// Render as comma-separated text with a header line. Column names
    /// holding a comma, quote or line break are quoted.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("column,n_missing,p_missing\n");
        for e in &self.entries {
            out.push_str(&format!(
                "{},{},{}\n",
                csv_field(&e.column),
                e.n_missing,
                e.p_missing
            ));
        }
        out
    }
}

fn csv_field(raw: &str) -> std::borrow::Cow<'_, str> {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\"")).into()
    } else {
        raw.into()
    }
}

/// Read-only; an empty frame reports zero fractions.
pub fn missingness_report(df: &DataFrame) -> MissingnessReport {
    let rows = df.height();
    let mut entries: Vec<MissingnessEntry> = df
        .get_columns()
        .iter()
        .map(|s| {
            let n_missing = s.null_count();
            MissingnessEntry {
                column: s.name().to_string(),
                n_missing,
                p_missing: if rows == 0 {
                    0.0
                } else {
                    n_missing as f64 / rows as f64
                },
            }
        })
        .collect();
    // Stable: ties keep column order.
    entries.sort_by(|a, b| b.p_missing.total_cmp(&a.p_missing));
    MissingnessReport { rows, entries }
}

/// Add a `{column}__isna` flag for each listed column present in the frame.
pub fn add_missing_flags(df: DataFrame, columns: &[&str]) -> Result<DataFrame, DomainError> {
    let mut out = df;
    for name in columns {
        let Ok(series) = out.column(name) else {
            continue;
        };
        let flags = series.is_null().with_name(&format!("{name}__isna")).into_series();
        out = put(out, flags)?;
    }
    Ok(out)
}
