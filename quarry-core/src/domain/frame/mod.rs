// quarry-core/src/domain/frame/mod.rs
//
// Small helpers over polars frames shared by the transforms and gates.
// Stages take a frame by value and hand back a new one; the caller's copy
// is never mutated behind its back.

pub mod coerce;

pub use coerce::Coerced;

use polars::prelude::*;

use crate::domain::error::DomainError;

/// Timestamps are naive UTC wall-clock readings at microsecond precision.
pub fn timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Microseconds, None)
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().contains(&name)
}

/// Column lookup that fails the same way `require_columns` does.
pub fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, DomainError> {
    df.column(name).map_err(|_| DomainError::Schema {
        missing: vec![name.to_string()],
    })
}

/// Replace the column with the same name, or append it.
pub fn put(mut df: DataFrame, series: Series) -> Result<DataFrame, DomainError> {
    df.with_column(series)?;
    Ok(df)
}

/// Text view of a column. Non-text columns are cast; nulls stay null.
pub fn text_view(series: &Series) -> Result<StringChunked, DomainError> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast.str()?.clone())
}

/// Numeric view of a column: finite numbers as `f64`, anything else null.
/// Text is parsed after trimming.
pub fn numeric_view(series: &Series) -> Result<Float64Chunked, DomainError> {
    let out: Float64Chunked = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(coerce::parse_f64))
            .collect(),
        dt if dt.is_numeric() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect(),
        _ => Float64Chunked::full_null(series.name(), series.len()),
    };
    Ok(out.with_name(series.name()))
}

/// Number of `true` values in a boolean column; 0 when absent.
pub fn count_true(df: &DataFrame, name: &str) -> usize {
    df.column(name)
        .ok()
        .and_then(|s| s.bool().ok())
        .map_or(0, |flags| flags.into_iter().filter(|v| *v == Some(true)).count())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_view_parses_and_drops_garbage() {
        let s = Series::new("amount", &[Some(" 12.5 "), Some("abc"), Some("NaN"), None]);
        let view = numeric_view(&s).unwrap();
        let values: Vec<Option<f64>> = view.into_iter().collect();
        assert_eq!(values, vec![Some(12.5), None, None, None]);

        let ints = Series::new("quantity", &[Some(3i64), None]);
        let values: Vec<Option<f64>> = numeric_view(&ints).unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(3.0), None]);
    }

    #[test]
    fn test_column_lookup_reports_schema_error() {
        let df = DataFrame::new(vec![Series::new("a", &["x"])]).unwrap();
        assert!(has_column(&df, "a"));
        assert!(matches!(
            column(&df, "b"),
            Err(DomainError::Schema { missing }) if missing == vec!["b"]
        ));
    }

    #[test]
    fn test_put_replaces_in_place() {
        let df = DataFrame::new(vec![Series::new("a", &["x"]), Series::new("b", &["y"])]).unwrap();
        let df = put(df, Series::new("a", &["z"])).unwrap();
        assert_eq!(df.get_column_names(), vec!["a", "b"]);
        assert_eq!(df.column("a").unwrap().str().unwrap().get(0), Some("z"));
    }
}
