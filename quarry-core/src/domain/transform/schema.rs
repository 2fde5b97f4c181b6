// quarry-core/src/domain/transform/schema.rs

use polars::prelude::*;
use tracing::{debug, warn};

use crate::domain::error::DomainError;
use crate::domain::frame::coerce;
use crate::domain::frame::{text_view, timestamp_dtype};

/// Canonical order columns, in output order.
pub const ORDER_COLUMNS: &[&str] = &[
    "order_id",
    "user_id",
    "amount",
    "quantity",
    "created_at",
    "status",
];

/// Canonical order columns and the type each one is forced to.
pub fn order_schema() -> Vec<(&'static str, DataType)> {
    vec![
        ("order_id", DataType::String),
        ("user_id", DataType::String),
        ("amount", DataType::Float64),
        ("quantity", DataType::Int64),
        ("created_at", timestamp_dtype()),
        ("status", DataType::String),
    ]
}

/// Coerce the order columns to their canonical types.
///
/// Values that cannot be converted become null. Schema columns that are
/// absent stay absent; other columns are untouched.
pub fn enforce_schema(df: DataFrame) -> Result<DataFrame, DomainError> {
    let mut out = df;
    for (name, dtype) in order_schema() {
        let Ok(series) = out.column(name) else {
            debug!(column = name, "column absent, schema skipped");
            continue;
        };
        let (cast, invalid) = cast_column(series, &dtype)?;
        if invalid > 0 {
            warn!(column = name, invalid, "values coerced to null");
        }
        out.with_column(cast)?;
    }
    Ok(out)
}

/// Cast a column to `dtype`, returning the new column and how many present
/// values had to be nulled.
pub fn cast_column(series: &Series, dtype: &DataType) -> Result<(Series, usize), DomainError> {
    if series.dtype() == dtype {
        return Ok((series.clone(), 0));
    }
    let name = series.name();
    let native = matches!(
        (series.dtype(), dtype),
        (_, DataType::String)
            | (DataType::Date | DataType::Datetime(_, _), DataType::Datetime(_, _))
            | (DataType::Datetime(_, _), DataType::Date)
    ) || (series.dtype().is_numeric() && *dtype == DataType::Float64);

    let cast = if native {
        series.cast(dtype)?
    } else {
        let text = text_view(series)?;
        let mut invalid = 0;
        let parsed = match dtype {
            DataType::Float64 => text
                .into_iter()
                .map(|v| coerce::to_float(v).tally(&mut invalid))
                .collect::<Float64Chunked>()
                .with_name(name)
                .into_series(),
            DataType::Int64 => text
                .into_iter()
                .map(|v| coerce::to_int(v).tally(&mut invalid))
                .collect::<Int64Chunked>()
                .with_name(name)
                .into_series(),
            DataType::Boolean => text
                .into_iter()
                .map(|v| coerce::to_bool(v).tally(&mut invalid))
                .collect::<BooleanChunked>()
                .with_name(name)
                .into_series(),
            DataType::Datetime(unit, tz) => text
                .into_iter()
                .map(|v| coerce::to_timestamp(v, true).tally(&mut invalid).map(coerce::to_micros))
                .collect::<Int64Chunked>()
                .with_name(name)
                .into_datetime(TimeUnit::Microseconds, None)
                .into_series()
                .cast(&DataType::Datetime(*unit, tz.clone()))?,
            DataType::Date => text
                .into_iter()
                .map(|v| coerce::to_date(v).tally(&mut invalid).map(coerce::to_epoch_days))
                .collect::<Int32Chunked>()
                .with_name(name)
                .into_date()
                .into_series(),
            other => series.cast(other)?,
        };
        return Ok((parsed, invalid));
    };
    let invalid = cast.null_count().saturating_sub(series.null_count());
    Ok((cast, invalid))
}
