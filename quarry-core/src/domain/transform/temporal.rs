// quarry-core/src/domain/transform/temporal.rs

use chrono::{Datelike, NaiveDateTime, Timelike};
use polars::prelude::*;
use tracing::warn;

use crate::domain::error::DomainError;
use crate::domain::frame::coerce::{self, Coerced};
use crate::domain::frame::{column, put, text_view, timestamp_dtype};

/// Names of the columns `add_time_parts` derives.
pub const TIME_PART_COLUMNS: [&str; 5] = ["date", "year", "month", "dow", "hour"];

/// Parse `column` into UTC timestamps in place. Malformed values become null.
pub fn parse_datetime(df: DataFrame, name: &str, utc: bool) -> Result<DataFrame, DomainError> {
    let source = column(&df, name)?;
    if matches!(source.dtype(), DataType::Datetime(_, _) | DataType::Date) {
        let cast = source.cast(&timestamp_dtype())?;
        return put(df, cast);
    }

    let mut invalid = 0usize;
    let micros: Int64Chunked = text_view(source)?
        .into_iter()
        .map(|v| coerce::to_timestamp(v, utc).tally(&mut invalid).map(coerce::to_micros))
        .collect();
    if invalid > 0 {
        warn!(column = name, invalid, "unparseable timestamps set to null");
    }

    let parsed = micros
        .with_name(name)
        .into_datetime(TimeUnit::Microseconds, None)
        .into_series();
    put(df, parsed)
}

/// Timestamps of a column as wall-clock readings. Text is parsed as UTC.
fn timestamps(series: &Series) -> Result<Vec<Option<NaiveDateTime>>, DomainError> {
    if matches!(series.dtype(), DataType::Datetime(_, _) | DataType::Date) {
        let physical = series.cast(&timestamp_dtype())?.to_physical_repr().into_owned();
        return Ok(physical
            .i64()?
            .into_iter()
            .map(|v| v.and_then(coerce::from_micros).map(|t| t.naive_utc()))
            .collect());
    }
    Ok(text_view(series)?
        .into_iter()
        .map(|v| match coerce::to_timestamp(v, true) {
            Coerced::Valid(ts) => Some(ts),
            _ => None,
        })
        .collect())
}

/// Derive calendar parts from a timestamp column: `date`, `year`, `month`,
/// `dow` (full weekday name) and `hour`. Null timestamps give null parts.
pub fn add_time_parts(df: DataFrame, ts_column: &str) -> Result<DataFrame, DomainError> {
    let ts = timestamps(column(&df, ts_column)?)?;

    let ints = |name: &str, f: &dyn Fn(&NaiveDateTime) -> i64| {
        ts.iter()
            .map(|t| t.as_ref().map(f))
            .collect::<Int64Chunked>()
            .with_name(name)
            .into_series()
    };

    let date = ts
        .iter()
        .map(|t| t.map(|t| coerce::to_epoch_days(t.date())))
        .collect::<Int32Chunked>()
        .with_name("date")
        .into_date()
        .into_series();
    let dow = ts
        .iter()
        .map(|t| t.map(|t| t.format("%A").to_string()))
        .collect::<StringChunked>()
        .with_name("dow")
        .into_series();

    let mut out = df;
    for part in [
        date,
        ints("year", &|t| i64::from(t.year())),
        ints("month", &|t| i64::from(t.month())),
        dow,
        ints("hour", &|t| i64::from(t.hour())),
    ] {
        out = put(out, part)?;
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn events() -> DataFrame {
        DataFrame::new(vec![Series::new(
            "created_at",
            &[Some("2024-01-01T23:15:00Z"), Some("garbage"), None, Some("2024-03-09 07:00:00")],
        )])
        .unwrap()
    }

    #[test]
    fn test_parse_datetime_nulls_garbage() {
        let df = parse_datetime(events(), "created_at", true).unwrap();
        let s = df.column("created_at").unwrap();
        assert_eq!(s.dtype(), &timestamp_dtype());
        assert_eq!(s.null_count(), 2);
    }

    #[test]
    fn test_parse_datetime_missing_column() {
        let res = parse_datetime(events(), "updated_at", true);
        assert!(matches!(res, Err(DomainError::Schema { .. })));
    }

    #[test]
    fn test_time_parts() {
        let df = parse_datetime(events(), "created_at", true).unwrap();
        let df = add_time_parts(df, "created_at").unwrap();

        let int = |name: &str, row: usize| df.column(name).unwrap().i64().unwrap().get(row);
        let dow = |row: usize| df.column("dow").unwrap().str().unwrap().get(row).map(str::to_string);

        let date = df.column("date").unwrap();
        assert_eq!(date.dtype(), &DataType::Date);
        let day0 = date.to_physical_repr().i32().unwrap().get(0);
        assert_eq!(
            day0,
            Some(coerce::to_epoch_days(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
        );
        assert_eq!(int("year", 0), Some(2024));
        assert_eq!(int("month", 3), Some(3));
        assert_eq!(dow(0).as_deref(), Some("Monday"));
        assert_eq!(dow(3).as_deref(), Some("Saturday"));
        assert_eq!(int("hour", 0), Some(23));
        for name in TIME_PART_COLUMNS {
            let s = df.column(name).unwrap();
            assert!(s.get(1).unwrap().is_null(), "{name}");
            assert!(s.get(2).unwrap().is_null(), "{name}");
        }
    }
}
