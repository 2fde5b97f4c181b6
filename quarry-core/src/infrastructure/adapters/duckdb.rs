// quarry-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::{TimeUnit as DbTimeUnit, Value as DbValue};
use duckdb::{Config, Connection, appender_params_from_iter};
use polars::prelude::{DataFrame, DataType, NamedFrom, Series};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::domain::frame::timestamp_dtype;
use crate::error::QuarryError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::infrastructure::fs::{promote, staging_path};
use crate::ports::table_store::TableStore;

const READ_STAGE: &str = "__quarry_in";
const WRITE_STAGE: &str = "__quarry_out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, InfrastructureError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("parquet") => Ok(TableFormat::Parquet),
            _ => Err(InfrastructureError::UnsupportedFormat(
                path.display().to_string(),
            )),
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "''"))
}

/// Reads CSV and Parquet files through DuckDB and writes tables back out.
///
/// Every column comes back as text: typing is the pipeline's job, so what
/// DuckDB would have guessed never leaks into the data.
pub struct DuckDbTableStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbTableStore {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, QuarryError> {
        self.conn.lock().map_err(|_| {
            QuarryError::Infrastructure(InfrastructureError::Database(DatabaseError::Poisoned))
        })
    }
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>, InfrastructureError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info('{}')", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>("name"))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

fn read_blocking(conn: &Connection, path: &Path) -> Result<DataFrame, QuarryError> {
    if !path.exists() {
        return Err(InfrastructureError::FileNotFound(path.display().to_string()).into());
    }
    let source = match TableFormat::from_path(path)? {
        TableFormat::Csv => format!(
            "read_csv_auto({}, all_varchar = true, header = true)",
            quote_literal(path)
        ),
        TableFormat::Parquet => format!("read_parquet({})", quote_literal(path)),
    };
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {} AS SELECT * FROM {}",
        quote_ident(READ_STAGE),
        source
    ))?;

    let names = column_names(conn, READ_STAGE)?;
    let select = names
        .iter()
        .map(|n| format!("CAST({} AS VARCHAR)", quote_ident(n)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    if !names.is_empty() {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {}",
            select,
            quote_ident(READ_STAGE)
        ))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(row.get(i)?);
            }
        }
    }
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(READ_STAGE)))?;

    let columns: Vec<Series> = names
        .iter()
        .zip(cells)
        .map(|(name, values)| Series::new(name, values))
        .collect();
    DataFrame::new(columns).map_err(|e| InfrastructureError::from(e).into())
}

fn sql_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean => "BOOLEAN",
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => "BIGINT",
        DataType::Float32 | DataType::Float64 => "DOUBLE",
        DataType::Date => "DATE",
        DataType::Datetime(_, _) => "TIMESTAMP",
        _ => "VARCHAR",
    }
}

/// DuckDB values for one column, matching `sql_type`.
fn db_values(series: &Series) -> Result<Vec<DbValue>, InfrastructureError> {
    let or_null = |v: Option<DbValue>| v.unwrap_or(DbValue::Null);
    let values = match sql_type(series.dtype()) {
        "BOOLEAN" => series
            .bool()?
            .into_iter()
            .map(|v| or_null(v.map(DbValue::Boolean)))
            .collect(),
        "BIGINT" => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| or_null(v.map(DbValue::BigInt)))
            .collect(),
        "DOUBLE" => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| or_null(v.map(DbValue::Double)))
            .collect(),
        "DATE" => series
            .to_physical_repr()
            .i32()?
            .into_iter()
            .map(|v| or_null(v.map(DbValue::Date32)))
            .collect(),
        "TIMESTAMP" => series
            .cast(&timestamp_dtype())?
            .to_physical_repr()
            .i64()?
            .into_iter()
            .map(|v| or_null(v.map(|us| DbValue::Timestamp(DbTimeUnit::Microsecond, us))))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| or_null(v.map(|s| DbValue::Text(s.to_string()))))
            .collect(),
    };
    Ok(values)
}

fn write_blocking(conn: &Connection, df: &DataFrame, path: &Path) -> Result<(), InfrastructureError> {
    let copy_options = match TableFormat::from_path(path)? {
        TableFormat::Csv => "(FORMAT CSV, HEADER)",
        TableFormat::Parquet => "(FORMAT PARQUET)",
    };
    if df.width() == 0 {
        return Err(InfrastructureError::ConfigError(format!(
            "refusing to write a table without columns to {}",
            path.display()
        )));
    }

    let ddl = df
        .get_columns()
        .iter()
        .map(|s| format!("{} {}", quote_ident(s.name()), sql_type(s.dtype())))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {} ({})",
        quote_ident(WRITE_STAGE),
        ddl
    ))?;

    let columns = df
        .get_columns()
        .iter()
        .map(db_values)
        .collect::<Result<Vec<_>, _>>()?;
    {
        let mut appender = conn.appender(WRITE_STAGE)?;
        for row in 0..df.height() {
            let values = columns.iter().map(|c| c[row].clone());
            appender.append_row(appender_params_from_iter(values))?;
        }
        appender.flush()?;
    }

    let staged = staging_path(path)?;
    let copied = conn.execute_batch(&format!(
        "COPY {} TO {} {}",
        quote_ident(WRITE_STAGE),
        quote_literal(&staged),
        copy_options
    ));
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(WRITE_STAGE)))?;
    if let Err(e) = copied {
        let _ = std::fs::remove_file(&staged);
        return Err(e.into());
    }
    promote(&staged, path)
}

#[async_trait]
impl TableStore for DuckDbTableStore {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn read_table(&self, path: &Path) -> Result<DataFrame, QuarryError> {
        let conn = self.lock()?;
        let df = read_blocking(&conn, path)?;
        debug!(rows = df.height(), columns = df.width(), "table read");
        Ok(df)
    }

    #[instrument(skip(self, df), fields(path = %path.display(), rows = df.height()))]
    async fn write_table(&self, df: &DataFrame, path: &Path) -> Result<(), QuarryError> {
        let conn = self.lock()?;
        write_blocking(&conn, df, path)?;
        debug!("table written");
        Ok(())
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::frame::coerce::to_micros;
    use anyhow::Result;
    use chrono::NaiveDate;
    use polars::prelude::{Int32Chunked, Int64Chunked, IntoSeries, NewChunkedArray, TimeUnit};
    use tempfile::tempdir;

    fn texts(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_csv_reads_as_text_with_nulls() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "order_id,amount,status\no1,10.5,Paid\no2,,refund\n")?;

        let store = DuckDbTableStore::in_memory()?;
        let df = store.read_table(&path).await?;

        assert_eq!(df.get_column_names(), vec!["order_id", "amount", "status"]);
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("amount")?.dtype(), &DataType::String);
        assert_eq!(texts(&df, "amount"), vec![Some("10.5".to_string()), None]);
        Ok(())
    }

    #[tokio::test]
    async fn test_parquet_round_trip_keeps_columns_and_nulls() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("processed").join("out.parquet");
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let created = Int64Chunked::from_slice_options("created_at", &[Some(to_micros(ts)), None])
            .into_datetime(TimeUnit::Microseconds, None)
            .into_series();
        let df = DataFrame::new(vec![
            Series::new("order_id", &["o1", "o2"]),
            Series::new("amount", &[Some(12.5), None]),
            created,
            Series::new("flag", &[true, false]),
        ])?;

        let store = DuckDbTableStore::in_memory()?;
        store.write_table(&df, &path).await?;
        assert!(path.exists());

        let back = store.read_table(&path).await?;
        assert_eq!(back.get_column_names(), df.get_column_names());
        assert_eq!(back.height(), 2);
        assert_eq!(texts(&back, "amount"), vec![Some("12.5".to_string()), None]);
        assert_eq!(texts(&back, "flag")[0].as_deref(), Some("true"));
        assert!(texts(&back, "created_at")[0].as_deref().unwrap().starts_with("2024-03-01 10:30:00"));
        // No staging files left next to the output.
        assert_eq!(std::fs::read_dir(path.parent().unwrap())?.count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_csv_write_quotes_and_dates() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.csv");
        let days = Int32Chunked::from_slice_options("date", &[Some(0), None]).into_date().into_series();
        let df = DataFrame::new(vec![
            Series::new("column", &["a,b", "c"]),
            Series::new("n", &[1i64, 2]),
            days,
        ])?;

        let store = DuckDbTableStore::in_memory()?;
        store.write_table(&df, &path).await?;
        let written = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "column,n,date");
        assert_eq!(lines[1], "\"a,b\",1,1970-01-01");
        assert_eq!(lines[2], "c,2,");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let store = DuckDbTableStore::in_memory()?;
        let err = store
            .read_table(&dir.path().join("nope.csv"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Infrastructure(InfrastructureError::FileNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a/b.CSV")).unwrap(), TableFormat::Csv);
        assert_eq!(
            TableFormat::from_path(Path::new("x.parquet")).unwrap(),
            TableFormat::Parquet
        );
        assert!(TableFormat::from_path(Path::new("x.json")).is_err());
    }
}
