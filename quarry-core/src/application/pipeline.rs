// quarry-core/src/application/pipeline.rs
//
// Orders/users ETL: validate raw → clean → validate clean → dedupe → join →
// metadata. `transform` is in-memory only; `run_etl` wraps it with I/O and
// writes nothing unless the whole transform succeeded.

use chrono::{SecondsFormat, Utc};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::frame::{count_true, has_column, put, text_view};
use crate::domain::join::{JoinValidation, safe_left_join};
use crate::domain::project::{PipelineConfig, RunMetadata};
use crate::domain::quality::{
    MissingnessReport, add_missing_flags, assert_in_range, assert_non_empty, assert_unique_key,
    missingness_report, require_columns,
};
use crate::domain::transform::schema::cast_column;
use crate::domain::transform::{
    add_outlier_flag, add_time_parts, apply_mapping, dedupe_keep_latest, enforce_schema,
    normalize_text, parse_datetime, winsorize,
};
use crate::error::QuarryError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::{StagedOutputs, atomic_write};
use crate::ports::table_store::TableStore;

pub const ORDER_KEY: &str = "order_id";
pub const USER_KEY: &str = "user_id";
pub const CREATED_AT: &str = "created_at";

pub const ORDERS_CLEAN_FILE: &str = "orders_clean.parquet";
pub const USERS_CLEAN_FILE: &str = "users.parquet";
pub const ANALYTICS_FILE: &str = "analytics_table.parquet";
pub const RUN_META_FILE: &str = "_run_meta.json";
pub const MISSINGNESS_FILE: &str = "missingness_orders.csv";

/// Everything one run produces, ready to be persisted.
#[derive(Debug, Clone)]
pub struct RunBundle {
    pub orders_clean: DataFrame,
    pub users_clean: DataFrame,
    pub analytics: DataFrame,
    pub metadata: RunMetadata,
    pub missingness: MissingnessReport,
}

/// Orders after cleaning, plus what the cleaning had to tolerate.
#[derive(Debug, Clone)]
pub struct CleanedOrders {
    pub table: DataFrame,
    pub invalid_created_at: usize,
    pub status_unexpected: usize,
}

/// Where `run_etl` put its files.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutputs {
    pub orders_clean: PathBuf,
    pub users_clean: PathBuf,
    pub analytics: PathBuf,
    pub metadata: PathBuf,
    pub missingness: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EtlRun {
    pub metadata: RunMetadata,
    pub outputs: RunOutputs,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Gates applied to the raw extracts before anything is cleaned.
    pub fn validate_raw(&self, orders: &DataFrame, users: &DataFrame) -> Result<(), DomainError> {
        require_columns(orders, &[ORDER_KEY, USER_KEY])?;
        require_columns(users, &[USER_KEY])?;
        assert_non_empty(orders, "orders_raw")?;
        assert_non_empty(users, "users_raw")?;
        assert_unique_key(orders, ORDER_KEY, false)?;
        assert_unique_key(users, USER_KEY, false)?;
        Ok(())
    }

    /// Normalize `status` in place and map it onto the configured values.
    /// Returns how many non-null statuses fell outside `status_values`.
    pub fn normalize_status(&self, df: DataFrame) -> Result<(DataFrame, usize), DomainError> {
        let Ok(status) = df.column("status") else {
            return Ok((df, 0));
        };
        let mapped = apply_mapping(&normalize_text(status)?, &self.config.status_mapping)?;
        let unexpected = mapped
            .str()?
            .into_iter()
            .flatten()
            .filter(|s| !self.config.status_values.iter().any(|allowed| allowed == s))
            .count();
        if unexpected > 0 {
            warn!(unexpected, "statuses outside the configured set");
        }
        Ok((put(df, mapped)?, unexpected))
    }

    /// Type, normalize and enrich the order rows. Row count is unchanged.
    #[instrument(skip_all, fields(rows = orders_raw.height()))]
    pub fn clean_orders(&self, orders_raw: &DataFrame) -> Result<CleanedOrders, DomainError> {
        let raw_created = orders_raw
            .column(CREATED_AT)
            .map(|s| s.len() - s.null_count())
            .unwrap_or(0);

        let df = enforce_schema(orders_raw.clone())?;
        let (mut df, status_unexpected) = self.normalize_status(df)?;

        let mut invalid_created_at = 0;
        if has_column(&df, CREATED_AT) {
            df = parse_datetime(df, CREATED_AT, true)?;
            df = add_time_parts(df, CREATED_AT)?;
            let parsed = df.column(CREATED_AT)?;
            invalid_created_at = raw_created.saturating_sub(parsed.len() - parsed.null_count());
        }

        if let Ok(amount) = df.column("amount") {
            let winsor = &self.config.winsorize;
            let mut clipped = winsorize(amount, winsor.lower, winsor.upper)?;
            clipped.rename("amount_w");
            df = put(df, clipped)?;
            df = add_outlier_flag(df, "amount", self.config.outlier_k)?;
        }

        let flag_columns: Vec<&str> = self
            .config
            .missing_flag_columns
            .iter()
            .map(String::as_str)
            .collect();
        let df = add_missing_flags(df, &flag_columns)?;

        Ok(CleanedOrders {
            table: df,
            invalid_created_at,
            status_unexpected,
        })
    }

    /// Range checks on the cleaned values.
    pub fn validate_clean(&self, orders: &DataFrame) -> Result<(), DomainError> {
        if let Ok(amount) = orders.column("amount") {
            assert_in_range(amount, Some(0.0), None, "amount")?;
        }
        if let Ok(quantity) = orders.column("quantity") {
            assert_in_range(quantity, Some(1.0), None, "quantity")?;
        }
        Ok(())
    }

    /// Keep the latest row per order, then prove the key is unique again.
    pub fn dedupe_orders(&self, orders: &DataFrame) -> Result<DataFrame, DomainError> {
        let deduped = if has_column(orders, CREATED_AT) {
            dedupe_keep_latest(orders, &[ORDER_KEY], CREATED_AT)?
        } else {
            orders.clone()
        };
        assert_unique_key(&deduped, ORDER_KEY, false)?;
        Ok(deduped)
    }

    /// String-typed key plus a `{col}_clean` companion for each configured
    /// text column that is present.
    pub fn clean_users(&self, users_raw: &DataFrame) -> Result<DataFrame, DomainError> {
        let mut df = users_raw.clone();
        if let Ok(key) = df.column(USER_KEY) {
            let (key, _) = cast_column(key, &DataType::String)?;
            df = put(df, key)?;
        }
        for name in &self.config.user_text_columns {
            let Ok(source) = df.column(name) else {
                continue;
            };
            let mut clean = normalize_text(source)?;
            clean.rename(&format!("{name}_clean"));
            df = put(df, clean)?;
        }
        Ok(df)
    }

    /// Many orders to one user, left join on `user_id`.
    pub fn build_analytics(
        &self,
        orders: &DataFrame,
        users: &DataFrame,
    ) -> Result<DataFrame, DomainError> {
        safe_left_join(
            orders,
            users,
            USER_KEY,
            JoinValidation::ManyToOne,
            &self.config.join_suffixes,
        )
    }

    #[instrument(skip_all, fields(name = %self.config.name))]
    pub fn transform(
        &self,
        orders_raw: &DataFrame,
        users_raw: &DataFrame,
    ) -> Result<RunBundle, QuarryError> {
        self.validate_raw(orders_raw, users_raw)?;

        let cleaned = self.clean_orders(orders_raw)?;
        self.validate_clean(&cleaned.table)?;
        let orders_clean = self.dedupe_orders(&cleaned.table)?;
        let duplicates_dropped = cleaned.table.height() - orders_clean.height();

        let users_clean = self.clean_users(users_raw)?;
        let analytics = self.build_analytics(&orders_clean, &users_clean)?;

        let metadata = RunMetadata {
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            rows_in_orders_raw: orders_raw.height(),
            rows_in_users: users_raw.height(),
            rows_out_orders_clean: orders_clean.height(),
            rows_out_analytics: analytics.height(),
            duplicates_dropped,
            missing_created_at: orders_raw
                .column(CREATED_AT)
                .map_or(0, |s| s.null_count()),
            invalid_created_at: cleaned.invalid_created_at,
            amount_outliers: count_true(&orders_clean, "amount__is_outlier"),
            status_unexpected: cleaned.status_unexpected,
            join_match_rate: join_match_rate(&analytics, &users_clean)?,
            country_match_rate: non_null_rate(&analytics, "country_clean"),
            config: self.config.clone(),
        };
        let missingness = missingness_report(&orders_clean);

        info!(
            orders = metadata.rows_out_orders_clean,
            analytics = metadata.rows_out_analytics,
            match_rate = metadata.join_match_rate,
            "transform complete"
        );

        Ok(RunBundle {
            orders_clean,
            users_clean,
            analytics,
            metadata,
            missingness,
        })
    }
}

fn rate(hits: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { hits as f64 / total as f64 }
}

/// Share of analytics rows whose key exists on the user side.
fn join_match_rate(analytics: &DataFrame, users: &DataFrame) -> Result<f64, DomainError> {
    let (Ok(keys), Ok(user_keys)) = (analytics.column(USER_KEY), users.column(USER_KEY)) else {
        return Ok(0.0);
    };
    let user_keys = text_view(user_keys)?;
    let known: HashSet<&str> = user_keys.into_iter().flatten().collect();
    let hits = text_view(keys)?
        .into_iter()
        .flatten()
        .filter(|k| known.contains(k))
        .count();
    Ok(rate(hits, analytics.height()))
}

fn non_null_rate(df: &DataFrame, column: &str) -> Option<f64> {
    let s = df.column(column).ok()?;
    Some(rate(s.len() - s.null_count(), df.height()))
}

/// Read the raw extracts, transform them, and persist every output. Nothing
/// is written when any gate fails.
#[instrument(skip_all, fields(project = %project_dir.display(), engine = store.engine_name()))]
pub async fn run_etl(
    store: &dyn TableStore,
    config: &PipelineConfig,
    project_dir: &Path,
) -> Result<EtlRun, QuarryError> {
    let paths = config.paths.resolve(project_dir);

    let orders_raw = store.read_table(&paths.raw.join(&config.orders_file)).await?;
    let users_raw = store.read_table(&paths.raw.join(&config.users_file)).await?;
    info!(
        orders = orders_raw.height(),
        users = users_raw.height(),
        "raw extracts loaded"
    );

    let bundle = Pipeline::new(config.clone()).transform(&orders_raw, &users_raw)?;

    let outputs = RunOutputs {
        orders_clean: paths.processed.join(ORDERS_CLEAN_FILE),
        users_clean: paths.processed.join(USERS_CLEAN_FILE),
        analytics: paths.processed.join(ANALYTICS_FILE),
        metadata: paths.processed.join(RUN_META_FILE),
        missingness: paths.reports.join(MISSINGNESS_FILE),
    };

    // Everything is written to a scratch directory first and promoted only
    // once every write has succeeded.
    let mut staged = StagedOutputs::new_in(project_dir)?;
    let missingness = bundle.missingness.to_frame()?;
    for (df, target) in [
        (&bundle.orders_clean, &outputs.orders_clean),
        (&bundle.users_clean, &outputs.users_clean),
        (&bundle.analytics, &outputs.analytics),
        (&missingness, &outputs.missingness),
    ] {
        store.write_table(df, &staged.stage(target)).await?;
    }
    write_json(&staged.stage(&outputs.metadata), &bundle.metadata)?;
    staged.commit()?;

    info!(dir = %paths.processed.display(), "outputs written");
    Ok(EtlRun {
        metadata: bundle.metadata,
        outputs,
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), QuarryError> {
    let json = serde_json::to_string_pretty(value).map_err(InfrastructureError::from)?;
    atomic_write(path, json)?;
    Ok(())
}
