// quarry-core/src/application/stages.rs
//
// The pipeline split into three resumable steps. Each stage reads what the
// previous one left on disk and records its own `_run_meta_<stage>.json`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::application::pipeline::{
    ANALYTICS_FILE, CREATED_AT, MISSINGNESS_FILE, ORDERS_CLEAN_FILE, Pipeline, USER_KEY,
    USERS_CLEAN_FILE, write_json,
};
use crate::domain::project::{PathsConfig, PipelineConfig, StageMetadata};
use crate::domain::quality::{assert_non_empty, assert_unique_key, missingness_report, require_columns};
use crate::domain::frame::has_column;
use crate::domain::transform::schema::ORDER_COLUMNS;
use crate::domain::transform::{add_outlier_flag, add_time_parts, enforce_schema, parse_datetime};
use crate::error::QuarryError;
use crate::ports::table_store::TableStore;

pub const ORDERS_TYPED_FILE: &str = "orders.parquet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Raw CSV to typed parquet.
    Load,
    /// Quality gates, normalization and dedup.
    Clean,
    /// Time parts, outlier flag and the user join.
    Analytics,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Analytics => "analytics",
        }
    }

    pub fn meta_file(&self) -> String {
        format!("_run_meta_{}.json", self.name())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct StageRecorder {
    stage: Stage,
    rows: BTreeMap<String, usize>,
    outputs: BTreeMap<String, String>,
}

impl StageRecorder {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            rows: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    fn rows(&mut self, label: &str, n: usize) {
        self.rows.insert(label.to_string(), n);
    }

    fn output(&mut self, label: &str, path: &Path) {
        self.outputs
            .insert(label.to_string(), path.display().to_string());
    }

    fn finish(self, paths: &PathsConfig) -> Result<StageMetadata, QuarryError> {
        let meta = StageMetadata {
            stage: self.stage.to_string(),
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            rows: self.rows,
            outputs: self.outputs,
        };
        write_json(&paths.processed.join(self.stage.meta_file()), &meta)?;
        Ok(meta)
    }
}

fn raw_inputs(config: &PipelineConfig, paths: &PathsConfig) -> (PathBuf, PathBuf) {
    (
        paths.raw.join(&config.orders_file),
        paths.raw.join(&config.users_file),
    )
}

#[instrument(skip(store, config), fields(project = %project_dir.display()))]
pub async fn run_stage(
    store: &dyn TableStore,
    config: &PipelineConfig,
    project_dir: &Path,
    stage: Stage,
) -> Result<StageMetadata, QuarryError> {
    let paths = config.paths.resolve(project_dir);
    let meta = match stage {
        Stage::Load => run_load(store, config, &paths).await?,
        Stage::Clean => run_clean(store, config, &paths).await?,
        Stage::Analytics => run_analytics(store, config, &paths).await?,
    };
    info!(stage = %stage, rows = ?meta.rows, "stage complete");
    Ok(meta)
}

async fn run_load(
    store: &dyn TableStore,
    config: &PipelineConfig,
    paths: &PathsConfig,
) -> Result<StageMetadata, QuarryError> {
    let (orders_path, users_path) = raw_inputs(config, paths);
    let orders = enforce_schema(store.read_table(&orders_path).await?)?;
    let users = store.read_table(&users_path).await?;

    let mut rec = StageRecorder::new(Stage::Load);
    let out_orders = paths.processed.join(ORDERS_TYPED_FILE);
    let out_users = paths.processed.join(USERS_CLEAN_FILE);
    store.write_table(&orders, &out_orders).await?;
    store.write_table(&users, &out_users).await?;

    rec.rows("orders", orders.height());
    rec.rows("users", users.height());
    rec.output("orders", &out_orders);
    rec.output("users", &out_users);
    rec.finish(paths)
}

/// Stricter on columns than `transform`, looser on the order key: raw
/// duplicates are collapsed here rather than rejected.
async fn run_clean(
    store: &dyn TableStore,
    config: &PipelineConfig,
    paths: &PathsConfig,
) -> Result<StageMetadata, QuarryError> {
    let (orders_path, users_path) = raw_inputs(config, paths);
    let orders = store.read_table(&orders_path).await?;
    let users = store.read_table(&users_path).await?;
    let pipeline = Pipeline::new(config.clone());

    require_columns(&orders, ORDER_COLUMNS)?;
    assert_non_empty(&orders, "orders")?;
    assert_non_empty(&users, "users")?;
    assert_unique_key(&users, USER_KEY, false)?;

    let typed = enforce_schema(orders)?;
    pipeline.validate_clean(&typed)?;
    let (normalized, status_unexpected) = pipeline.normalize_status(typed)?;
    let orders_clean = pipeline.dedupe_orders(&normalized)?;
    let users_clean = pipeline.clean_users(&users)?;
    let report = missingness_report(&orders_clean);

    let mut rec = StageRecorder::new(Stage::Clean);
    let out_orders = paths.processed.join(ORDERS_CLEAN_FILE);
    let out_users = paths.processed.join(USERS_CLEAN_FILE);
    let out_report = paths.reports.join(MISSINGNESS_FILE);
    store.write_table(&orders_clean, &out_orders).await?;
    store.write_table(&users_clean, &out_users).await?;
    store.write_table(&report.to_frame()?, &out_report).await?;

    rec.rows("orders", orders_clean.height());
    rec.rows("users", users_clean.height());
    rec.rows(
        "duplicates_dropped",
        normalized.height() - orders_clean.height(),
    );
    rec.rows("status_unexpected", status_unexpected);
    rec.output("orders", &out_orders);
    rec.output("users", &out_users);
    rec.output("missingness", &out_report);
    rec.finish(paths)
}

async fn run_analytics(
    store: &dyn TableStore,
    config: &PipelineConfig,
    paths: &PathsConfig,
) -> Result<StageMetadata, QuarryError> {
    let orders = store
        .read_table(&paths.processed.join(ORDERS_CLEAN_FILE))
        .await?;
    let users = store
        .read_table(&paths.processed.join(USERS_CLEAN_FILE))
        .await?;
    let pipeline = Pipeline::new(config.clone());

    // Parquet comes back as text; restore the order types first.
    let mut orders = enforce_schema(orders)?;
    if has_column(&orders, CREATED_AT) {
        orders = parse_datetime(orders, CREATED_AT, true)?;
        orders = add_time_parts(orders, CREATED_AT)?;
    }
    if has_column(&orders, "amount") {
        orders = add_outlier_flag(orders, "amount", config.outlier_k)?;
    }
    let analytics = pipeline.build_analytics(&orders, &users)?;

    let mut rec = StageRecorder::new(Stage::Analytics);
    let out = paths.processed.join(ANALYTICS_FILE);
    store.write_table(&analytics, &out).await?;

    rec.rows("orders", orders.height());
    rec.rows("users", users.height());
    rec.rows("analytics", analytics.height());
    rec.output("analytics", &out);
    rec.finish(paths)
}
