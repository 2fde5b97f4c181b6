// quarry-core/src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;
use crate::domain::join::JoinSuffixes;
use crate::domain::transform::outlier::{DEFAULT_IQR_K, DEFAULT_WINSOR_LOWER, DEFAULT_WINSOR_UPPER};
use crate::domain::transform::text::ValueMapping;

/// Directory layout, relative to the project root unless absolute.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_raw")]
    pub raw: PathBuf,
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
    #[serde(default = "default_processed")]
    pub processed: PathBuf,
    #[serde(default = "default_external")]
    pub external: PathBuf,
    #[serde(default = "default_reports")]
    pub reports: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw: default_raw(),
            cache: default_cache(),
            processed: default_processed(),
            external: default_external(),
            reports: default_reports(),
        }
    }
}

impl PathsConfig {
    /// Same layout with every relative path anchored at `root`.
    pub fn resolve(&self, root: &Path) -> PathsConfig {
        let anchor = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        };
        PathsConfig {
            raw: anchor(&self.raw),
            cache: anchor(&self.cache),
            processed: anchor(&self.processed),
            external: anchor(&self.external),
            reports: anchor(&self.reports),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_winsor_order"))]
pub struct WinsorConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_winsor_lower")]
    pub lower: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_winsor_upper")]
    pub upper: f64,
}

impl Default for WinsorConfig {
    fn default() -> Self {
        Self {
            lower: DEFAULT_WINSOR_LOWER,
            upper: DEFAULT_WINSOR_UPPER,
        }
    }
}

fn validate_winsor_order(w: &WinsorConfig) -> Result<(), ValidationError> {
    if w.lower < w.upper {
        Ok(())
    } else {
        Err(ValidationError::new("winsor_lower_not_below_upper"))
    }
}

/// Everything a run needs. Passed explicitly into the pipeline.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct PipelineConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(rename = "orders-file", default = "default_orders_file")]
    pub orders_file: String,

    #[serde(rename = "users-file", default = "default_users_file")]
    pub users_file: String,

    #[validate(range(min = 0.0))]
    #[serde(rename = "outlier-k", default = "default_k")]
    pub outlier_k: f64,

    #[validate(nested)]
    #[serde(default)]
    pub winsorize: WinsorConfig,

    #[serde(rename = "status-mapping", default = "default_status_mapping")]
    pub status_mapping: ValueMapping,

    #[serde(rename = "status-values", default = "default_status_values")]
    pub status_values: Vec<String>,

    #[serde(rename = "user-text-columns", default = "default_user_text_columns")]
    pub user_text_columns: Vec<String>,

    #[serde(rename = "missing-flag-columns", default = "default_missing_flag_columns")]
    pub missing_flag_columns: Vec<String>,

    #[serde(rename = "join-suffixes", default = "default_join_suffixes")]
    pub join_suffixes: JoinSuffixes,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            paths: PathsConfig::default(),
            orders_file: default_orders_file(),
            users_file: default_users_file(),
            outlier_k: default_k(),
            winsorize: WinsorConfig::default(),
            status_mapping: default_status_mapping(),
            status_values: default_status_values(),
            user_text_columns: default_user_text_columns(),
            missing_flag_columns: default_missing_flag_columns(),
            join_suffixes: default_join_suffixes(),
        }
    }
}

impl PipelineConfig {
    /// Field-level validation, flattened into a single domain error.
    pub fn check(&self) -> Result<(), DomainError> {
        self.validate()
            .map_err(|e| DomainError::InvalidConfig(e.to_string()))
    }
}

fn default_name() -> String {
    "orders_etl".to_string()
}
fn default_raw() -> PathBuf {
    PathBuf::from("data/raw")
}
fn default_cache() -> PathBuf {
    PathBuf::from("data/cache")
}
fn default_processed() -> PathBuf {
    PathBuf::from("data/processed")
}
fn default_external() -> PathBuf {
    PathBuf::from("data/external")
}
fn default_reports() -> PathBuf {
    PathBuf::from("reports")
}
fn default_orders_file() -> String {
    "orders.csv".to_string()
}
fn default_users_file() -> String {
    "users.csv".to_string()
}
fn default_k() -> f64 {
    DEFAULT_IQR_K
}
fn default_winsor_lower() -> f64 {
    DEFAULT_WINSOR_LOWER
}
fn default_winsor_upper() -> f64 {
    DEFAULT_WINSOR_UPPER
}
fn default_status_mapping() -> ValueMapping {
    [("paid", "paid"), ("refund", "refund"), ("refunded", "refund")]
        .into_iter()
        .collect()
}
fn default_status_values() -> Vec<String> {
    vec!["paid".to_string(), "refund".to_string()]
}
fn default_user_text_columns() -> Vec<String> {
    ["country", "city", "segment"].map(String::from).to_vec()
}
fn default_missing_flag_columns() -> Vec<String> {
    ["amount", "quantity", "created_at", "status"]
        .map(String::from)
        .to_vec()
}
fn default_join_suffixes() -> JoinSuffixes {
    JoinSuffixes::new("", "_user")
}
