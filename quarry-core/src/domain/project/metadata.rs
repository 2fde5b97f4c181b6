// quarry-core/src/domain/project/metadata.rs

use serde::{Deserialize, Serialize};

use super::configuration::PipelineConfig;

/// Facts about one pipeline run, written next to its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub timestamp_utc: String,
    pub rows_in_orders_raw: usize,
    pub rows_in_users: usize,
    pub rows_out_orders_clean: usize,
    pub rows_out_analytics: usize,
    pub duplicates_dropped: usize,
    pub missing_created_at: usize,
    pub invalid_created_at: usize,
    pub amount_outliers: usize,
    pub status_unexpected: usize,
    pub join_match_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country_match_rate: Option<f64>,
    pub config: PipelineConfig,
}

/// Row counts and outputs of a single stage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetadata {
    pub stage: String,
    pub timestamp_utc: String,
    pub rows: std::collections::BTreeMap<String, usize>,
    pub outputs: std::collections::BTreeMap<String, String>,
}
