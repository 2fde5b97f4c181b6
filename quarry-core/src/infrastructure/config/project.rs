// quarry-core/src/infrastructure/config/project.rs

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::project::PipelineConfig;
use crate::error::QuarryError;
use crate::infrastructure::error::InfrastructureError;

pub const CONFIG_CANDIDATES: [&str; 2] = ["quarry.yaml", "quarry_project.yaml"];

pub const ENV_RAW_PATH: &str = "QUARRY_RAW_PATH";
pub const ENV_PROCESSED_PATH: &str = "QUARRY_PROCESSED_PATH";

/// Load the project configuration from `project_dir`.
///
/// Falls back to the built-in defaults when no config file exists. Env
/// overrides are applied last, then the result is validated.
#[instrument(skip(project_dir))]
pub fn load_pipeline_config(project_dir: &Path) -> Result<PipelineConfig, QuarryError> {
    let config = match find_main_config(project_dir) {
        Some(path) => {
            info!(path = ?path, "Loading pipeline config");
            read_config(&path)?
        }
        None => {
            warn!(dir = ?project_dir, candidates = ?CONFIG_CANDIDATES, "No config file found, using defaults");
            PipelineConfig::default()
        }
    };
    finish(config)
}

/// Load an explicitly named config file. A missing file is an error here.
#[instrument]
pub fn load_pipeline_config_file(path: &Path) -> Result<PipelineConfig, QuarryError> {
    if !path.exists() {
        return Err(InfrastructureError::ConfigNotFound(path.display().to_string()).into());
    }
    info!(path = ?path, "Loading pipeline config");
    finish(read_config(path)?)
}

fn finish(mut config: PipelineConfig) -> Result<PipelineConfig, QuarryError> {
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config.check()?;
    Ok(config)
}

fn find_main_config(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
}

fn read_config(path: &Path) -> Result<PipelineConfig, InfrastructureError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline config at {:?}", path))?;
    // An empty file means "all defaults".
    if content.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse pipeline config YAML at {:?}", path))
        .map_err(Into::into)
}

fn apply_overrides<F>(config: &mut PipelineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_RAW_PATH) {
        info!(old = ?config.paths.raw, new = ?val, "Overriding raw path via ENV");
        config.paths.raw = PathBuf::from(val);
    }
    if let Some(val) = lookup(ENV_PROCESSED_PATH) {
        info!(old = ?config.paths.processed, new = ?val, "Overriding processed path via ENV");
        config.paths.processed = PathBuf::from(val);
    }
}
