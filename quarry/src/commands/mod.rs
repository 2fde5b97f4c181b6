// quarry/src/commands/mod.rs

pub mod fetch;
pub mod inspect;
pub mod report;
pub mod run;
pub mod stage;

use anyhow::Context;
use std::path::{Path, PathBuf};

use quarry_core::domain::project::PipelineConfig;
use quarry_core::infrastructure::config::{load_pipeline_config, load_pipeline_config_file};

/// Explicit `--config` wins; otherwise look in the project directory.
pub(crate) fn load_config(
    project_dir: &Path,
    config: Option<&PathBuf>,
) -> anyhow::Result<PipelineConfig> {
    match config {
        Some(path) => load_pipeline_config_file(path)
            .with_context(|| format!("Failed to load pipeline config from {:?}", path)),
        None => load_pipeline_config(project_dir).with_context(|| {
            format!("Failed to load pipeline config from {:?}", project_dir)
        }),
    }
}
