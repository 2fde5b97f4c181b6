pub mod project;

pub use crate::domain::project::PipelineConfig;
pub use project::{CONFIG_CANDIDATES, load_pipeline_config, load_pipeline_config_file};
