// quarry-core/src/domain/project/mod.rs

pub mod configuration;
pub mod metadata;

pub use configuration::{PathsConfig, PipelineConfig, WinsorConfig};
pub use metadata::{RunMetadata, StageMetadata};
