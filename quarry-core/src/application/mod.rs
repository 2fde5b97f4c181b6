// quarry-core/src/application/mod.rs

pub mod pipeline;
pub mod stages;

// --- RE-EXPORTS (FACADE PATTERN) ---
// The CLI does `use quarry_core::application::{run_etl, run_stage, Stage};`
// without knowing the file layout.

pub use pipeline::{CleanedOrders, EtlRun, Pipeline, RunBundle, RunOutputs, run_etl};
pub use stages::{Stage, run_stage};
