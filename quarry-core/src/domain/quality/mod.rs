// quarry-core/src/domain/quality/mod.rs

pub mod gate;
pub mod missingness;

pub use gate::{assert_in_range, assert_non_empty, assert_unique_key, require_columns};
pub use missingness::{MissingnessEntry, MissingnessReport, add_missing_flags, missingness_report};
