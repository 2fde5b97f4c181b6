// quarry-core/src/domain/transform/mod.rs
//
// Row-preserving (or, for dedupe, row-reducing) table transforms. None of
// them fail on bad cell values; only structural problems such as a missing
// column surface as errors.

pub mod dedupe;
pub mod outlier;
pub mod schema;
pub mod temporal;
pub mod text;

pub use dedupe::dedupe_keep_latest;
pub use outlier::{IqrBounds, add_outlier_flag, iqr_bounds, winsorize};
pub use schema::enforce_schema;
pub use temporal::{add_time_parts, parse_datetime};
pub use text::{ValueMapping, apply_mapping, normalize_text};
