pub mod error;
pub mod frame;
pub mod join;
pub mod project;
pub mod quality;
pub mod transform;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
pub use frame::{has_column, timestamp_dtype};
pub use join::{JoinSuffixes, JoinValidation, safe_left_join};
