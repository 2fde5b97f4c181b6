// quarry-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuarryError {
    // --- ERREURS DU DOMAINE (Quality gates, Schema, Join) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (IO, DuckDB, HTTP) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl QuarryError {
    /// True for failures raised by a quality gate (bad data rather than a
    /// broken environment).
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            QuarryError::Domain(
                DomainError::Schema { .. }
                    | DomainError::EmptyData { .. }
                    | DomainError::Uniqueness { .. }
                    | DomainError::Range { .. }
                    | DomainError::JoinCardinality { .. }
            )
        )
    }
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        QuarryError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for QuarryError {
    fn from(err: duckdb::Error) -> Self {
        QuarryError::Infrastructure(err.into())
    }
}
