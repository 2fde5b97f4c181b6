// quarry-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod http_cache;

pub use self::duckdb::{DuckDbTableStore, TableFormat};
pub use http_cache::HttpJsonCache;
