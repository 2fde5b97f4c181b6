// quarry-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(quarry::infra::database::duckdb),
        help("An error occurred inside the table I/O engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("DuckDB connection lock poisoned")]
    #[diagnostic(code(quarry::infra::database::poisoned))]
    Poisoned,
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(quarry::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    #[error("Frame Conversion Error: {0}")]
    #[diagnostic(
        code(quarry::infra::frame),
        help("A column could not be moved between DuckDB and the in-memory frame.")
    )]
    Frame(#[from] polars::error::PolarsError),

    #[error("Input file not found: {0}")]
    #[diagnostic(code(quarry::infra::not_found))]
    FileNotFound(String),

    #[error("Unsupported table format for '{0}' (expected .csv or .parquet)")]
    #[diagnostic(code(quarry::infra::format))]
    UnsupportedFormat(String),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(quarry::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Configuration Not Found: {0}")]
    #[diagnostic(
        code(quarry::infra::config_not_found),
        help("Pass an existing file, or drop --config to use quarry.yaml or the defaults.")
    )]
    ConfigNotFound(String),

    // --- JSON / HTTP ---
    #[error("JSON Error: {0}")]
    #[diagnostic(code(quarry::infra::json))]
    Json(#[from] serde_json::Error),

    #[error("HTTP Error: {0}")]
    #[diagnostic(
        code(quarry::infra::http),
        help("The cache was stale or missing and the network fetch failed.")
    )]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    #[diagnostic(code(quarry::infra::http_status))]
    HttpStatus { url: String, status: u16 },
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

impl From<anyhow::Error> for InfrastructureError {
    fn from(err: anyhow::Error) -> Self {
        InfrastructureError::ConfigError(format!("{:#}", err))
    }
}
