// quarry-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Which side of an allowed interval a value fell outside of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Lower(f64),
    Upper(f64),
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Lower(lo) => write!(f, "lower bound {}", lo),
            Bound::Upper(hi) => write!(f, "upper bound {}", hi),
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Schema Error: missing required columns {missing:?}")]
    #[diagnostic(
        code(quarry::domain::schema),
        help("Check the header row of the input extract.")
    )]
    Schema { missing: Vec<String> },

    #[error("Empty Data: '{label}' has no rows")]
    #[diagnostic(code(quarry::domain::empty))]
    EmptyData { label: String },

    #[error(
        "Uniqueness violated on '{column}': {duplicates} duplicated key(s) {sample:?}, {nulls} null key(s)"
    )]
    #[diagnostic(
        code(quarry::domain::uniqueness),
        help("Deduplicate the extract or fix the key column upstream.")
    )]
    Uniqueness {
        column: String,
        duplicates: usize,
        nulls: usize,
        sample: Vec<String>,
    },

    #[error("Range violated on '{column}': {violations} value(s) outside {bound}, e.g. {example}")]
    #[diagnostic(code(quarry::domain::range))]
    Range {
        column: String,
        bound: Bound,
        violations: usize,
        example: f64,
    },

    #[error(
        "Join cardinality violated on '{key}' ({validate}): {offending} key(s) match more than one row, e.g. {sample:?}"
    )]
    #[diagnostic(
        code(quarry::domain::join_cardinality),
        help("The join would duplicate rows. Deduplicate the side that should be unique.")
    )]
    JoinCardinality {
        key: String,
        validate: String,
        offending: usize,
        sample: Vec<String>,
    },

    #[error("Column '{0}' appears more than once")]
    #[diagnostic(
        code(quarry::domain::duplicate_column),
        help("Pick join suffixes that keep overlapping column names distinct.")
    )]
    DuplicateColumn(String),

    #[error("Frame Error: {0}")]
    #[diagnostic(code(quarry::domain::frame))]
    Frame(#[from] polars::error::PolarsError),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(quarry::domain::config))]
    InvalidConfig(String),
}
