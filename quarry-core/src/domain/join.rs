// quarry-core/src/domain/join.rs

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, instrument};

use crate::domain::error::DomainError;
use crate::domain::quality::gate::{SAMPLE_LIMIT, duplicated_keys, require_columns};

/// Declared multiplicity of a join, checked before any row is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinValidation {
    OneToOne,
    OneToMany,
    #[default]
    ManyToOne,
    ManyToMany,
}

impl JoinValidation {
    fn left_unique(self) -> bool {
        matches!(self, JoinValidation::OneToOne | JoinValidation::OneToMany)
    }

    fn right_unique(self) -> bool {
        matches!(self, JoinValidation::OneToOne | JoinValidation::ManyToOne)
    }
}

impl fmt::Display for JoinValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinValidation::OneToOne => "one_to_one",
            JoinValidation::OneToMany => "one_to_many",
            JoinValidation::ManyToOne => "many_to_one",
            JoinValidation::ManyToMany => "many_to_many",
        };
        f.write_str(s)
    }
}

/// Suffixes appended to overlapping non-key column names. The left suffix
/// may be empty to keep left names unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSuffixes {
    pub left: String,
    pub right: String,
}

impl Default for JoinSuffixes {
    fn default() -> Self {
        Self {
            left: String::new(),
            right: "_right".to_string(),
        }
    }
}

impl JoinSuffixes {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

const ROW_INDEX: &str = "__quarry_row";

fn check_unique(df: &DataFrame, key: &str, validate: JoinValidation) -> Result<(), DomainError> {
    let offending = duplicated_keys(df, key)?;
    if offending.is_empty() {
        return Ok(());
    }
    Err(DomainError::JoinCardinality {
        key: key.to_string(),
        validate: validate.to_string(),
        offending: offending.len(),
        sample: offending.into_iter().take(SAMPLE_LIMIT).collect(),
    })
}

/// Give overlapping non-key columns their suffixes, failing if two output
/// columns would end up with the same name.
fn apply_suffixes(
    left: &DataFrame,
    right: &DataFrame,
    on: &str,
    suffixes: &JoinSuffixes,
) -> Result<(DataFrame, DataFrame), DomainError> {
    let left_names = left.get_column_names();
    let right_names = right.get_column_names();
    let overlap: Vec<&str> = left_names
        .iter()
        .copied()
        .filter(|n| *n != on && right_names.contains(n))
        .collect();
    let target = |name: &str, suffix: &str| {
        if overlap.contains(&name) {
            format!("{name}{suffix}")
        } else {
            name.to_string()
        }
    };

    let mut seen = HashSet::new();
    let output = left_names
        .iter()
        .map(|n| target(*n, &suffixes.left))
        .chain(
            right_names
                .iter()
                .filter(|n| **n != on)
                .map(|n| target(*n, &suffixes.right)),
        );
    for name in output {
        if !seen.insert(name.clone()) {
            return Err(DomainError::DuplicateColumn(name));
        }
    }

    let mut left = left.clone();
    let mut right = right.clone();
    for name in overlap.iter().copied() {
        if !suffixes.left.is_empty() {
            left.rename(name, &target(name, &suffixes.left))?;
        }
        if !suffixes.right.is_empty() {
            right.rename(name, &target(name, &suffixes.right))?;
        }
    }
    Ok((left, right))
}

/// Left outer join on `on`, refusing to run if the data contradicts
/// `validate`.
///
/// Unmatched left rows are kept with null right-hand columns. Null keys
/// never match. Output columns are the left columns in order followed by
/// the right non-key columns; names present on both sides get the suffixes.
/// Rows come out in left order.
#[instrument(skip(left, right), fields(left.rows = left.height(), right.rows = right.height()))]
pub fn safe_left_join(
    left: &DataFrame,
    right: &DataFrame,
    on: &str,
    validate: JoinValidation,
    suffixes: &JoinSuffixes,
) -> Result<DataFrame, DomainError> {
    require_columns(left, &[on])?;
    require_columns(right, &[on])?;
    if validate.left_unique() {
        check_unique(left, on, validate)?;
    }
    if validate.right_unique() {
        check_unique(right, on, validate)?;
    }

    let (mut left, right) = apply_suffixes(left, right, on, suffixes)?;
    let rows: Vec<u32> = (0..left.height() as u32).collect();
    left.with_column(Series::new(ROW_INDEX, rows))?;

    let joined = left
        .lazy()
        .join(
            right.lazy(),
            [col(on)],
            [col(on)],
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            [ROW_INDEX],
            SortMultipleOptions {
                descending: vec![false],
                nulls_last: false,
                maintain_order: true,
                ..Default::default()
            },
        )
        .collect()?
        .drop(ROW_INDEX)?;

    debug!(rows = joined.height(), "left join done");
    Ok(joined)
}
