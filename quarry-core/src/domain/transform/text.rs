// quarry-core/src/domain/transform/text.rs

use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::domain::error::DomainError;
use crate::domain::frame::text_view;

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap_or_else(|_| unreachable!("static pattern")))
}

/// Full Unicode case folding (CaseFolding.txt, status C and F).
pub fn casefold(s: &str) -> String {
    caseless::default_case_fold_str(s)
}

/// Trim, casefold and collapse internal whitespace runs to one space.
pub fn normalize_str(s: &str) -> String {
    let folded = casefold(s.trim());
    whitespace_runs().replace_all(&folded, " ").into_owned()
}

/// Normalize a text column. Non-text values are cast to text first; nulls
/// stay null.
pub fn normalize_text(series: &Series) -> Result<Series, DomainError> {
    let out: StringChunked = text_view(series)?
        .into_iter()
        .map(|v| v.map(normalize_str))
        .collect();
    Ok(out.with_name(series.name()).into_series())
}

/// Finite value substitution with identity fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMapping(BTreeMap<String, String>);

impl ValueMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Mapped value, or the input itself when no entry exists.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Replace each text value with its mapping entry. Values without an entry,
/// nulls, and non-text columns pass through unchanged.
pub fn apply_mapping(series: &Series, mapping: &ValueMapping) -> Result<Series, DomainError> {
    if series.dtype() != &DataType::String {
        return Ok(series.clone());
    }
    let out: StringChunked = series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| mapping.resolve(s).to_string()))
        .collect();
    Ok(out.with_name(series.name()).into_series())
}
