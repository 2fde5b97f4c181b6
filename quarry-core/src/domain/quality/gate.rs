// quarry-core/src/domain/quality/gate.rs
//
// Quality gates. Each check either passes or returns the DomainError that
// aborts the run; none of them touch the frame.

use polars::prelude::*;
use tracing::debug;

use crate::domain::error::{Bound, DomainError};
use crate::domain::frame::{column, has_column, numeric_view, text_view};

pub(crate) const SAMPLE_LIMIT: usize = 5;

/// Fails listing every name in `names` that the frame lacks.
pub fn require_columns(df: &DataFrame, names: &[&str]) -> Result<(), DomainError> {
    let missing: Vec<String> = names
        .iter()
        .filter(|n| !has_column(df, n))
        .map(|n| n.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Schema { missing })
    }
}

pub fn assert_non_empty(df: &DataFrame, label: &str) -> Result<(), DomainError> {
    if df.height() == 0 {
        return Err(DomainError::EmptyData {
            label: label.to_string(),
        });
    }
    debug!(label, rows = df.height(), "non-empty check passed");
    Ok(())
}

/// Non-null values of `key` that occur more than once, as sorted text.
pub fn duplicated_keys(df: &DataFrame, key: &str) -> Result<Vec<String>, DomainError> {
    column(df, key)?;
    let repeated = df
        .clone()
        .lazy()
        .select([col(key)])
        .filter(col(key).is_not_null())
        .with_column(lit(1u32).alias("__n"))
        .group_by([col(key)])
        .agg([col("__n").sum()])
        .filter(col("__n").gt(lit(1u32)))
        .collect()?;

    let mut keys: Vec<String> = text_view(repeated.column(key)?)?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    keys.sort();
    Ok(keys)
}

/// Fails when a non-null key value repeats, or when `allow_na` is false and
/// any key is null.
pub fn assert_unique_key(df: &DataFrame, key: &str, allow_na: bool) -> Result<(), DomainError> {
    let nulls = column(df, key)?.null_count();
    let dupes = duplicated_keys(df, key)?;

    let null_violation = !allow_na && nulls > 0;
    if dupes.is_empty() && !null_violation {
        return Ok(());
    }
    Err(DomainError::Uniqueness {
        column: key.to_string(),
        duplicates: dupes.len(),
        nulls: if allow_na { 0 } else { nulls },
        sample: dupes.into_iter().take(SAMPLE_LIMIT).collect(),
    })
}

/// Fails when any non-null numeric value lies outside `[lo, hi]`. Either
/// bound may be open. Values that are not numeric are ignored; schema
/// enforcement has already nulled them.
pub fn assert_in_range(
    series: &Series,
    lo: Option<f64>,
    hi: Option<f64>,
    name: &str,
) -> Result<(), DomainError> {
    let xs: Vec<f64> = numeric_view(series)?.into_iter().flatten().collect();

    if let Some(lo) = lo {
        let below: Vec<f64> = xs.iter().copied().filter(|x| *x < lo).collect();
        if let Some(&example) = below.first() {
            return Err(DomainError::Range {
                column: name.to_string(),
                bound: Bound::Lower(lo),
                violations: below.len(),
                example,
            });
        }
    }
    if let Some(hi) = hi {
        let above: Vec<f64> = xs.iter().copied().filter(|x| *x > hi).collect();
        if let Some(&example) = above.first() {
            return Err(DomainError::Range {
                column: name.to_string(),
                bound: Bound::Upper(hi),
                violations: above.len(),
                example,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn users(ids: &[Option<&str>]) -> DataFrame {
        DataFrame::new(vec![Series::new("user_id", ids)]).unwrap()
    }

    #[test]
    fn test_require_columns_lists_all_missing() {
        let t = users(&[Some("u1")]);
        let err = require_columns(&t, &["user_id", "country", "city"]).unwrap_err();
        match err {
            DomainError::Schema { missing } => assert_eq!(missing, vec!["country", "city"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(require_columns(&t, &["user_id"]).is_ok());
    }

    #[test]
    fn test_assert_non_empty() {
        let empty = users(&[]);
        let err = assert_non_empty(&empty, "users_raw").unwrap_err();
        assert!(matches!(err, DomainError::EmptyData { label } if label == "users_raw"));
        assert!(assert_non_empty(&users(&[Some("u1")]), "users_raw").is_ok());
    }

    #[test]
    fn test_unique_key_rejects_null_when_disallowed() {
        let t = users(&[None]);
        let err = assert_unique_key(&t, "user_id", false).unwrap_err();
        assert!(matches!(err, DomainError::Uniqueness { nulls: 1, duplicates: 0, .. }));
        assert!(assert_unique_key(&t, "user_id", true).is_ok());
    }

    #[test]
    fn test_unique_key_rejects_duplicates() {
        let t = users(&[Some("u1"), Some("u2"), Some("u1"), None, None]);
        let err = assert_unique_key(&t, "user_id", true).unwrap_err();
        match err {
            DomainError::Uniqueness {
                duplicates, sample, ..
            } => {
                assert_eq!(duplicates, 1);
                assert_eq!(sample, vec!["u1"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicated_keys_sorted_and_skip_nulls() {
        let t = users(&[Some("u3"), Some("u1"), None, Some("u3"), Some("u1"), None, Some("u2")]);
        assert_eq!(duplicated_keys(&t, "user_id").unwrap(), vec!["u1", "u3"]);

        let ints = DataFrame::new(vec![Series::new("k", &[Some(2i64), Some(2), None])]).unwrap();
        assert_eq!(duplicated_keys(&ints, "k").unwrap(), vec!["2"]);
    }

    #[test]
    fn test_in_range_reads_text_numbers() {
        let col = Series::new("amount", &[Some("5"), Some("-2"), Some("x")]);
        let err = assert_in_range(&col, Some(0.0), None, "amount").unwrap_err();
        assert!(matches!(err, DomainError::Range { violations: 1, example, .. } if example == -2.0));
    }

    #[test]
    fn test_unique_key_missing_column() {
        let t = users(&[Some("u1")]);
        assert!(matches!(
            assert_unique_key(&t, "order_id", true),
            Err(DomainError::Schema { .. })
        ));
    }

    #[test]
    fn test_in_range_bounds() {
        let col = Series::new("amount", &[Some(0.0), Some(12.0), None]);
        assert!(assert_in_range(&col, Some(0.0), None, "amount").is_ok());
        assert!(assert_in_range(&col, None, None, "amount").is_ok());

        let err = assert_in_range(&col, Some(1.0), None, "amount").unwrap_err();
        assert!(matches!(
            err,
            DomainError::Range { bound: Bound::Lower(lo), violations: 1, .. } if lo == 1.0
        ));

        let err = assert_in_range(&col, None, Some(10.0), "amount").unwrap_err();
        assert!(err.to_string().contains("upper bound 10"));
        assert!(err.to_string().contains("'amount'"));
    }
}
