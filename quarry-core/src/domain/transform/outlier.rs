// quarry-core/src/domain/transform/outlier.rs
//
// Robust spread statistics. All quantiles use linear interpolation between
// closest ranks: position (n - 1) * q over the sorted numeric values.

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::DomainError;
use crate::domain::frame::{column, numeric_view, put};

pub const DEFAULT_IQR_K: f64 = 1.5;
pub const DEFAULT_WINSOR_LOWER: f64 = 0.01;
pub const DEFAULT_WINSOR_UPPER: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }
}

fn linear(values: &Float64Chunked, q: f64) -> Result<Option<f64>, DomainError> {
    Ok(values.quantile(q.clamp(0.0, 1.0), QuantileInterpolOptions::Linear)?)
}

/// Quantile `q` over the numeric values of a column. `None` when there are
/// none.
pub fn quantile(series: &Series, q: f64) -> Result<Option<f64>, DomainError> {
    linear(&numeric_view(series)?, q)
}

fn bounds_of(values: &Float64Chunked, k: f64) -> Result<Option<IqrBounds>, DomainError> {
    let (Some(q1), Some(q3)) = (linear(values, 0.25)?, linear(values, 0.75)?) else {
        return Ok(None);
    };
    let iqr = q3 - q1;
    Ok(Some(IqrBounds {
        lower: q1 - k * iqr,
        upper: q3 + k * iqr,
    }))
}

/// `[Q1 - k·IQR, Q3 + k·IQR]` over the numeric values of the column, or
/// `None` when the column holds no numeric value at all.
pub fn iqr_bounds(series: &Series, k: f64) -> Result<Option<IqrBounds>, DomainError> {
    bounds_of(&numeric_view(series)?, k)
}

/// Add `{column}__is_outlier`. Null and non-numeric values are never
/// flagged. The source column is left as is.
pub fn add_outlier_flag(df: DataFrame, name: &str, k: f64) -> Result<DataFrame, DomainError> {
    let values = numeric_view(column(&df, name)?)?;
    let bounds = bounds_of(&values, k)?;
    debug!(column = name, ?bounds, "iqr bounds");

    let flags: BooleanChunked = values
        .into_iter()
        .map(|x| Some(matches!((x, bounds), (Some(x), Some(b)) if !b.contains(x))))
        .collect();
    put(df, flags.with_name(&format!("{name}__is_outlier")).into_series())
}

/// Clip the numeric view of the column to its `[lo_q, hi_q]` quantiles.
/// Non-numeric values become null; the row count never changes.
pub fn winsorize(series: &Series, lo_q: f64, hi_q: f64) -> Result<Series, DomainError> {
    let values = numeric_view(series)?;
    let bounds = linear(&values, lo_q)?.zip(linear(&values, hi_q)?);

    let clipped: Float64Chunked = values
        .into_iter()
        .map(|x| match (x, bounds) {
            (Some(x), Some((lo, hi))) => Some(x.max(lo).min(hi)),
            _ => None,
        })
        .collect();
    Ok(clipped.with_name(series.name()).into_series())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn amounts(xs: &[Option<f64>]) -> Series {
        Series::new("amount", xs)
    }

    fn floats(series: &Series) -> Vec<Option<f64>> {
        series.f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_quantile_linear() {
        let s = amounts(&[Some(4.0), Some(1.0), None, Some(3.0), Some(2.0)]);
        assert_eq!(quantile(&s, 0.5).unwrap(), Some(2.5));
        assert_eq!(quantile(&s, 0.25).unwrap(), Some(1.75));
        assert_eq!(quantile(&s, 1.0).unwrap(), Some(4.0));
        assert_eq!(quantile(&amounts(&[None]), 0.5).unwrap(), None);
    }

    #[test]
    fn test_iqr_bounds_exclude_extreme() {
        let s = amounts(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)]);
        let b = iqr_bounds(&s, 1.5).unwrap().unwrap();
        // Q1 = 2, Q3 = 4, IQR = 2
        assert_eq!(b, IqrBounds { lower: -1.0, upper: 7.0 });
        assert!(!b.contains(100.0));
    }

    #[test]
    fn test_iqr_bounds_ignore_non_numeric() {
        let s = Series::new("amount", &[Some("1"), Some("x"), Some("3"), None]);
        let b = iqr_bounds(&s, 0.0).unwrap().unwrap();
        assert_eq!(b, IqrBounds { lower: 1.5, upper: 2.5 });
        let garbage = Series::new("amount", &[Some("x"), None]);
        assert!(iqr_bounds(&garbage, 1.5).unwrap().is_none());
    }

    #[test]
    fn test_outlier_flag_marks_only_extreme() {
        let df = DataFrame::new(vec![amounts(&[
            Some(1.0),
            Some(2.0),
            Some(3.0),
            Some(4.0),
            Some(100.0),
            None,
        ])])
        .unwrap();
        let out = add_outlier_flag(df.clone(), "amount", 1.5).unwrap();
        let flags: Vec<Option<bool>> = out
            .column("amount__is_outlier")
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            flags,
            vec![Some(false), Some(false), Some(false), Some(false), Some(true), Some(false)]
        );
        assert!(out.column("amount").unwrap().equals_missing(df.column("amount").unwrap()));
    }

    #[test]
    fn test_winsorize_clips_and_nulls() {
        let s = Series::new("amount", &[Some("0"), Some("10"), Some("bad"), Some("5")]);
        let w = winsorize(&s, 0.25, 0.75).unwrap();
        // sorted [0, 5, 10]: q.25 = 2.5, q.75 = 7.5
        assert_eq!(floats(&w), vec![Some(2.5), Some(7.5), None, Some(5.0)]);
    }

    proptest! {
        #[test]
        fn prop_winsorize_within_bounds(
            xs in proptest::collection::vec(proptest::option::of(-1e6f64..1e6), 0..60),
            lo in 0.0f64..0.5,
            hi in 0.5f64..1.0,
        ) {
            let s = amounts(&xs);
            let out = winsorize(&s, lo, hi).unwrap();
            prop_assert_eq!(out.len(), xs.len());

            if let (Some(qlo), Some(qhi)) = (quantile(&s, lo).unwrap(), quantile(&s, hi).unwrap()) {
                for x in floats(&out).into_iter().flatten() {
                    prop_assert!(x >= qlo && x <= qhi);
                }
            }
            prop_assert_eq!(out.null_count(), s.null_count());
        }

        #[test]
        fn prop_flag_matches_bounds(xs in proptest::collection::vec(proptest::option::of(-1e3f64..1e3), 1..40)) {
            let df = DataFrame::new(vec![amounts(&xs)]).unwrap();
            let out = add_outlier_flag(df, "amount", 1.5).unwrap();
            let bounds = iqr_bounds(out.column("amount").unwrap(), 1.5).unwrap();
            let flags = out.column("amount__is_outlier").unwrap().bool().unwrap().clone();
            for (x, flag) in xs.iter().zip(&flags) {
                let expected = match (x, bounds) {
                    (Some(x), Some(b)) => !b.contains(*x),
                    _ => false,
                };
                prop_assert_eq!(flag, Some(expected));
            }
        }
    }
}
