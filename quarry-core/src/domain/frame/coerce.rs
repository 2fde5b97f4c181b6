// quarry-core/src/domain/frame/coerce.rs
//
// Parse, don't reject: every coercion yields a Coerced<T>. Invalid input is
// kept apart from genuinely missing input so stages can report both, but
// both land in the frame as null.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    Valid(T),
    /// The input was already null (or blank text).
    Missing,
    /// The input was present but could not be converted.
    Invalid,
}

impl<T> Coerced<T> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Coerced::Invalid)
    }

    pub fn valid(self) -> Option<T> {
        match self {
            Coerced::Valid(v) => Some(v),
            Coerced::Missing | Coerced::Invalid => None,
        }
    }

    /// Like `valid`, bumping `invalid` when the input was unusable.
    pub fn tally(self, invalid: &mut usize) -> Option<T> {
        if self.is_invalid() {
            *invalid += 1;
        }
        self.valid()
    }
}

/// Trimmed text, or `None` for null and blank input.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Finite number from text.
pub fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

pub fn to_float(raw: Option<&str>) -> Coerced<f64> {
    match present(raw) {
        None => Coerced::Missing,
        Some(s) => parse_f64(s).map_or(Coerced::Invalid, Coerced::Valid),
    }
}

/// Integral values only: "3" and "3.0" both give 3, "2.5" is invalid.
pub fn to_int(raw: Option<&str>) -> Coerced<i64> {
    let Some(s) = present(raw) else {
        return Coerced::Missing;
    };
    if let Ok(i) = s.parse::<i64>() {
        return Coerced::Valid(i);
    }
    match parse_f64(s) {
        Some(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => Coerced::Valid(x as i64),
        _ => Coerced::Invalid,
    }
}

pub fn to_bool(raw: Option<&str>) -> Coerced<bool> {
    let Some(s) = present(raw) else {
        return Coerced::Missing;
    };
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" => Coerced::Valid(true),
        "false" | "0" => Coerced::Valid(false),
        _ => Coerced::Invalid,
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a timestamp into a UTC wall-clock reading.
///
/// With `utc = true`, offset-aware inputs are converted to UTC and naive
/// inputs are taken as UTC. With `utc = false` the wall-clock reading is
/// kept and any offset is dropped.
pub fn to_timestamp(raw: Option<&str>, utc: bool) -> Coerced<NaiveDateTime> {
    let Some(raw) = present(raw) else {
        return Coerced::Missing;
    };

    let aware = DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    });
    if let Some(aware) = aware {
        return Coerced::Valid(if utc {
            aware.naive_utc()
        } else {
            aware.naive_local()
        });
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Coerced::Valid(naive);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(Coerced::Invalid, Coerced::Valid)
}

pub fn to_date(raw: Option<&str>) -> Coerced<NaiveDate> {
    match to_timestamp(raw, true) {
        Coerced::Valid(ts) => Coerced::Valid(ts.date()),
        Coerced::Missing => Coerced::Missing,
        Coerced::Invalid => Coerced::Invalid,
    }
}

pub fn to_micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

pub fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

/// Days since 1970-01-01, the physical form of a date column.
pub fn to_epoch_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    date.signed_duration_since(epoch).num_days() as i32
}
