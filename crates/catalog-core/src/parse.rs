//! Conversion of external text into typed column values.
//!
//! Sync sources hand us strings in every shape imaginable: TiVo XML uses
//! RFC 3339, TheTVDB uses bare ISO dates, Metacritic prints "Oct 12, 2010",
//! Steam reports unix epochs and "1,234" style counts. Everything lands here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone as _, Utc};
use rust_decimal::Decimal;

use crate::value::{SqlType, Value};

/// Why a piece of external text was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unparseable {
  pub input:    String,
  pub expected: SqlType,
}

/// Parse `text` as a value of type `ty`.
///
/// Empty or whitespace-only input is `Ok(Value::Null)`: a missing value is
/// not an error. Anything else that does not parse is `Err`.
pub fn parse_external(text: &str, ty: SqlType) -> Result<Value, Unparseable> {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Ok(Value::Null);
  }

  let parsed = match ty {
    SqlType::Integer => parse_integer(trimmed).map(Value::Integer),
    SqlType::Numeric => parse_decimal(trimmed).map(Value::Decimal),
    SqlType::Text => Some(Value::Text(text.to_owned())),
    SqlType::Boolean => parse_bool(trimmed).map(Value::Bool),
    SqlType::Timestamp => parse_timestamp(trimmed).map(Value::Timestamp),
  };

  parsed.ok_or_else(|| Unparseable { input: text.to_owned(), expected: ty })
}

fn strip_grouping(s: &str) -> String {
  s.chars().filter(|c| *c != ',' && *c != '_').collect()
}

/// Integers, tolerating thousands separators, a leading `+`, and a zero
/// fractional part ("42.0").
pub fn parse_integer(s: &str) -> Option<i64> {
  let cleaned = strip_grouping(s);
  let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
  if let Ok(i) = cleaned.parse::<i64>() {
    return Some(i);
  }
  let d: Decimal = cleaned.parse().ok()?;
  if d.fract().is_zero() {
    rust_decimal::prelude::ToPrimitive::to_i64(&d)
  } else {
    None
  }
}

/// Decimals, tolerating a currency sign and thousands separators.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
  let cleaned = strip_grouping(s);
  let cleaned = cleaned.trim_start_matches('$').trim_start_matches('+');
  cleaned
    .parse::<Decimal>()
    .ok()
    .or_else(|| Decimal::from_scientific(cleaned).ok())
}

pub fn parse_bool(s: &str) -> Option<bool> {
  match s.trim().to_ascii_lowercase().as_str() {
    "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
    "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
    _ => None,
  }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%m/%d/%Y %H:%M:%S",
  "%m/%d/%Y %I:%M %p",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d",
  "%m/%d/%Y",
  "%b %d, %Y",
  "%B %d, %Y",
  "%d %b %Y",
  "%d %B %Y",
  "%Y%m%d",
];

/// Timestamps in any of the formats the sync sources produce. Values without
/// an offset are taken to be UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for fmt in NAIVE_DATETIME_FORMATS {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(naive.and_utc());
    }
  }
  // Bare eight-digit strings are dates, not epochs.
  let all_digits = s.bytes().all(|b| b.is_ascii_digit());
  for fmt in NAIVE_DATE_FORMATS {
    if *fmt == "%Y%m%d" && !(all_digits && s.len() == 8) {
      continue;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
      return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
  }
  if all_digits {
    let n: i64 = s.parse().ok()?;
    return match s.len() {
      13 => Utc.timestamp_millis_opt(n).single(),
      9 | 10 => Utc.timestamp_opt(n, 0).single(),
      _ => None,
    };
  }
  None
}
