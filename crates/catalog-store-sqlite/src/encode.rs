//! Conversion between core [`Value`]s and SQLite storage values.
//!
//! Timestamps are stored as RFC 3339 text in UTC with a fixed nine-digit
//! fraction and a `Z` suffix, so text comparison orders them
//! chronologically. Decimals are stored as text in TEXT-affinity columns, so
//! every digit survives; REALs are still accepted from columns created with
//! `NUMERIC` by older schemas. Booleans are stored as 0/1 integers.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rust_decimal::Decimal;

use catalog_core::{Error, Result, Value};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// ─── Value ───────────────────────────────────────────────────────────────────

pub fn to_sql(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Decimal(d) => SqlValue::Text(d.to_string()),
    Value::Text(s) => SqlValue::Text(s.clone()),
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Timestamp(dt) => SqlValue::Text(encode_dt(*dt)),
  }
}

/// Read a raw column. The result carries the storage class, not the declared
/// column type; records coerce it when they hydrate.
pub fn from_sql(column: &str, raw: ValueRef<'_>) -> Result<Value> {
  match raw {
    ValueRef::Null => Ok(Value::Null),
    ValueRef::Integer(i) => Ok(Value::Integer(i)),
    ValueRef::Real(f) => Decimal::try_from(f)
      .map(Value::Decimal)
      .map_err(|e| Error::Store(format!("column {column}: {e}").into())),
    ValueRef::Text(bytes) => std::str::from_utf8(bytes)
      .map(|s| Value::Text(s.to_owned()))
      .map_err(|e| Error::Store(format!("column {column}: {e}").into())),
    ValueRef::Blob(_) => Err(Error::Store(
      format!("column {column}: blob values are not supported").into(),
    )),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap();
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(encode_dt(early), "2024-01-09T23:00:00.000000000Z");
  }

  #[test]
  fn booleans_and_decimals_are_encoded_portably() {
    assert_eq!(to_sql(&Value::Bool(true)), SqlValue::Integer(1));
    assert_eq!(
      to_sql(&Value::Decimal(Decimal::new(850, 2))),
      SqlValue::Text("8.50".into())
    );
  }

  #[test]
  fn reals_read_back_as_decimals() {
    assert_eq!(
      from_sql("rating", ValueRef::Real(8.5)).unwrap(),
      Value::Decimal(Decimal::new(85, 1))
    );
    assert!(from_sql("cover", ValueRef::Blob(&[1, 2])).is_err());
  }
}
