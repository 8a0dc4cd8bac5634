//! Column values and the SQL types they map to.
//!
//! [`Value`] is the untyped currency passed across the [`Store`] boundary and
//! held in every field slot. [`FieldType`] connects it to the five native Rust
//! types a column can have.
//!
//! [`Store`]: crate::store::Store

use chrono::{DateTime, SecondsFormat, TimeZone as _, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive as _};
use serde::{Deserialize, Serialize};

use crate::parse;

// ─── SqlType ─────────────────────────────────────────────────────────────────

/// The declared type of a column. DDL uses [`SqlType::ddl_type`]; the
/// `Display` form is the logical name.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SqlType {
  Integer,
  /// Arbitrary-precision decimal (ratings, review scores, prices).
  Numeric,
  Text,
  Boolean,
  Timestamp,
}

impl SqlType {
  /// The type name emitted in `CREATE TABLE`/`ALTER TABLE`.
  ///
  /// Decimals are declared with a name containing `TEXT` so SQLite gives the
  /// column TEXT affinity. A `NUMERIC` column would convert decimal text to
  /// REAL and keep only about 15 significant digits.
  pub fn ddl_type(self) -> &'static str {
    match self {
      Self::Integer => "INTEGER",
      Self::Numeric => "DECIMAL_TEXT",
      Self::Text => "TEXT",
      Self::Boolean => "BOOLEAN",
      Self::Timestamp => "TIMESTAMP",
    }
  }
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single column value. `Null` compares equal to itself here; SQL NULL
/// semantics for uniqueness are applied by [`crate::record::UniqueKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
  #[default]
  Null,
  Integer(i64),
  Decimal(Decimal),
  Text(String),
  Bool(bool),
  Timestamp(DateTime<Utc>),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// The natural SQL type of this value, or `None` for `Null`.
  pub fn sql_type(&self) -> Option<SqlType> {
    match self {
      Self::Null => None,
      Self::Integer(_) => Some(SqlType::Integer),
      Self::Decimal(_) => Some(SqlType::Numeric),
      Self::Text(_) => Some(SqlType::Text),
      Self::Bool(_) => Some(SqlType::Boolean),
      Self::Timestamp(_) => Some(SqlType::Timestamp),
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Integer(i) => Some(*i),
      _ => None,
    }
  }

  /// Convert a value read from the store into the representation declared
  /// for a column. Returns `None` when the two are incompatible.
  ///
  /// Stores without native booleans, timestamps or decimals hand back
  /// integers and text; this is where those are turned back into typed
  /// values.
  pub fn coerce(self, target: SqlType) -> Option<Value> {
    use SqlType as T;

    if self.is_null() {
      return Some(Value::Null);
    }

    let coerced = match (target, self) {
      (T::Integer, v @ Value::Integer(_)) => v,
      (T::Integer, Value::Bool(b)) => Value::Integer(i64::from(b)),
      (T::Integer, Value::Decimal(d)) if d.fract().is_zero() => {
        Value::Integer(d.to_i64()?)
      }
      (T::Integer, Value::Text(s)) => Value::Integer(s.trim().parse().ok()?),

      (T::Numeric, v @ Value::Decimal(_)) => v,
      (T::Numeric, Value::Integer(i)) => Value::Decimal(Decimal::from(i)),
      (T::Numeric, Value::Text(s)) => Value::Decimal(s.trim().parse().ok()?),

      (T::Text, v @ Value::Text(_)) => v,
      (T::Text, Value::Integer(i)) => Value::Text(i.to_string()),
      (T::Text, Value::Decimal(d)) => Value::Text(d.to_string()),

      (T::Boolean, v @ Value::Bool(_)) => v,
      (T::Boolean, Value::Integer(i)) => Value::Bool(i != 0),
      (T::Boolean, Value::Text(s)) => Value::Bool(parse::parse_bool(&s)?),

      (T::Timestamp, v @ Value::Timestamp(_)) => v,
      (T::Timestamp, Value::Text(s)) => {
        Value::Timestamp(parse::parse_timestamp(&s)?)
      }
      (T::Timestamp, Value::Integer(secs)) => {
        Value::Timestamp(Utc.timestamp_opt(secs, 0).single()?)
      }

      _ => return None,
    };
    Some(coerced)
  }
}

impl std::fmt::Display for Value {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Null => f.write_str("NULL"),
      Self::Integer(i) => write!(f, "{i}"),
      Self::Decimal(d) => write!(f, "{d}"),
      Self::Text(s) => write!(f, "{s:?}"),
      Self::Bool(b) => write!(f, "{b}"),
      Self::Timestamp(ts) => {
        f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
      }
    }
  }
}

impl<T: FieldType> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map(FieldType::into_value).unwrap_or_default() }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<Decimal> for Value {
  fn from(v: Decimal) -> Self { Self::Decimal(v) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<DateTime<Utc>> for Value {
  fn from(v: DateTime<Utc>) -> Self { Self::Timestamp(v) }
}

// ─── FieldType ───────────────────────────────────────────────────────────────

/// A Rust type that can back a column.
pub trait FieldType: Sized {
  const SQL_TYPE: SqlType;

  fn into_value(self) -> Value;

  /// Extract from an already-coerced value; `None` for `Null` or a value of a
  /// different type.
  fn from_value(value: &Value) -> Option<Self>;
}

impl FieldType for i64 {
  const SQL_TYPE: SqlType = SqlType::Integer;

  fn into_value(self) -> Value { Value::Integer(self) }

  fn from_value(value: &Value) -> Option<Self> { value.as_i64() }
}

impl FieldType for Decimal {
  const SQL_TYPE: SqlType = SqlType::Numeric;

  fn into_value(self) -> Value { Value::Decimal(self) }

  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Decimal(d) => Some(*d),
      _ => None,
    }
  }
}

impl FieldType for String {
  const SQL_TYPE: SqlType = SqlType::Text;

  fn into_value(self) -> Value { Value::Text(self) }

  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Text(s) => Some(s.clone()),
      _ => None,
    }
  }
}

impl FieldType for bool {
  const SQL_TYPE: SqlType = SqlType::Boolean;

  fn into_value(self) -> Value { Value::Bool(self) }

  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }
}

impl FieldType for DateTime<Utc> {
  const SQL_TYPE: SqlType = SqlType::Timestamp;

  fn into_value(self) -> Value { Value::Timestamp(self) }

  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Timestamp(ts) => Some(*ts),
      _ => None,
    }
  }
}
