//! The `Store` trait: the boundary between records and the SQL backend.
//!
//! The trait is implemented by storage backends (e.g. `catalog-store-sqlite`).
//! Records, cascades, and the garbage collector depend on this abstraction,
//! not on any concrete database.
//!
//! Every call is one blocking round trip and its own autocommit unit. There
//! are no multi-statement transactions at this layer.

use crate::{Result, value::Value};

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One result row: column names with their raw store values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
  columns: Vec<(String, Value)>,
}

impl Row {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.push(name, value);
    self
  }

  pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
    self.columns.push((name.into(), value.into()));
  }

  /// Look a column up by name, ignoring ASCII case.
  pub fn get(&self, name: &str) -> Option<&Value> {
    self
      .columns
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v)
  }

  pub fn get_index(&self, index: usize) -> Option<&Value> {
    self.columns.get(index).map(|(_, v)| v)
  }

  pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.columns.iter().map(|(n, v)| (n.as_str(), v))
  }

  pub fn len(&self) -> usize { self.columns.len() }

  pub fn is_empty(&self) -> bool { self.columns.is_empty() }
}

impl FromIterator<(String, Value)> for Row {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    Self { columns: iter.into_iter().collect() }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A relational backing store that accepts parameterised SQL.
///
/// Placeholders are positional (`?1`, `?2`, ...). Backends must report
/// constraint failures (UNIQUE, NOT NULL, FOREIGN KEY, CHECK) as
/// [`Error::ConstraintViolation`](crate::Error::ConstraintViolation) and all
/// other failures as [`Error::Store`](crate::Error::Store).
pub trait Store {
  /// Run an INSERT/UPDATE/DELETE/DDL statement; returns affected rows.
  fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

  /// Run an INSERT and return the id the store assigned to the new row.
  fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

  /// Run a SELECT.
  fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

  /// Column names of `table`, or `None` if the table does not exist.
  fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>>;

  /// Run a SELECT whose first column of the first row is an integer (a
  /// `COUNT(*)`, typically). Missing or null results read as 0.
  fn query_i64(&self, sql: &str, params: &[Value]) -> Result<i64> {
    Ok(
      self
        .query(sql, params)?
        .first()
        .and_then(|row| row.get_index(0))
        .and_then(Value::as_i64)
        .unwrap_or(0),
    )
  }
}

impl<S: Store + ?Sized> Store for &S {
  fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
    (**self).execute(sql, params)
  }

  fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
    (**self).insert(sql, params)
  }

  fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    (**self).query(sql, params)
  }

  fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>> {
    (**self).table_columns(table)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn row_lookup_is_case_insensitive() {
    let row = Row::new().with("Title", "Lost").with("id", 4_i64);
    assert_eq!(row.get("title"), Some(&Value::Text("Lost".into())));
    assert_eq!(row.get("ID"), Some(&Value::Integer(4)));
    assert_eq!(row.get("missing"), None);
    assert_eq!(row.get_index(1), Some(&Value::Integer(4)));
  }
}
