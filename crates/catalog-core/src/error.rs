//! Error types for `catalog-core`.

use thiserror::Error;

use crate::value::SqlType;

#[derive(Debug, Error)]
pub enum Error {
  /// Lifecycle misuse: double initialisation, commit before initialisation,
  /// retiring a row that has no id yet, and so on.
  #[error("invalid state: {0}")]
  InvalidState(String),

  /// A NOT NULL column was left null locally, or the store rejected a write
  /// because of a UNIQUE / FOREIGN KEY / CHECK constraint.
  #[error(
    "constraint violation on {}{}: {detail}",
    .table.as_deref().unwrap_or("<store>"),
    .column.as_deref().map(|c| format!(".{c}")).unwrap_or_default()
  )]
  ConstraintViolation {
    table:  Option<String>,
    column: Option<String>,
    detail: String,
  },

  /// A row could not be loaded into a record.
  #[error("cannot hydrate {table}.{column}: {detail}")]
  Hydration {
    table:  String,
    column: String,
    detail: String,
  },

  /// External text could not be converted to the column's type. The field
  /// has already been set to null when this is returned.
  #[error("cannot parse {input:?} as {expected} for column {column}")]
  Parse {
    column:   String,
    input:    String,
    expected: SqlType,
  },

  #[error("unknown column {column} on table {table}")]
  UnknownColumn { table: String, column: String },

  #[error("table not registered: {0}")]
  UnknownTable(String),

  #[error("column {table}.{column} is {declared}, not {requested}")]
  TypeMismatch {
    table:     String,
    column:    String,
    declared:  SqlType,
    requested: SqlType,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Parse failures leave the field null and are safe to log and ignore;
  /// everything else should abort the current operation.
  pub fn is_fatal(&self) -> bool { !matches!(self, Self::Parse { .. }) }

  /// Attach a table name to a store-reported constraint violation that
  /// arrived without one.
  pub fn in_table(self, name: &str) -> Self {
    match self {
      Self::ConstraintViolation { table: None, column, detail } => {
        Self::ConstraintViolation {
          table: Some(name.to_owned()),
          column,
          detail,
        }
      }
      other => other,
    }
  }

  pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
    Self::InvalidState(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
