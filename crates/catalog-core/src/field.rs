//! Column descriptors, typed field handles, and per-row value slots.
//!
//! A column is declared once, statically, as a [`ColumnDef`]. Code that reads
//! or writes a column does so through a zero-sized [`Field<T>`] handle, which
//! carries the column name and its Rust type. The values themselves live in a
//! [`FieldSlot`] owned by exactly one [`Record`](crate::record::Record).

use std::marker::PhantomData;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
  Error, Result,
  parse::{self, Unparseable},
  value::{FieldType, SqlType, Value},
};

// ─── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
  NotNull,
  Nullable,
}

/// The value a column takes when a record is initialised for insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
  Integer(i64),
  /// Parsed as a decimal when materialised.
  Numeric(&'static str),
  Text(&'static str),
  Bool(bool),
  /// The wall-clock time at initialisation. Never emitted into DDL.
  Now,
}

impl DefaultValue {
  pub fn materialize(self) -> Value {
    match self {
      Self::Integer(i) => Value::Integer(i),
      // Literals are checked by `Schema::register_table`.
      Self::Numeric(s) => s
        .parse::<Decimal>()
        .map(Value::Decimal)
        .unwrap_or(Value::Null),
      Self::Text(s) => Value::Text(s.to_owned()),
      Self::Bool(b) => Value::Bool(b),
      Self::Now => Value::Timestamp(Utc::now()),
    }
  }

  /// The literal for a `DEFAULT` clause, if the default is a constant.
  pub fn sql_literal(self) -> Option<String> {
    match self {
      Self::Integer(i) => Some(i.to_string()),
      Self::Numeric(s) => Some(s.to_owned()),
      Self::Text(s) => Some(format!("'{}'", s.replace('\'', "''"))),
      Self::Bool(b) => Some(if b { "1" } else { "0" }.to_owned()),
      Self::Now => None,
    }
  }
}

/// Static description of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
  pub name:        &'static str,
  pub sql_type:    SqlType,
  pub nullability: Nullability,
  pub default:     Option<DefaultValue>,
  /// Name of the table whose `id` this column references.
  pub references:  Option<&'static str>,
}

impl ColumnDef {
  pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
    Self {
      name,
      sql_type,
      nullability: Nullability::Nullable,
      default: None,
      references: None,
    }
  }

  pub const fn integer(name: &'static str) -> Self {
    Self::new(name, SqlType::Integer)
  }

  pub const fn numeric(name: &'static str) -> Self {
    Self::new(name, SqlType::Numeric)
  }

  pub const fn text(name: &'static str) -> Self {
    Self::new(name, SqlType::Text)
  }

  pub const fn boolean(name: &'static str) -> Self {
    Self::new(name, SqlType::Boolean)
  }

  pub const fn timestamp(name: &'static str) -> Self {
    Self::new(name, SqlType::Timestamp)
  }

  /// An integer column referencing `table.id`.
  pub const fn foreign_key(name: &'static str, table: &'static str) -> Self {
    Self::integer(name).references(table)
  }

  pub const fn not_null(mut self) -> Self {
    self.nullability = Nullability::NotNull;
    self
  }

  pub const fn default(mut self, default: DefaultValue) -> Self {
    self.default = Some(default);
    self
  }

  pub const fn references(mut self, table: &'static str) -> Self {
    self.references = Some(table);
    self
  }

  pub fn is_not_null(&self) -> bool {
    self.nullability == Nullability::NotNull
  }

  pub fn initial_value(&self) -> Value {
    self.default.map(DefaultValue::materialize).unwrap_or_default()
  }
}

// ─── Typed handle ────────────────────────────────────────────────────────────

/// A typed reference to a column by name.
///
/// ```ignore
/// pub const TITLE: Field<String> = Field::new("title");
/// record.change_value(TITLE, "The Wire".to_owned())?;
/// ```
pub struct Field<T> {
  name: &'static str,
  _ty:  PhantomData<fn() -> T>,
}

impl<T> Field<T> {
  pub const fn new(name: &'static str) -> Self {
    Self { name, _ty: PhantomData }
  }

  pub const fn name(&self) -> &'static str { self.name }
}

impl<T: FieldType> Field<T> {
  pub const fn sql_type(&self) -> SqlType { T::SQL_TYPE }
}

impl<T> Clone for Field<T> {
  fn clone(&self) -> Self { *self }
}

impl<T> Copy for Field<T> {}

impl<T> std::fmt::Debug for Field<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("Field").field(&self.name).finish()
  }
}

// ─── Slot ────────────────────────────────────────────────────────────────────

/// The original and pending values of one column in one row.
///
/// The slot is dirty exactly when `pending != original`.
#[derive(Debug, Clone)]
pub struct FieldSlot {
  def:      &'static ColumnDef,
  original: Value,
  pending:  Value,
}

impl FieldSlot {
  pub fn new(def: &'static ColumnDef) -> Self {
    Self { def, original: Value::Null, pending: Value::Null }
  }

  pub fn def(&self) -> &'static ColumnDef { self.def }

  pub fn name(&self) -> &'static str { self.def.name }

  pub fn original(&self) -> &Value { &self.original }

  pub fn value(&self) -> &Value { &self.pending }

  pub fn has_changed(&self) -> bool { self.pending != self.original }

  pub fn revert_to_original(&mut self) { self.pending = self.original.clone(); }

  /// Forget the loaded value: original becomes null and pending takes the
  /// declared default, so the slot is dirty against the default.
  pub(crate) fn reset_for_insert(&mut self) {
    self.original = Value::Null;
    self.pending = self.def.initial_value();
  }

  /// Load a stored value; the slot ends up clean.
  pub(crate) fn load(&mut self, value: Value) {
    self.original = value.clone();
    self.pending = value;
  }

  pub(crate) fn mark_clean(&mut self) { self.original = self.pending.clone(); }

  /// Fails with [`Error::TypeMismatch`] unless `T` is the declared type.
  pub fn check_type<T: FieldType>(&self, table: &str) -> Result<()> {
    if self.def.sql_type != T::SQL_TYPE {
      return Err(Error::TypeMismatch {
        table:     table.to_owned(),
        column:    self.def.name.to_owned(),
        declared:  self.def.sql_type,
        requested: T::SQL_TYPE,
      });
    }
    Ok(())
  }

  /// Set from a typed value; `T` must be the column's declared type.
  pub fn set_from_typed<T: FieldType>(
    &mut self,
    table: &str,
    value: Option<T>,
  ) -> Result<()> {
    self.check_type::<T>(table)?;
    self.pending = Value::from(value);
    Ok(())
  }

  /// Set from an untyped value, coercing it to the declared type.
  pub fn set_value(&mut self, table: &str, value: Value) -> Result<()> {
    let actual = value.sql_type();
    match value.coerce(self.def.sql_type) {
      Some(v) => {
        self.pending = v;
        Ok(())
      }
      None => Err(Error::TypeMismatch {
        table:     table.to_owned(),
        column:    self.def.name.to_owned(),
        declared:  self.def.sql_type,
        requested: actual.unwrap_or(self.def.sql_type),
      }),
    }
  }

  /// Parse external text into the column's type. Unparseable input stores
  /// null and reports [`Error::Parse`]; empty input stores null silently.
  pub fn set_from_external_string(&mut self, text: &str) -> Result<()> {
    match parse::parse_external(text, self.def.sql_type) {
      Ok(v) => {
        self.pending = v;
        Ok(())
      }
      Err(Unparseable { input, expected }) => {
        self.pending = Value::Null;
        Err(Error::Parse { column: self.def.name.to_owned(), input, expected })
      }
    }
  }

  pub fn get<T: FieldType>(&self) -> Option<T> { T::from_value(&self.pending) }
}
