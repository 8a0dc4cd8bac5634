//! [`Record`]: one change-tracked table row.
//!
//! A record moves through four states:
//!
//! - **Unbound**: constructed from a [`TableDef`], no row associated.
//! - **New**: [`Record::initialize_for_insert`] was called; no id, every field
//!   holds its declared default and is dirty.
//! - **Hydrated**: [`Record::initialize_from_db_object`] loaded a row; the id
//!   is set and every field is clean.
//! - **Committed**: [`Record::commit`] wrote the pending values; the id is
//!   set and every field is clean.
//!
//! Mutating a field never changes the state, only that field's dirty flag.
//! Records are never deleted through this type; physical deletes belong to
//! the garbage collector.

use tracing::debug;

use crate::{
  Error, Result,
  field::{Field, FieldSlot},
  schema::{ID_COLUMN, TableDef},
  store::{Row, Store},
  value::{FieldType, SqlType, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
  Unbound,
  New,
  Hydrated,
  Committed,
}

/// What a call to [`Record::commit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
  /// One row was inserted and received this id.
  Inserted(i64),
  /// An UPDATE naming this many columns was issued.
  Updated { columns: usize },
  /// Nothing was dirty; no statement was issued.
  Unchanged,
}

/// The combined values of one unique-constraint group. Two rows collide
/// exactly when their keys are equal; a group containing a null never
/// produces a key, mirroring SQL NULL semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
  pub table:  &'static str,
  pub values: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Record {
  table: &'static TableDef,
  id:    Option<i64>,
  slots: Vec<FieldSlot>,
  state: RecordState,
}

impl Record {
  pub fn new(table: &'static TableDef) -> Self {
    Self {
      table,
      id: None,
      slots: table.all_columns().map(FieldSlot::new).collect(),
      state: RecordState::Unbound,
    }
  }

  pub fn table(&self) -> &'static TableDef { self.table }

  pub fn table_name(&self) -> &'static str { self.table.name }

  pub fn id(&self) -> Option<i64> { self.id }

  pub fn state(&self) -> RecordState { self.state }

  pub fn fields(&self) -> &[FieldSlot] { &self.slots }

  // ── Initialisation ────────────────────────────────────────────────────────

  /// Prepare a brand-new row. Every field takes its declared default and is
  /// dirty, so the first commit names every column that has a value.
  pub fn initialize_for_insert(&mut self) -> Result<()> {
    self.expect_unbound("initialize_for_insert")?;
    self.id = None;
    self.slots.iter_mut().for_each(FieldSlot::reset_for_insert);
    self.state = RecordState::New;
    Ok(())
  }

  /// Load every declared field from `row`, matching column names without
  /// regard to case. The record is left untouched if any column is missing,
  /// incompatible, or null where NOT NULL is declared.
  pub fn initialize_from_db_object(&mut self, row: &Row) -> Result<()> {
    self.expect_unbound("initialize_from_db_object")?;

    let id = self
      .read_column(row, ID_COLUMN, SqlType::Integer, true)?
      .as_i64()
      .ok_or_else(|| self.hydration_error(ID_COLUMN, "id is not an integer"))?;

    let values = self
      .slots
      .iter()
      .map(|slot| {
        let def = slot.def();
        self.read_column(row, def.name, def.sql_type, def.is_not_null())
      })
      .collect::<Result<Vec<_>>>()?;

    for (slot, value) in self.slots.iter_mut().zip(values) {
      slot.load(value);
    }
    self.id = Some(id);
    self.state = RecordState::Hydrated;
    Ok(())
  }

  fn read_column(
    &self,
    row: &Row,
    name: &str,
    sql_type: SqlType,
    not_null: bool,
  ) -> Result<Value> {
    let raw = row
      .get(name)
      .ok_or_else(|| self.hydration_error(name, "column absent from row"))?;
    let value = raw.clone().coerce(sql_type).ok_or_else(|| {
      self.hydration_error(name, &format!("cannot read {raw} as {sql_type}"))
    })?;
    if not_null && value.is_null() {
      return Err(self.hydration_error(name, "NOT NULL column read as null"));
    }
    Ok(value)
  }

  fn hydration_error(&self, column: &str, detail: &str) -> Error {
    Error::Hydration {
      table:  self.table.name.to_owned(),
      column: column.to_owned(),
      detail: detail.to_owned(),
    }
  }

  fn expect_unbound(&self, action: &str) -> Result<()> {
    if self.state != RecordState::Unbound {
      return Err(Error::invalid_state(format!(
        "{action} on {} record already in state {:?}",
        self.table.name, self.state
      )));
    }
    Ok(())
  }

  fn expect_bound(&self, action: &str) -> Result<()> {
    if self.state == RecordState::Unbound {
      return Err(Error::invalid_state(format!(
        "{action} on unbound {} record",
        self.table.name
      )));
    }
    Ok(())
  }

  /// Load a single row by id, or `None` if there is no such row.
  pub fn fetch_by_id<S: Store + ?Sized>(
    store: &S,
    table: &'static TableDef,
    id: i64,
  ) -> Result<Option<Record>> {
    let sql = format!("SELECT * FROM {} WHERE {ID_COLUMN} = ?1", table.name);
    let rows = store.query(&sql, &[Value::Integer(id)])?;
    rows
      .first()
      .map(|row| {
        let mut record = Record::new(table);
        record.initialize_from_db_object(row)?;
        Ok(record)
      })
      .transpose()
  }

  /// Load every row matching a WHERE clause, ordered by id.
  pub fn select<S: Store + ?Sized>(
    store: &S,
    table: &'static TableDef,
    filter: &str,
    params: &[Value],
  ) -> Result<Vec<Record>> {
    let sql = format!(
      "SELECT * FROM {} WHERE {filter} ORDER BY {ID_COLUMN}",
      table.name
    );
    store
      .query(&sql, params)?
      .iter()
      .map(|row| {
        let mut record = Record::new(table);
        record.initialize_from_db_object(row)?;
        Ok(record)
      })
      .collect()
  }

  // ── Field access ──────────────────────────────────────────────────────────

  fn slot(&self, name: &str) -> Result<&FieldSlot> {
    self
      .slots
      .iter()
      .find(|s| s.name().eq_ignore_ascii_case(name))
      .ok_or_else(|| Error::UnknownColumn {
        table:  self.table.name.to_owned(),
        column: name.to_owned(),
      })
  }

  fn slot_mut(&mut self, name: &str) -> Result<&mut FieldSlot> {
    let table = self.table.name;
    self
      .slots
      .iter_mut()
      .find(|s| s.name().eq_ignore_ascii_case(name))
      .ok_or_else(|| Error::UnknownColumn {
        table:  table.to_owned(),
        column: name.to_owned(),
      })
  }

  fn typed_slot_mut<T: FieldType>(
    &mut self,
    field: Field<T>,
  ) -> Result<&mut FieldSlot> {
    self.expect_bound("change_value")?;
    let table = self.table.name;
    let slot = self.slot_mut(field.name())?;
    slot.check_type::<T>(table)?;
    Ok(slot)
  }

  /// The pending value of `field`; `None` when it is null.
  pub fn get<T: FieldType>(&self, field: Field<T>) -> Result<Option<T>> {
    let slot = self.slot(field.name())?;
    slot.check_type::<T>(self.table.name)?;
    Ok(slot.get())
  }

  /// The pending value of a column by name.
  pub fn value(&self, name: &str) -> Result<&Value> {
    if name.eq_ignore_ascii_case(ID_COLUMN) {
      return Err(Error::invalid_state("read the id through Record::id"));
    }
    Ok(self.slot(name)?.value())
  }

  pub fn change_value<T: FieldType>(
    &mut self,
    field: Field<T>,
    value: T,
  ) -> Result<()> {
    let table = self.table.name;
    self.slot_mut(field.name())?.set_from_typed(table, Some(value))
  }

  /// Set `field` to null.
  pub fn clear_value<T: FieldType>(&mut self, field: Field<T>) -> Result<()> {
    let table = self.table.name;
    self.slot_mut(field.name())?.set_from_typed::<T>(table, None)
  }

  /// Like [`change_value`](Self::change_value), but `None` leaves the field
  /// alone. Used for partial updates from sources that omit optional data.
  pub fn change_value_unless_null<T: FieldType>(
    &mut self,
    field: Field<T>,
    value: Option<T>,
  ) -> Result<()> {
    match value {
      Some(v) => self.change_value(field, v),
      None => {
        self.typed_slot_mut(field)?;
        Ok(())
      }
    }
  }

  /// Parse external text into `field`. On [`Error::Parse`] the field has
  /// been set to null and the error is safe to log and ignore; a NOT NULL
  /// field left null will then fail at commit.
  pub fn change_value_from_string<T: FieldType>(
    &mut self,
    field: Field<T>,
    text: &str,
  ) -> Result<()> {
    self.typed_slot_mut(field)?.set_from_external_string(text)
  }

  /// Set a column by name from an untyped value, coercing it to the
  /// declared type.
  pub fn change_raw_value(&mut self, name: &str, value: Value) -> Result<()> {
    self.expect_bound("change_raw_value")?;
    let table = self.table.name;
    self.slot_mut(name)?.set_value(table, value)
  }

  pub fn has_changed(&self) -> bool {
    self.slots.iter().any(FieldSlot::has_changed)
  }

  pub fn changed_columns(&self) -> Vec<&'static str> {
    self
      .slots
      .iter()
      .filter(|s| s.has_changed())
      .map(FieldSlot::name)
      .collect()
  }

  pub fn revert_to_original(&mut self) {
    self.slots.iter_mut().for_each(FieldSlot::revert_to_original);
  }

  /// The key for unique group `group` (index into `TableDef::unique`), or
  /// `None` when any member is null or the group does not exist.
  pub fn unique_key(&self, group: usize) -> Option<UniqueKey> {
    let columns = self.table.unique.get(group)?;
    let values = columns
      .iter()
      .map(|name| {
        if name.eq_ignore_ascii_case(ID_COLUMN) {
          self.id.map(Value::Integer)
        } else {
          self
            .slot(name)
            .ok()
            .map(|s| s.value().clone())
            .filter(|v| !v.is_null())
        }
      })
      .collect::<Option<Vec<_>>>()?;
    Some(UniqueKey { table: self.table.name, values })
  }

  // ── Commit ────────────────────────────────────────────────────────────────

  /// Write pending changes: INSERT when the record has no id, otherwise an
  /// UPDATE naming only the dirty columns. A clean record issues nothing.
  ///
  /// NOT NULL checks run before any statement is sent. Uniqueness is left to
  /// the store, whose violations come back as
  /// [`Error::ConstraintViolation`].
  pub fn commit<S: Store + ?Sized>(&mut self, store: &S) -> Result<CommitOutcome> {
    self.expect_bound("commit")?;
    let outcome = match self.id {
      None => self.commit_insert(store)?,
      Some(id) => self.commit_update(store, id)?,
    };
    self.state = RecordState::Committed;
    Ok(outcome)
  }

  fn check_not_null<'a>(
    &self,
    slots: impl IntoIterator<Item = &'a FieldSlot>,
  ) -> Result<()> {
    for slot in slots {
      if slot.def().is_not_null() && slot.value().is_null() {
        return Err(Error::ConstraintViolation {
          table:  Some(self.table.name.to_owned()),
          column: Some(slot.name().to_owned()),
          detail: "NOT NULL column has no value".to_owned(),
        });
      }
    }
    Ok(())
  }

  fn commit_insert<S: Store + ?Sized>(&mut self, store: &S) -> Result<CommitOutcome> {
    self.check_not_null(&self.slots)?;

    let present: Vec<&FieldSlot> =
      self.slots.iter().filter(|s| !s.value().is_null()).collect();

    let sql = if present.is_empty() {
      format!("INSERT INTO {} DEFAULT VALUES", self.table.name)
    } else {
      let columns: Vec<&str> = present.iter().map(|s| s.name()).collect();
      let placeholders: Vec<String> =
        (1..=present.len()).map(|i| format!("?{i}")).collect();
      format!(
        "INSERT INTO {} ({}) VALUES ({})",
        self.table.name,
        columns.join(", "),
        placeholders.join(", ")
      )
    };
    let params: Vec<Value> = present.iter().map(|s| s.value().clone()).collect();

    debug!(table = self.table.name, %sql, "insert");
    let id = store
      .insert(&sql, &params)
      .map_err(|e| e.in_table(self.table.name))?;

    self.id = Some(id);
    self.slots.iter_mut().for_each(FieldSlot::mark_clean);
    Ok(CommitOutcome::Inserted(id))
  }

  fn commit_update<S: Store + ?Sized>(
    &mut self,
    store: &S,
    id: i64,
  ) -> Result<CommitOutcome> {
    let dirty: Vec<&FieldSlot> =
      self.slots.iter().filter(|s| s.has_changed()).collect();
    if dirty.is_empty() {
      return Ok(CommitOutcome::Unchanged);
    }
    self.check_not_null(dirty.iter().copied())?;

    let assignments: Vec<String> = dirty
      .iter()
      .enumerate()
      .map(|(i, s)| format!("{} = ?{}", s.name(), i + 1))
      .collect();
    let sql = format!(
      "UPDATE {} SET {} WHERE {ID_COLUMN} = ?{}",
      self.table.name,
      assignments.join(", "),
      dirty.len() + 1
    );
    let mut params: Vec<Value> = dirty.iter().map(|s| s.value().clone()).collect();
    params.push(Value::Integer(id));
    let columns = dirty.len();

    debug!(table = self.table.name, id, %sql, "update");
    let affected = store
      .execute(&sql, &params)
      .map_err(|e| e.in_table(self.table.name))?;
    if affected == 0 {
      return Err(Error::invalid_state(format!(
        "{} row {id} no longer exists",
        self.table.name
      )));
    }

    self.slots.iter_mut().for_each(FieldSlot::mark_clean);
    Ok(CommitOutcome::Updated { columns })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::cell::RefCell;

  use chrono::{DateTime, TimeZone as _, Utc};
  use rust_decimal::Decimal;

  use super::*;
  use crate::field::{ColumnDef, DefaultValue};

  /// Records every statement and answers with canned results.
  #[derive(Default)]
  pub(crate) struct ScriptedStore {
    pub statements: RefCell<Vec<(String, Vec<Value>)>>,
    pub rows:       RefCell<Vec<Row>>,
    pub next_id:    RefCell<i64>,
    pub affected:   RefCell<usize>,
  }

  impl ScriptedStore {
    pub fn new() -> Self {
      Self { next_id: RefCell::new(1), affected: RefCell::new(1), ..Default::default() }
    }

    pub fn sql(&self) -> Vec<String> {
      self.statements.borrow().iter().map(|(s, _)| s.clone()).collect()
    }
  }

  impl Store for ScriptedStore {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
      self.statements.borrow_mut().push((sql.to_owned(), params.to_vec()));
      Ok(*self.affected.borrow())
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
      self.statements.borrow_mut().push((sql.to_owned(), params.to_vec()));
      let mut next = self.next_id.borrow_mut();
      let id = *next;
      *next += 1;
      Ok(id)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
      self.statements.borrow_mut().push((sql.to_owned(), params.to_vec()));
      Ok(self.rows.borrow().clone())
    }

    fn table_columns(&self, _table: &str) -> Result<Option<Vec<String>>> {
      Ok(None)
    }
  }

  static SHOW_COLUMNS: [ColumnDef; 4] = [
    ColumnDef::text("title").not_null(),
    ColumnDef::numeric("rating"),
    ColumnDef::boolean("suggestion")
      .not_null()
      .default(DefaultValue::Bool(false)),
    ColumnDef::timestamp("first_aired"),
  ];
  pub(crate) static SHOW: TableDef = TableDef::new("show", &SHOW_COLUMNS)
    .unique(&[&["title", "retired"]])
    .retireable();

  const TITLE: Field<String> = Field::new("title");
  const RATING: Field<Decimal> = Field::new("rating");
  const SUGGESTION: Field<bool> = Field::new("suggestion");
  const FIRST_AIRED: Field<DateTime<Utc>> = Field::new("first_aired");

  fn stored_row() -> Row {
    Row::new()
      .with("ID", 7_i64)
      .with("title", "Lost")
      .with("rating", "8.5")
      .with("suggestion", 0_i64)
      .with("first_aired", "2004-09-22T00:00:00.000000Z")
      .with("retired", 0_i64)
      .with("retired_date", Value::Null)
  }

  fn hydrated() -> Record {
    let mut r = Record::new(&SHOW);
    r.initialize_from_db_object(&stored_row()).unwrap();
    r
  }

  #[test]
  fn initialize_for_insert_twice_is_invalid() {
    let mut r = Record::new(&SHOW);
    r.initialize_for_insert().unwrap();
    assert_eq!(r.state(), RecordState::New);
    let err = r.initialize_for_insert().unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
  }

  #[test]
  fn new_record_is_dirty_against_defaults() {
    let mut r = Record::new(&SHOW);
    r.initialize_for_insert().unwrap();
    assert!(r.has_changed());
    assert_eq!(r.get(SUGGESTION).unwrap(), Some(false));
    assert_eq!(r.get(TITLE).unwrap(), None);
    assert!(r.id().is_none());
  }

  #[test]
  fn commit_before_initialize_is_invalid() {
    let store = ScriptedStore::new();
    let mut r = Record::new(&SHOW);
    assert!(matches!(r.commit(&store), Err(Error::InvalidState(_))));
    assert!(store.sql().is_empty());
  }

  #[test]
  fn mutate_before_initialize_is_invalid() {
    let mut r = Record::new(&SHOW);
    let err = r.change_value(TITLE, "Lost".into()).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
  }

  #[test]
  fn insert_requires_not_null_fields() {
    let store = ScriptedStore::new();
    let mut r = Record::new(&SHOW);
    r.initialize_for_insert().unwrap();

    let err = r.commit(&store).unwrap_err();
    assert!(matches!(
      err,
      Error::ConstraintViolation { ref column, .. } if column.as_deref() == Some("title")
    ));
    assert!(store.sql().is_empty(), "nothing sent before validation");
  }

  #[test]
  fn insert_names_every_present_column() {
    let store = ScriptedStore::new();
    let mut r = Record::new(&SHOW);
    r.initialize_for_insert().unwrap();
    r.change_value(TITLE, "Lost".into()).unwrap();

    assert_eq!(r.commit(&store).unwrap(), CommitOutcome::Inserted(1));
    assert_eq!(r.id(), Some(1));
    assert_eq!(r.state(), RecordState::Committed);
    assert!(!r.has_changed());

    let statements = store.statements.borrow();
    assert_eq!(
      statements[0].0,
      "INSERT INTO show (title, suggestion, retired) VALUES (?1, ?2, ?3)"
    );
    assert_eq!(
      statements[0].1,
      vec![Value::Text("Lost".into()), Value::Bool(false), Value::Integer(0)]
    );
  }

  #[test]
  fn hydrate_coerces_and_is_clean() {
    let r = hydrated();
    assert_eq!(r.state(), RecordState::Hydrated);
    assert_eq!(r.id(), Some(7));
    assert!(!r.has_changed());
    assert_eq!(r.get(RATING).unwrap(), Some(Decimal::new(85, 1)));
    assert_eq!(r.get(SUGGESTION).unwrap(), Some(false));
    assert_eq!(
      r.get(FIRST_AIRED).unwrap(),
      Some(Utc.with_ymd_and_hms(2004, 9, 22, 0, 0, 0).unwrap())
    );
  }

  #[test]
  fn hydrate_rejects_missing_column() {
    let mut row = Row::new();
    for (name, value) in stored_row().columns() {
      if name != "rating" {
        row.push(name, value.clone());
      }
    }
    let mut r = Record::new(&SHOW);
    let err = r.initialize_from_db_object(&row).unwrap_err();
    assert!(matches!(err, Error::Hydration { ref column, .. } if column == "rating"));
    assert_eq!(r.state(), RecordState::Unbound);
  }

  #[test]
  fn hydrate_rejects_null_in_not_null() {
    let row: Row = stored_row()
      .columns()
      .map(|(n, v)| {
        let v = if n == "title" { Value::Null } else { v.clone() };
        (n.to_owned(), v)
      })
      .collect();
    let mut r = Record::new(&SHOW);
    let err = r.initialize_from_db_object(&row).unwrap_err();
    assert!(matches!(err, Error::Hydration { ref column, .. } if column == "title"));
  }

  #[test]
  fn hydrate_rejects_incompatible_value() {
    let row: Row = stored_row()
      .columns()
      .map(|(n, v)| {
        let v = if n == "first_aired" { Value::Bool(true) } else { v.clone() };
        (n.to_owned(), v)
      })
      .collect();
    let mut r = Record::new(&SHOW);
    assert!(matches!(
      r.initialize_from_db_object(&row),
      Err(Error::Hydration { .. })
    ));
  }

  #[test]
  fn clean_commit_issues_nothing() {
    let store = ScriptedStore::new();
    let mut r = hydrated();
    assert_eq!(r.commit(&store).unwrap(), CommitOutcome::Unchanged);
    assert!(store.sql().is_empty());
  }

  #[test]
  fn update_names_only_dirty_columns() {
    let store = ScriptedStore::new();
    let mut r = hydrated();
    r.change_value(RATING, Decimal::new(9, 0)).unwrap();
    assert_eq!(r.changed_columns(), ["rating"]);

    assert_eq!(r.commit(&store).unwrap(), CommitOutcome::Updated { columns: 1 });
    assert_eq!(store.sql(), ["UPDATE show SET rating = ?1 WHERE id = ?2"]);

    // Second commit is a no-op.
    assert_eq!(r.commit(&store).unwrap(), CommitOutcome::Unchanged);
    assert_eq!(store.sql().len(), 1);
  }

  #[test]
  fn update_of_vanished_row_fails() {
    let store = ScriptedStore::new();
    *store.affected.borrow_mut() = 0;
    let mut r = hydrated();
    r.change_value(TITLE, "Lost (2004)".into()).unwrap();
    assert!(matches!(r.commit(&store), Err(Error::InvalidState(_))));
    assert!(r.has_changed(), "failed commit keeps pending changes");
  }

  #[test]
  fn clearing_not_null_fails_at_commit() {
    let store = ScriptedStore::new();
    let mut r = hydrated();
    r.clear_value(TITLE).unwrap();
    assert!(matches!(
      r.commit(&store),
      Err(Error::ConstraintViolation { .. })
    ));
    assert!(store.sql().is_empty());
  }

  #[test]
  fn change_value_unless_null_keeps_existing() {
    let mut r = hydrated();
    r.change_value_unless_null(RATING, None).unwrap();
    assert!(!r.has_changed());
    r.change_value_unless_null(RATING, Some(Decimal::new(3, 0))).unwrap();
    assert_eq!(r.changed_columns(), ["rating"]);
  }

  #[test]
  fn change_value_from_string_is_non_fatal() {
    let mut r = hydrated();
    let err = r.change_value_from_string(RATING, "tbd").unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(r.get(RATING).unwrap(), None);

    r.change_value_from_string(FIRST_AIRED, "Sep 22, 2004").unwrap();
    assert!(!r.changed_columns().contains(&"first_aired"));
  }

  #[test]
  fn typed_handle_must_match_column() {
    let mut r = hydrated();
    const WRONG: Field<i64> = Field::new("title");
    assert!(matches!(r.get(WRONG), Err(Error::TypeMismatch { .. })));
    assert!(matches!(
      r.change_value(WRONG, 3),
      Err(Error::TypeMismatch { .. })
    ));
    const MISSING: Field<i64> = Field::new("nope");
    assert!(matches!(r.get(MISSING), Err(Error::UnknownColumn { .. })));
  }

  #[test]
  fn revert_restores_loaded_values() {
    let mut r = hydrated();
    r.change_value(TITLE, "Other".into()).unwrap();
    r.revert_to_original();
    assert!(!r.has_changed());
    assert_eq!(r.get(TITLE).unwrap().as_deref(), Some("Lost"));
  }

  #[test]
  fn unique_key_nulls_never_collide() {
    let a = hydrated();
    let b = hydrated();
    assert_eq!(a.unique_key(0), b.unique_key(0));

    let mut c = hydrated();
    c.clear_value(TITLE).unwrap();
    assert_eq!(c.unique_key(0), None);
    assert_eq!(a.unique_key(5), None);
  }

  #[test]
  fn fetch_by_id_hydrates_first_row() {
    let store = ScriptedStore::new();
    store.rows.borrow_mut().push(stored_row());
    let r = Record::fetch_by_id(&store, &SHOW, 7).unwrap().unwrap();
    assert_eq!(r.id(), Some(7));
    assert_eq!(store.sql(), ["SELECT * FROM show WHERE id = ?1"]);

    store.rows.borrow_mut().clear();
    assert!(Record::fetch_by_id(&store, &SHOW, 8).unwrap().is_none());
  }
}
