//! Soft deletion ("retirement") and its cascades.
//!
//! A retireable row is active while `retired = 0` and retired once
//! `retired = id`. Tagging a retired row with its own id keeps the column
//! NOT NULL and lets a unique group that includes `retired` admit one active
//! row per key alongside any number of retired ones.
//!
//! Single rows are retired with [`Record::retire`] followed by a commit. The
//! bulk operations here cascade retirement along foreign keys. Each one is a
//! single autocommit statement and is idempotent, so a cascade interrupted
//! halfway can simply be run again.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::{
  Error, Result,
  field::Field,
  record::Record,
  schema::{ID_COLUMN, Schema, TableDef},
  store::Store,
  value::Value,
};

pub const RETIRED: Field<i64> = Field::new("retired");
pub const RETIRED_DATE: Field<DateTime<Utc>> = Field::new("retired_date");

/// The predicate matching active rows.
pub const ACTIVE: &str = "retired = 0";

fn expect_retireable(table: &TableDef) -> Result<()> {
  if !table.retireable {
    return Err(Error::invalid_state(format!(
      "{} is not a retireable table",
      table.name
    )));
  }
  Ok(())
}

// ─── Single-row transitions ──────────────────────────────────────────────────

impl Record {
  pub fn is_retired(&self) -> Result<bool> {
    expect_retireable(self.table())?;
    Ok(self.get(RETIRED)?.is_some_and(|r| r != 0))
  }

  pub fn retired_date(&self) -> Result<Option<DateTime<Utc>>> {
    expect_retireable(self.table())?;
    self.get(RETIRED_DATE)
  }

  /// Mark this row retired as of now. Already-retired rows keep their
  /// original retirement date. Must be followed by a commit.
  pub fn retire(&mut self) -> Result<()> { self.retire_at(Utc::now()) }

  pub fn retire_at(&mut self, when: DateTime<Utc>) -> Result<()> {
    expect_retireable(self.table())?;
    let id = self.id().ok_or_else(|| {
      Error::invalid_state(format!(
        "cannot retire a {} row before it has an id",
        self.table_name()
      ))
    })?;
    if self.get(RETIRED)? == Some(id) {
      return Ok(());
    }
    self.change_value(RETIRED, id)?;
    self.change_value(RETIRED_DATE, when)
  }

  /// Make this row active again. Must be followed by a commit.
  pub fn un_retire(&mut self) -> Result<()> {
    expect_retireable(self.table())?;
    if self.get(RETIRED)? == Some(0) {
      return Ok(());
    }
    self.change_value(RETIRED, 0)?;
    self.clear_value(RETIRED_DATE)
  }
}

// ─── Cascades ────────────────────────────────────────────────────────────────

/// Retire every active row of `child` whose foreign key points at `parent`,
/// stamping them with the parent's retirement date.
///
/// The parent must be retired and committed, and `child` must have exactly
/// one foreign key to the parent's table.
pub fn retire_children_of<S: Store + ?Sized>(
  store: &S,
  parent: &Record,
  child: &TableDef,
) -> Result<usize> {
  expect_retireable(child)?;
  let parent_id = parent.id().ok_or_else(|| {
    Error::invalid_state("cannot cascade from a parent without an id")
  })?;
  if !parent.is_retired()? || parent.has_changed() {
    return Err(Error::invalid_state(format!(
      "{} row {parent_id} must be retired and committed before cascading",
      parent.table_name()
    )));
  }

  let fks = child.foreign_keys_to(parent.table_name());
  let [fk] = fks.as_slice() else {
    return Err(Error::invalid_state(format!(
      "{} has {} foreign keys to {}; expected exactly one",
      child.name,
      fks.len(),
      parent.table_name()
    )));
  };

  let sql = format!(
    "UPDATE {child} SET retired = {ID_COLUMN}, retired_date = ?1 \
     WHERE {fk} = ?2 AND {ACTIVE}",
    child = child.name,
    fk = fk.column.name,
  );
  let retired_date = Value::from(parent.retired_date()?);

  debug!(%sql, parent_id, "retire children");
  let n = store.execute(&sql, &[retired_date, Value::Integer(parent_id)])?;
  info!(
    parent = parent.table_name(),
    parent_id,
    child = child.name,
    retired = n,
    "cascaded retirement"
  );
  Ok(n)
}

/// Retire every active row of `table` that references an already-retired
/// row of `ref_table`, copying that row's retirement date.
///
/// Unlike [`retire_children_of`], this catches rows whose parent was retired
/// by some other path, and keeps "no active row references a retired row"
/// eventually true.
pub fn propagate_retirement_across_reference<S: Store + ?Sized>(
  store: &S,
  table: &TableDef,
  ref_table: &TableDef,
) -> Result<usize> {
  expect_retireable(table)?;
  expect_retireable(ref_table)?;

  let fks = table.foreign_keys_to(ref_table.name);
  if fks.is_empty() {
    return Err(Error::invalid_state(format!(
      "{} has no foreign key to {}",
      table.name, ref_table.name
    )));
  }

  let mut total = 0;
  for fk in fks {
    let sql = format!(
      "UPDATE {t} SET retired = {ID_COLUMN}, retired_date = \
         (SELECT r.retired_date FROM {r} r WHERE r.{ID_COLUMN} = {t}.{fk}) \
       WHERE {t}.{ACTIVE} \
         AND {t}.{fk} IN (SELECT {ID_COLUMN} FROM {r} WHERE retired != 0)",
      t = table.name,
      r = ref_table.name,
      fk = fk.column.name,
    );
    debug!(%sql, "propagate retirement");
    total += store.execute(&sql, &[])?;
  }
  if total > 0 {
    info!(
      table = table.name,
      reference = ref_table.name,
      retired = total,
      "propagated retirement"
    );
  }
  Ok(total)
}

/// Run [`propagate_retirement_across_reference`] over every foreign key
/// between retireable tables, root tables first, until nothing changes.
///
/// Failures on one edge are logged and skipped. Returns the number of rows
/// retired.
pub fn propagate_all<S: Store + ?Sized>(store: &S, schema: &Schema) -> usize {
  let mut total = 0;
  // Registration order is root-first, so one pass normally reaches the
  // leaves; extra passes only matter for self-references.
  for _ in 0..=schema.tables().len() {
    let mut pass = 0;
    for table in schema.retireable_tables() {
      let mut targets: Vec<&str> = table.foreign_keys().map(|fk| fk.target).collect();
      targets.sort_unstable();
      targets.dedup();
      for target in targets {
        let Ok(ref_table) = schema.table(target) else { continue };
        if !ref_table.retireable {
          continue;
        }
        match propagate_retirement_across_reference(store, table, ref_table) {
          Ok(n) => pass += n,
          Err(e) => error!(
            table = table.name,
            reference = ref_table.name,
            error = %e,
            "propagation failed; skipping"
          ),
        }
      }
    }
    total += pass;
    if pass == 0 {
      break;
    }
  }
  total
}

// ─── Edge tables ─────────────────────────────────────────────────────────────

fn expect_edge(table: &TableDef) -> Result<()> {
  if table.retireable {
    return Err(Error::invalid_state(format!(
      "{} is retireable; retire its rows instead of deleting them",
      table.name
    )));
  }
  Ok(())
}

/// Hard-delete the rows of a non-retireable join table that point at
/// `parent`. Join rows have no lifecycle of their own.
pub fn delete_edges_of<S: Store + ?Sized>(
  store: &S,
  parent: &Record,
  edge: &TableDef,
) -> Result<usize> {
  expect_edge(edge)?;
  let parent_id = parent.id().ok_or_else(|| {
    Error::invalid_state("cannot delete edges of a parent without an id")
  })?;

  let mut total = 0;
  for fk in edge.foreign_keys_to(parent.table_name()) {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", edge.name, fk.column.name);
    debug!(%sql, parent_id, "delete edges");
    total += store.execute(&sql, &[Value::Integer(parent_id)])?;
  }
  Ok(total)
}

/// Hard-delete the rows of a non-retireable join table that point at any
/// retired row of `ref_table`.
pub fn delete_edges_referencing_retired<S: Store + ?Sized>(
  store: &S,
  edge: &TableDef,
  ref_table: &TableDef,
) -> Result<usize> {
  expect_edge(edge)?;
  expect_retireable(ref_table)?;

  let mut total = 0;
  for fk in edge.foreign_keys_to(ref_table.name) {
    let sql = format!(
      "DELETE FROM {e} WHERE {fk} IN \
       (SELECT {ID_COLUMN} FROM {r} WHERE retired != 0)",
      e = edge.name,
      fk = fk.column.name,
      r = ref_table.name,
    );
    debug!(%sql, "delete edges to retired rows");
    total += store.execute(&sql, &[])?;
  }
  Ok(total)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;
  use crate::{
    field::ColumnDef,
    record::tests::{SHOW, ScriptedStore},
    store::Row,
  };

  static EPISODE_COLUMNS: [ColumnDef; 1] =
    [ColumnDef::foreign_key("show_id", "show").not_null()];
  static EPISODE: TableDef = TableDef::new("ep", &EPISODE_COLUMNS).retireable();

  static TWO_FK_COLUMNS: [ColumnDef; 2] = [
    ColumnDef::foreign_key("a_id", "show"),
    ColumnDef::foreign_key("b_id", "show"),
  ];
  static TWO_FK: TableDef = TableDef::new("pair", &TWO_FK_COLUMNS).retireable();

  static LINK_COLUMNS: [ColumnDef; 1] =
    [ColumnDef::foreign_key("show_id", "show").not_null()];
  static LINK: TableDef = TableDef::new("link", &LINK_COLUMNS);

  fn show(retired: i64, date: Value) -> Record {
    let row = Row::new()
      .with("id", 3_i64)
      .with("title", "Lost")
      .with("rating", Value::Null)
      .with("suggestion", false)
      .with("first_aired", Value::Null)
      .with("retired", retired)
      .with("retired_date", date);
    let mut r = Record::new(&SHOW);
    r.initialize_from_db_object(&row).unwrap();
    r
  }

  #[test]
  fn retire_sets_self_id_and_is_idempotent() {
    let mut r = show(0, Value::Null);
    let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    r.retire_at(when).unwrap();
    assert_eq!(r.get(RETIRED).unwrap(), Some(3));
    assert_eq!(r.retired_date().unwrap(), Some(when));
    assert!(r.is_retired().unwrap());

    let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    r.retire_at(later).unwrap();
    assert_eq!(r.retired_date().unwrap(), Some(when), "date is kept");
  }

  #[test]
  fn un_retire_round_trip() {
    let mut r = show(3, Value::Text("2024-01-01T00:00:00Z".into()));
    assert!(r.is_retired().unwrap());
    r.un_retire().unwrap();
    assert_eq!(r.get(RETIRED).unwrap(), Some(0));
    assert_eq!(r.retired_date().unwrap(), None);
    r.un_retire().unwrap();
    assert!(!r.is_retired().unwrap());

    r.retire().unwrap();
    assert!(r.is_retired().unwrap());
  }

  #[test]
  fn retire_requires_id() {
    let mut r = Record::new(&SHOW);
    r.initialize_for_insert().unwrap();
    assert!(matches!(r.retire(), Err(Error::InvalidState(_))));
  }

  #[test]
  fn retire_requires_retireable_table() {
    let mut r = Record::new(&LINK);
    r.initialize_for_insert().unwrap();
    assert!(matches!(r.is_retired(), Err(Error::InvalidState(_))));
  }

  #[test]
  fn cascade_requires_committed_retired_parent() {
    let store = ScriptedStore::new();
    let active = show(0, Value::Null);
    assert!(retire_children_of(&store, &active, &EPISODE).is_err());

    let mut pending = show(0, Value::Null);
    pending.retire().unwrap();
    assert!(retire_children_of(&store, &pending, &EPISODE).is_err());
    assert!(store.sql().is_empty());
  }

  #[test]
  fn cascade_statement() {
    let store = ScriptedStore::new();
    let parent = show(3, Value::Text("2024-01-01T00:00:00Z".into()));
    retire_children_of(&store, &parent, &EPISODE).unwrap();

    let statements = store.statements.borrow();
    assert_eq!(
      statements[0].0,
      "UPDATE ep SET retired = id, retired_date = ?1 WHERE show_id = ?2 AND retired = 0"
    );
    assert_eq!(
      statements[0].1,
      vec![
        Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        Value::Integer(3)
      ]
    );
  }

  #[test]
  fn cascade_rejects_ambiguous_foreign_key() {
    let store = ScriptedStore::new();
    let parent = show(3, Value::Null);
    assert!(matches!(
      retire_children_of(&store, &parent, &TWO_FK),
      Err(Error::InvalidState(_))
    ));
  }

  #[test]
  fn propagate_covers_every_foreign_key() {
    let store = ScriptedStore::new();
    let n = propagate_retirement_across_reference(&store, &TWO_FK, &SHOW).unwrap();
    assert_eq!(n, 2);
    let sql = store.sql();
    assert!(sql[0].contains("pair.a_id IN (SELECT id FROM show WHERE retired != 0)"));
    assert!(sql[1].contains("pair.b_id IN (SELECT id FROM show WHERE retired != 0)"));
  }

  #[test]
  fn propagate_rejects_unrelated_tables() {
    let store = ScriptedStore::new();
    assert!(propagate_retirement_across_reference(&store, &SHOW, &EPISODE).is_err());
    assert!(propagate_retirement_across_reference(&store, &LINK, &SHOW).is_err());
  }

  #[test]
  fn edges_are_deleted_not_retired() {
    let store = ScriptedStore::new();
    let parent = show(3, Value::Null);
    delete_edges_of(&store, &parent, &LINK).unwrap();
    assert_eq!(store.sql(), ["DELETE FROM link WHERE show_id = ?1"]);
    assert!(delete_edges_of(&store, &parent, &EPISODE).is_err());
  }
}
