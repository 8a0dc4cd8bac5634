//! Garbage collection: hard-deleting retired rows past a retention window.
//!
//! A sweep runs in two phases. First retirement is propagated down every
//! foreign key, root tables first, so no active row is left pointing at a
//! retired one. Then each retireable table is visited deepest-first and its
//! expired rows are deleted. A row still referenced by some remaining row is
//! never deleted, and join-table rows pointing at doomed rows are removed
//! first. A failure on one table is logged and the sweep moves on.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
  Result,
  retire::{self, ACTIVE},
  schema::{ID_COLUMN, Schema, TableDef},
  store::Store,
  value::Value,
};

/// Rows eligible for deletion; `?1` is the cutoff.
const EXPIRED: &str =
  "retired != 0 AND (retired_date < ?1 OR retired_date IS NULL)";

/// Outcome of sweeping one table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSweep {
  pub table:         &'static str,
  /// Rows of referencing tables retired just before this table was swept.
  pub propagated:    usize,
  /// Join-table rows deleted because they pointed at expired rows.
  pub edges_deleted: usize,
  pub deleted:       usize,
  /// Set when the table was skipped because of an error.
  pub error:         Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
  pub cutoff:     DateTime<Utc>,
  /// Rows retired by the up-front propagation pass.
  pub propagated: usize,
  /// Per table, in the order visited (deepest first).
  pub tables:     Vec<TableSweep>,
}

impl SweepReport {
  pub fn total_deleted(&self) -> usize { self.tables.iter().map(|t| t.deleted).sum() }

  pub fn failures(&self) -> impl Iterator<Item = &TableSweep> {
    self.tables.iter().filter(|t| t.error.is_some())
  }

  pub fn deleted_from(&self, table: &str) -> Option<usize> {
    self.tables.iter().find(|t| t.table == table).map(|t| t.deleted)
  }
}

/// The instant before which retired rows have expired. A window reaching
/// past the earliest representable date clamps to it, so nothing dated
/// expires.
pub fn cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
  now
    .checked_sub_signed(Duration::days(i64::from(retention_days)))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Delete every retired row retired more than `retention_days` ago, or with
/// no retirement date at all.
pub fn sweep<S: Store + ?Sized>(
  store: &S,
  schema: &Schema,
  retention_days: u32,
) -> SweepReport {
  sweep_as_of(store, schema, retention_days, Utc::now())
}

pub fn sweep_as_of<S: Store + ?Sized>(
  store: &S,
  schema: &Schema,
  retention_days: u32,
  now: DateTime<Utc>,
) -> SweepReport {
  let cutoff = cutoff(now, retention_days);
  info!(%cutoff, retention_days, "starting garbage collection");

  let propagated = retire::propagate_all(store, schema);

  let tables: Vec<&'static TableDef> = schema.retireable_tables().collect();
  let tables = tables
    .into_iter()
    .rev()
    .map(|table| {
      let mut result = TableSweep { table: table.name, ..Default::default() };
      if let Err(e) = sweep_table(store, schema, table, cutoff, &mut result) {
        error!(table = table.name, error = %e, "sweep failed; skipping table");
        result.error = Some(e.to_string());
      }
      result
    })
    .collect();

  let report = SweepReport { cutoff, propagated, tables };
  info!(
    deleted = report.total_deleted(),
    failed = report.failures().count(),
    "garbage collection finished"
  );
  report
}

fn sweep_table<S: Store + ?Sized>(
  store: &S,
  schema: &Schema,
  table: &'static TableDef,
  cutoff: DateTime<Utc>,
  result: &mut TableSweep,
) -> Result<()> {
  let references = schema.referencing(table.name);
  let cutoff = Value::Timestamp(cutoff);

  for r in references.iter().filter(|r| r.table.retireable) {
    result.propagated +=
      retire::propagate_retirement_across_reference(store, r.table, table)?;
  }

  for r in references.iter().filter(|r| !r.table.retireable) {
    let sql = format!(
      "DELETE FROM {e} WHERE {fk} IN (SELECT {ID_COLUMN} FROM {t} WHERE {EXPIRED})",
      e = r.table.name,
      fk = r.column.name,
      t = table.name,
    );
    debug!(%sql, "delete edges to expired rows");
    result.edges_deleted += store.execute(&sql, std::slice::from_ref(&cutoff))?;
  }

  let still_referenced: String = references
    .iter()
    .map(|r| {
      format!(
        " AND NOT EXISTS (SELECT 1 FROM {c} c WHERE c.{fk} = {t}.{ID_COLUMN})",
        c = r.table.name,
        fk = r.column.name,
        t = table.name,
      )
    })
    .collect();
  let sql = format!("DELETE FROM {} WHERE {EXPIRED}{still_referenced}", table.name);
  debug!(%sql, "delete expired rows");
  result.deleted = store.execute(&sql, std::slice::from_ref(&cutoff))?;

  let blocked = store.query_i64(
    &format!("SELECT COUNT(*) FROM {} WHERE {EXPIRED}", table.name),
    &[cutoff],
  );
  match blocked {
    Ok(0) => {}
    Ok(n) => warn!(table = table.name, rows = n, "expired rows kept: still referenced"),
    Err(e) => debug!(table = table.name, error = %e, "could not count kept rows"),
  }

  info!(
    table = table.name,
    deleted = result.deleted,
    edges = result.edges_deleted,
    propagated = result.propagated,
    "swept table"
  );
  Ok(())
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Active and retired row counts for one retireable table.
#[derive(Debug, Clone, Serialize)]
pub struct RetiredCount {
  pub table:   &'static str,
  pub active:  i64,
  pub retired: i64,
  /// Retired rows a sweep with the same retention would delete (ignoring
  /// rows kept because they are still referenced).
  pub expired: i64,
}

/// Count active, retired, and expired rows in every retireable table.
/// Tables that fail to report are logged and left out.
pub fn retired_counts<S: Store + ?Sized>(
  store: &S,
  schema: &Schema,
  retention_days: u32,
  now: DateTime<Utc>,
) -> Vec<RetiredCount> {
  let cutoff = Value::Timestamp(cutoff(now, retention_days));
  schema
    .retireable_tables()
    .filter_map(|table| {
      let counts = (|| -> Result<RetiredCount> {
        Ok(RetiredCount {
          table:   table.name,
          active:  store.query_i64(
            &format!("SELECT COUNT(*) FROM {} WHERE {ACTIVE}", table.name),
            &[],
          )?,
          retired: store.query_i64(
            &format!("SELECT COUNT(*) FROM {} WHERE retired != 0", table.name),
            &[],
          )?,
          expired: store.query_i64(
            &format!("SELECT COUNT(*) FROM {} WHERE {EXPIRED}", table.name),
            std::slice::from_ref(&cutoff),
          )?,
        })
      })();
      counts
        .inspect_err(|e| error!(table = table.name, error = %e, "count failed"))
        .ok()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;
  use crate::{
    field::ColumnDef,
    record::tests::{SHOW, ScriptedStore},
  };

  static EP_COLUMNS: [ColumnDef; 1] =
    [ColumnDef::foreign_key("show_id", "show").not_null()];
  static EP: TableDef = TableDef::new("ep", &EP_COLUMNS).retireable();

  static LINK_COLUMNS: [ColumnDef; 1] =
    [ColumnDef::foreign_key("show_id", "show").not_null()];
  static LINK: TableDef = TableDef::new("link", &LINK_COLUMNS);

  fn schema() -> Schema { Schema::with_tables(&[&SHOW, &EP, &LINK]).unwrap() }

  fn quiet_store() -> ScriptedStore {
    let store = ScriptedStore::new();
    *store.affected.borrow_mut() = 0;
    store
  }

  #[test]
  fn cutoff_subtracts_whole_days() {
    let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
    assert_eq!(cutoff(now, 30), Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    assert_eq!(cutoff(now, 0), now);
  }

  #[test]
  fn oversized_retention_clamps_instead_of_overflowing() {
    let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
    assert_eq!(cutoff(now, 100_000_000), DateTime::<Utc>::MIN_UTC);
    assert_eq!(cutoff(now, u32::MAX), DateTime::<Utc>::MIN_UTC);

    let report = sweep_as_of(&quiet_store(), &schema(), u32::MAX, now);
    assert_eq!(report.cutoff, DateTime::<Utc>::MIN_UTC);
    assert!(report.failures().next().is_none());
  }

  #[test]
  fn sweep_visits_children_before_parents() {
    let store = quiet_store();
    let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
    let report = sweep_as_of(&store, &schema(), 30, now);

    let order: Vec<&str> = report.tables.iter().map(|t| t.table).collect();
    assert_eq!(order, ["ep", "show"]);
    assert_eq!(report.cutoff, cutoff(now, 30));
    assert!(report.failures().next().is_none());

    let sql = store.sql();
    let ep_delete = sql
      .iter()
      .position(|s| s.starts_with("DELETE FROM ep "))
      .unwrap();
    let show_delete = sql
      .iter()
      .position(|s| s.starts_with("DELETE FROM show "))
      .unwrap();
    let link_delete = sql
      .iter()
      .position(|s| s.starts_with("DELETE FROM link "))
      .unwrap();
    assert!(ep_delete < link_delete && link_delete < show_delete);
  }

  #[test]
  fn parent_delete_is_guarded_by_every_reference() {
    let store = quiet_store();
    sweep_as_of(&store, &schema(), 7, Utc::now());
    let sql = store.sql();
    let show_delete = sql
      .iter()
      .find(|s| s.starts_with("DELETE FROM show "))
      .unwrap();
    assert_eq!(
      show_delete,
      "DELETE FROM show WHERE retired != 0 AND (retired_date < ?1 OR retired_date IS NULL) \
       AND NOT EXISTS (SELECT 1 FROM ep c WHERE c.show_id = show.id) \
       AND NOT EXISTS (SELECT 1 FROM link c WHERE c.show_id = show.id)"
    );
  }

  #[test]
  fn edge_rows_to_expired_parents_are_removed() {
    let store = quiet_store();
    sweep_as_of(&store, &schema(), 7, Utc::now());
    assert!(store.sql().contains(
      &"DELETE FROM link WHERE show_id IN (SELECT id FROM show WHERE retired != 0 \
        AND (retired_date < ?1 OR retired_date IS NULL))"
        .to_owned()
    ));
  }

  #[test]
  fn counts_skip_nothing_on_success() {
    let store = quiet_store();
    let counts = retired_counts(&store, &schema(), 30, Utc::now());
    let tables: Vec<&str> = counts.iter().map(|c| c.table).collect();
    assert_eq!(tables, ["show", "ep"]);
    assert!(counts.iter().all(|c| c.active == 0 && c.retired == 0));
  }
}
