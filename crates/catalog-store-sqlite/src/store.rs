//! [`SqliteStore`]: the SQLite implementation of [`Store`].

use std::path::Path;

use catalog_core::{Row, Schema, Store, Value};
use rusqlite::params_from_iter;
use tracing::{debug, info};

use crate::{
  Result,
  encode::{from_sql, to_sql},
  error::to_core,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A catalog store backed by a single SQLite file.
pub struct SqliteStore {
  conn: rusqlite::Connection,
}

/// What [`SqliteStore::ensure_schema`] changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaReport {
  pub created: Vec<&'static str>,
  /// `(table, column)` for every column added to an existing table.
  pub added:   Vec<(&'static str, &'static str)>,
}

impl SchemaReport {
  pub fn is_noop(&self) -> bool { self.created.is_empty() && self.added.is_empty() }
}

impl SqliteStore {
  /// Open (or create) a store at `path`.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = rusqlite::Connection::open(path)?;
    let mode: String =
      conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(%mode, "journal mode");
    Self::configure(conn)
  }

  /// Open an in-memory store, mostly for tests.
  pub fn open_in_memory() -> Result<Self> {
    Self::configure(rusqlite::Connection::open_in_memory()?)
  }

  fn configure(conn: rusqlite::Connection) -> Result<Self> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(Self { conn })
  }

  /// Bring the database up to date with `schema`: create missing tables,
  /// add missing columns, and create missing indexes. Running it against an
  /// up-to-date database changes nothing.
  ///
  /// Unique constraints are only created with their table; SQLite cannot
  /// add them to an existing one.
  pub fn ensure_schema(&self, schema: &Schema) -> Result<SchemaReport> {
    let mut report = SchemaReport::default();

    for &table in schema.tables() {
      let statements = match self.table_columns(table.name)? {
        None => {
          report.created.push(table.name);
          schema.synthesize_ddl(table)
        }
        Some(existing) => {
          report.added.extend(
            table
              .all_columns()
              .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(c.name)))
              .map(|c| (table.name, c.name)),
          );
          let mut statements = schema.synthesize_alter(table, &existing);
          statements.extend(schema.index_ddl(table));
          statements
        }
      };

      for sql in statements {
        debug!(%sql, "schema");
        self.conn.execute(&sql, [])?;
      }
    }

    if report.is_noop() {
      debug!("schema up to date");
    } else {
      info!(created = ?report.created, added = ?report.added, "schema updated");
    }
    Ok(report)
  }
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  fn execute(&self, sql: &str, params: &[Value]) -> catalog_core::Result<usize> {
    let mut stmt = self.conn.prepare_cached(sql).map_err(to_core)?;
    stmt
      .execute(params_from_iter(params.iter().map(to_sql)))
      .map_err(to_core)
  }

  fn insert(&self, sql: &str, params: &[Value]) -> catalog_core::Result<i64> {
    self.execute(sql, params)?;
    Ok(self.conn.last_insert_rowid())
  }

  fn query(&self, sql: &str, params: &[Value]) -> catalog_core::Result<Vec<Row>> {
    let mut stmt = self.conn.prepare_cached(sql).map_err(to_core)?;
    let names: Vec<String> =
      stmt.column_names().into_iter().map(str::to_owned).collect();

    let mut rows = stmt
      .query(params_from_iter(params.iter().map(to_sql)))
      .map_err(to_core)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(to_core)? {
      let mut values = Row::new();
      for (i, name) in names.iter().enumerate() {
        let raw = row.get_ref(i).map_err(to_core)?;
        values.push(name.as_str(), from_sql(name, raw)?);
      }
      out.push(values);
    }
    Ok(out)
  }

  fn table_columns(&self, table: &str) -> catalog_core::Result<Option<Vec<String>>> {
    let rows = self.query(&format!("PRAGMA table_info({table})"), &[])?;
    let columns: Vec<String> = rows
      .iter()
      .filter_map(|row| match row.get("name") {
        Some(Value::Text(name)) => Some(name.clone()),
        _ => None,
      })
      .collect();
    Ok((!columns.is_empty()).then_some(columns))
  }
}
