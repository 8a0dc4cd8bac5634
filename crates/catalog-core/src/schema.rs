//! Table descriptors and the schema registry.
//!
//! Every record type is declared as a `static` [`TableDef`]. At startup the
//! application registers them, parents before children, into a [`Schema`],
//! which is then passed by reference to anything that needs to enumerate
//! tables: DDL synthesis, retirement cascades, and the garbage collector.

use rust_decimal::Decimal;
use tracing::warn;

use crate::{
  Error, Result,
  field::{ColumnDef, DefaultValue},
};

/// Name of the server-assigned integer primary key on every table.
pub const ID_COLUMN: &str = "id";

/// Columns appended to every retireable table. `retired` is 0 for an active
/// row and equal to the row's own id once retired.
pub static RETIREMENT_COLUMNS: [ColumnDef; 2] = [
  ColumnDef::integer("retired")
    .not_null()
    .default(DefaultValue::Integer(0)),
  ColumnDef::timestamp("retired_date"),
];

// ─── TableDef ────────────────────────────────────────────────────────────────

/// Static description of one table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableDef {
  pub name:       &'static str,
  /// Declared columns, excluding `id` and the retirement columns.
  pub columns:    &'static [ColumnDef],
  /// Groups of columns whose combined values must be unique per row.
  pub unique:     &'static [&'static [&'static str]],
  /// Groups of columns to index for lookup.
  pub indexes:    &'static [&'static [&'static str]],
  pub retireable: bool,
}

/// A foreign-key column and the table it points at.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
  pub column: &'static ColumnDef,
  pub target: &'static str,
}

impl TableDef {
  pub const fn new(name: &'static str, columns: &'static [ColumnDef]) -> Self {
    Self { name, columns, unique: &[], indexes: &[], retireable: false }
  }

  pub const fn unique(mut self, groups: &'static [&'static [&'static str]]) -> Self {
    self.unique = groups;
    self
  }

  pub const fn indexes(mut self, groups: &'static [&'static [&'static str]]) -> Self {
    self.indexes = groups;
    self
  }

  pub const fn retireable(mut self) -> Self {
    self.retireable = true;
    self
  }

  /// Declared columns followed by the retirement columns, if any. Does not
  /// include `id`.
  pub fn all_columns(&self) -> impl Iterator<Item = &'static ColumnDef> + use<> {
    let retirement: &'static [ColumnDef] = if self.retireable {
      &RETIREMENT_COLUMNS
    } else {
      &[]
    };
    self.columns.iter().chain(retirement.iter())
  }

  pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
    self.all_columns().find(|c| c.name.eq_ignore_ascii_case(name))
  }

  pub fn has_column(&self, name: &str) -> bool {
    name.eq_ignore_ascii_case(ID_COLUMN) || self.column(name).is_some()
  }

  pub fn foreign_keys(&self) -> impl Iterator<Item = ForeignKey> + use<> {
    self.columns.iter().filter_map(|column| {
      column.references.map(|target| ForeignKey { column, target })
    })
  }

  /// Foreign keys of this table that point at `target`.
  pub fn foreign_keys_to(&self, target: &str) -> Vec<ForeignKey> {
    self.foreign_keys().filter(|fk| fk.target == target).collect()
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// A table that references another, and through which column.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
  pub table:  &'static TableDef,
  pub column: &'static ColumnDef,
}

/// The registry of all tables known to the application.
///
/// Iteration order is registration order. Registration rejects a foreign key
/// to a table that is not yet registered, so that order is always a valid
/// root-first walk of the ownership graph.
#[derive(Debug, Default, Clone)]
pub struct Schema {
  tables: Vec<&'static TableDef>,
}

impl Schema {
  pub fn new() -> Self { Self::default() }

  pub fn with_tables(tables: &[&'static TableDef]) -> Result<Self> {
    let mut schema = Self::new();
    for table in tables {
      schema.register_table(table)?;
    }
    Ok(schema)
  }

  /// Register a table. Registering the same definition twice is a no-op.
  pub fn register_table(&mut self, table: &'static TableDef) -> Result<()> {
    if let Some(existing) = self.find(table.name) {
      if existing == table {
        return Ok(());
      }
      return Err(Error::invalid_state(format!(
        "table {} registered twice with different definitions",
        table.name
      )));
    }

    for column in table.columns {
      if column.name.eq_ignore_ascii_case(ID_COLUMN)
        || (table.retireable
          && RETIREMENT_COLUMNS
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(column.name)))
      {
        return Err(Error::invalid_state(format!(
          "{}.{} is a reserved column name",
          table.name, column.name
        )));
      }
    }

    for column in table.columns {
      if let Some(DefaultValue::Numeric(literal)) = column.default {
        if !is_decimal_literal(literal) {
          return Err(Error::invalid_state(format!(
            "{}.{} has an invalid decimal default {literal:?}",
            table.name, column.name
          )));
        }
      }
    }

    for fk in table.foreign_keys() {
      if fk.target != table.name && self.find(fk.target).is_none() {
        return Err(Error::invalid_state(format!(
          "{}.{} references {}, which must be registered first",
          table.name, fk.column.name, fk.target
        )));
      }
    }

    for group in table.unique.iter().chain(table.indexes) {
      if group.is_empty() {
        return Err(Error::invalid_state(format!(
          "empty unique/index group on {}",
          table.name
        )));
      }
      if let Some(missing) = group.iter().find(|c| !table.has_column(c)) {
        return Err(Error::UnknownColumn {
          table:  table.name.to_owned(),
          column: (*missing).to_owned(),
        });
      }
    }

    self.tables.push(table);
    Ok(())
  }

  /// All registered tables, root tables first.
  pub fn tables(&self) -> &[&'static TableDef] { &self.tables }

  pub fn retireable_tables(&self) -> impl Iterator<Item = &'static TableDef> + '_ {
    self.tables.iter().copied().filter(|t| t.retireable)
  }

  fn find(&self, name: &str) -> Option<&'static TableDef> {
    self.tables.iter().copied().find(|t| t.name == name)
  }

  pub fn table(&self, name: &str) -> Result<&'static TableDef> {
    self.find(name).ok_or_else(|| Error::UnknownTable(name.to_owned()))
  }

  /// Every (table, column) pair with a foreign key to `target`, in
  /// registration order.
  pub fn referencing(&self, target: &str) -> Vec<Reference> {
    self
      .tables
      .iter()
      .copied()
      .flat_map(|table| {
        table
          .foreign_keys_to(target)
          .into_iter()
          .map(move |fk| Reference { table, column: fk.column })
      })
      .collect()
  }

  // ── DDL ───────────────────────────────────────────────────────────────────

  /// `CREATE TABLE IF NOT EXISTS` plus its indexes. Running the result
  /// against a database that already has the table changes nothing.
  pub fn synthesize_ddl(&self, table: &TableDef) -> Vec<String> {
    let mut lines = vec![format!("{ID_COLUMN} INTEGER PRIMARY KEY AUTOINCREMENT")];
    lines.extend(table.all_columns().map(column_ddl));
    lines.extend(
      table
        .unique
        .iter()
        .map(|group| format!("UNIQUE ({})", group.join(", "))),
    );

    let mut statements = vec![format!(
      "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
      table.name,
      lines.join(",\n    ")
    )];
    statements.extend(self.index_ddl(table));
    statements
  }

  /// `CREATE INDEX IF NOT EXISTS` for every declared index group.
  pub fn index_ddl(&self, table: &TableDef) -> Vec<String> {
    table
      .indexes
      .iter()
      .map(|group| {
        format!(
          "CREATE INDEX IF NOT EXISTS {}_{}_idx ON {} ({})",
          table.name,
          group.join("_"),
          table.name,
          group.join(", ")
        )
      })
      .collect()
  }

  /// `ALTER TABLE ... ADD COLUMN` for each declared column missing from
  /// `existing`. Empty when the table is already up to date.
  ///
  /// Added NOT NULL columns need a constant default; without one the column
  /// is added as nullable and a warning is logged.
  pub fn synthesize_alter(&self, table: &TableDef, existing: &[String]) -> Vec<String> {
    table
      .all_columns()
      .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(c.name)))
      .map(|column| {
        let mut column = *column;
        if column.is_not_null()
          && column.default.and_then(DefaultValue::sql_literal).is_none()
        {
          warn!(
            table = table.name,
            column = column.name,
            "adding NOT NULL column without a constant default as nullable"
          );
          column.nullability = crate::field::Nullability::Nullable;
        }
        format!("ALTER TABLE {} ADD COLUMN {}", table.name, column_ddl(&column))
      })
      .collect()
  }
}

/// A plain decimal that both parses and is safe to emit as a SQL literal.
fn is_decimal_literal(literal: &str) -> bool {
  literal.parse::<Decimal>().is_ok()
    && literal
      .chars()
      .enumerate()
      .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && c == '-'))
}

fn column_ddl(column: &ColumnDef) -> String {
  let mut ddl = format!("{} {}", column.name, column.sql_type.ddl_type());
  if column.is_not_null() {
    ddl.push_str(" NOT NULL");
  }
  if let Some(literal) = column.default.and_then(DefaultValue::sql_literal) {
    ddl.push_str(" DEFAULT ");
    ddl.push_str(&literal);
  }
  if let Some(target) = column.references {
    ddl.push_str(&format!(" REFERENCES {target}({ID_COLUMN})"));
  }
  ddl
}

#[cfg(test)]
mod tests {
  use super::*;

  static PARENT_COLUMNS: [ColumnDef; 1] = [ColumnDef::text("name").not_null()];
  static PARENT: TableDef = TableDef::new("parent", &PARENT_COLUMNS)
    .unique(&[&["name", "retired"]])
    .retireable();

  static CHILD_COLUMNS: [ColumnDef; 2] = [
    ColumnDef::foreign_key("parent_id", "parent").not_null(),
    ColumnDef::boolean("flag").not_null().default(DefaultValue::Bool(false)),
  ];
  static CHILD: TableDef = TableDef::new("child", &CHILD_COLUMNS)
    .indexes(&[&["parent_id"]])
    .retireable();

  static EDGE_COLUMNS: [ColumnDef; 1] =
    [ColumnDef::foreign_key("child_id", "child").not_null()];
  static EDGE: TableDef = TableDef::new("edge", &EDGE_COLUMNS);

  static BAD_GROUP: TableDef =
    TableDef::new("bad", &PARENT_COLUMNS).unique(&[&["nope"]]);

  static RESERVED_COLUMNS: [ColumnDef; 1] = [ColumnDef::integer("retired")];
  static RESERVED: TableDef =
    TableDef::new("reserved", &RESERVED_COLUMNS).retireable();

  static BAD_DEFAULT_COLUMNS: [ColumnDef; 1] =
    [ColumnDef::numeric("score").default(DefaultValue::Numeric("7,5"))];
  static BAD_DEFAULT: TableDef = TableDef::new("bad_default", &BAD_DEFAULT_COLUMNS);

  static GOOD_DEFAULT_COLUMNS: [ColumnDef; 1] =
    [ColumnDef::numeric("score").default(DefaultValue::Numeric("-7.50"))];
  static GOOD_DEFAULT: TableDef =
    TableDef::new("good_default", &GOOD_DEFAULT_COLUMNS);

  #[test]
  fn register_is_idempotent() {
    let mut schema = Schema::new();
    schema.register_table(&PARENT).unwrap();
    schema.register_table(&PARENT).unwrap();
    assert_eq!(schema.tables().len(), 1);
  }

  #[test]
  fn register_requires_parents_first() {
    let mut schema = Schema::new();
    let err = schema.register_table(&CHILD).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    schema.register_table(&PARENT).unwrap();
    schema.register_table(&CHILD).unwrap();
    schema.register_table(&EDGE).unwrap();
    let names: Vec<_> = schema.tables().iter().map(|t| t.name).collect();
    assert_eq!(names, ["parent", "child", "edge"]);
  }

  #[test]
  fn register_rejects_unknown_group_columns() {
    let err = Schema::with_tables(&[&BAD_GROUP]).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn { .. }));
  }

  #[test]
  fn register_rejects_reserved_names() {
    let err = Schema::with_tables(&[&RESERVED]).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
  }

  #[test]
  fn register_validates_decimal_defaults() {
    let err = Schema::with_tables(&[&BAD_DEFAULT]).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let schema = Schema::with_tables(&[&GOOD_DEFAULT]).unwrap();
    assert!(
      schema.synthesize_ddl(&GOOD_DEFAULT)[0]
        .contains("score DECIMAL_TEXT DEFAULT -7.50")
    );
    assert!(!is_decimal_literal("1e3"));
    assert!(!is_decimal_literal("1; DROP TABLE x"));
  }

  #[test]
  fn referencing_lists_children() {
    let schema = Schema::with_tables(&[&PARENT, &CHILD, &EDGE]).unwrap();
    let refs = schema.referencing("child");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].table.name, "edge");
    assert_eq!(refs[0].column.name, "child_id");
    assert!(schema.referencing("edge").is_empty());
  }

  #[test]
  fn create_table_ddl() {
    let schema = Schema::with_tables(&[&PARENT, &CHILD]).unwrap();
    let ddl = schema.synthesize_ddl(&PARENT);
    assert_eq!(ddl.len(), 1);
    assert_eq!(
      ddl[0],
      "CREATE TABLE IF NOT EXISTS parent (\n    \
       id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
       name TEXT NOT NULL,\n    \
       retired INTEGER NOT NULL DEFAULT 0,\n    \
       retired_date TIMESTAMP,\n    \
       UNIQUE (name, retired)\n)"
    );
  }

  #[test]
  fn child_ddl_has_fk_and_index() {
    let schema = Schema::with_tables(&[&PARENT, &CHILD]).unwrap();
    let ddl = schema.synthesize_ddl(&CHILD);
    assert!(ddl[0].contains("parent_id INTEGER NOT NULL REFERENCES parent(id)"));
    assert!(ddl[0].contains("flag BOOLEAN NOT NULL DEFAULT 0"));
    assert_eq!(
      ddl[1],
      "CREATE INDEX IF NOT EXISTS child_parent_id_idx ON child (parent_id)"
    );
  }

  #[test]
  fn alter_adds_only_missing_columns() {
    let schema = Schema::with_tables(&[&PARENT, &CHILD]).unwrap();
    let existing = vec![
      "id".to_owned(),
      "PARENT_ID".to_owned(),
      "retired".to_owned(),
    ];
    let alter = schema.synthesize_alter(&CHILD, &existing);
    assert_eq!(
      alter,
      [
        "ALTER TABLE child ADD COLUMN flag BOOLEAN NOT NULL DEFAULT 0",
        "ALTER TABLE child ADD COLUMN retired_date TIMESTAMP",
      ]
    );

    let complete: Vec<String> = ["id", "parent_id", "flag", "retired", "retired_date"]
      .iter()
      .map(|s| s.to_string())
      .collect();
    assert!(schema.synthesize_alter(&CHILD, &complete).is_empty());
  }

  #[test]
  fn alter_relaxes_not_null_without_default() {
    let schema = Schema::with_tables(&[&PARENT]).unwrap();
    let alter = schema.synthesize_alter(&PARENT, &["id".to_owned()]);
    assert_eq!(alter[0], "ALTER TABLE parent ADD COLUMN name TEXT");
  }
}
