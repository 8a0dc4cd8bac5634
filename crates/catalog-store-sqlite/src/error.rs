//! Error type for `catalog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] catalog_core::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Translate a driver error for the core: constraint failures become
/// [`catalog_core::Error::ConstraintViolation`], everything else is wrapped
/// as [`catalog_core::Error::Store`].
///
/// SQLite names the first offending column as `table.column` after the colon
/// in its message (`UNIQUE constraint failed: episode.tvdb_episode_ext_id,
/// episode.retired`), which is used when present.
pub(crate) fn to_core(e: rusqlite::Error) -> catalog_core::Error {
  match e {
    rusqlite::Error::SqliteFailure(failure, message)
      if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      let detail = message.unwrap_or_else(|| failure.to_string());
      let (table, column) = detail
        .split_once(": ")
        .and_then(|(_, names)| names.split(", ").next())
        .and_then(|first| first.split_once('.'))
        .map(|(t, c)| (Some(t.to_owned()), Some(c.to_owned())))
        .unwrap_or_default();
      catalog_core::Error::ConstraintViolation { table, column, detail }
    }
    other => catalog_core::Error::Store(Box::new(other)),
  }
}
