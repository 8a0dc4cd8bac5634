//! SQLite backend for the catalog persistence core.
//!
//! Wraps a single [`rusqlite::Connection`]. Every [`Store`] call is one
//! blocking statement in its own autocommit unit.
//!
//! [`Store`]: catalog_core::Store

mod encode;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SchemaReport, SqliteStore};
