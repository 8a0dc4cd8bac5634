//! Persistence core for the media catalog.
//!
//! Typed, change-tracking records over a relational store, with soft
//! deletion ("retirement"), cascades along the ownership graph, and a
//! retention-windowed garbage collector.
//!
//! This crate has no database dependency. Backends implement [`Store`]; see
//! `catalog-store-sqlite`.

pub mod error;
pub mod field;
pub mod gc;
pub mod media;
pub mod parse;
pub mod reconcile;
pub mod record;
pub mod retire;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{Error, Result};
pub use field::{ColumnDef, DefaultValue, Field, FieldSlot, Nullability};
pub use record::{CommitOutcome, Record, RecordState, UniqueKey};
pub use schema::{Schema, TableDef};
pub use store::{Row, Store};
pub use value::{FieldType, SqlType, Value};
