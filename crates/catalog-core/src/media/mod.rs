//! The media catalog's tables and the ownership-graph walks over them.
//!
//! Ownership, root first:
//!
//! ```text
//! series ─┬─ season
//!         ├─ episode ─┬─ episode_rating
//!         │           ├─ match_log (episode_id, optional)
//!         │           └─ group_rating_episode (edge)
//!         ├─ episode_group_rating ── group_rating_episode (edge)
//!         ├─ match_log
//!         └─ series_viewing_location (edge) ── viewing_location
//! ```
//!
//! Each table lives in its own module holding its [`TableDef`] as `TABLE`
//! and a typed [`Field`] handle per column.

mod duplicates;
mod walk;

pub use duplicates::{DuplicateResolution, resolve_duplicate_episodes};
pub use walk::{CascadeStep, SeriesRetirement, retire_series};

use crate::{Result, schema::Schema};

/// Every media table, in registration (root-first) order.
pub fn tables() -> [&'static crate::schema::TableDef; 9] {
  [
    &viewing_location::TABLE,
    &series::TABLE,
    &season::TABLE,
    &episode::TABLE,
    &episode_rating::TABLE,
    &episode_group_rating::TABLE,
    &group_rating_episode::TABLE,
    &match_log::TABLE,
    &series_viewing_location::TABLE,
  ]
}

/// A registry holding every media table.
pub fn schema() -> Result<Schema> { Schema::with_tables(&tables()) }

pub mod viewing_location {
  use crate::{
    field::{ColumnDef, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 2] =
    [ColumnDef::text("name").not_null(), ColumnDef::text("url")];

  /// Streaming services and other places a series can be watched. Not
  /// retireable: locations are shared reference data.
  pub static TABLE: TableDef =
    TableDef::new("viewing_location", &COLUMNS).unique(&[&["name"]]);

  pub const NAME: Field<String> = Field::new("name");
  pub const URL: Field<String> = Field::new("url");
}

pub mod series {
  use chrono::{DateTime, Utc};

  use crate::{
    field::{ColumnDef, DefaultValue, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 7] = [
    ColumnDef::text("title").not_null(),
    ColumnDef::integer("tvdb_series_ext_id"),
    ColumnDef::text("tivo_series_id"),
    ColumnDef::integer("metacritic"),
    ColumnDef::integer("my_rating"),
    ColumnDef::boolean("suggestion")
      .not_null()
      .default(DefaultValue::Bool(false)),
    ColumnDef::timestamp("date_added")
      .not_null()
      .default(DefaultValue::Now),
  ];

  pub static TABLE: TableDef = TableDef::new("series", &COLUMNS)
    .unique(&[&["tvdb_series_ext_id", "retired"]])
    .indexes(&[&["tivo_series_id"]])
    .retireable();

  pub const TITLE: Field<String> = Field::new("title");
  pub const TVDB_SERIES_EXT_ID: Field<i64> = Field::new("tvdb_series_ext_id");
  pub const TIVO_SERIES_ID: Field<String> = Field::new("tivo_series_id");
  pub const METACRITIC: Field<i64> = Field::new("metacritic");
  pub const MY_RATING: Field<i64> = Field::new("my_rating");
  pub const SUGGESTION: Field<bool> = Field::new("suggestion");
  pub const DATE_ADDED: Field<DateTime<Utc>> = Field::new("date_added");
}

pub mod season {
  use chrono::{DateTime, Utc};

  use crate::{
    field::{ColumnDef, DefaultValue, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 3] = [
    ColumnDef::foreign_key("series_id", "series").not_null(),
    ColumnDef::integer("season_number").not_null(),
    ColumnDef::timestamp("date_added")
      .not_null()
      .default(DefaultValue::Now),
  ];

  pub static TABLE: TableDef = TableDef::new("season", &COLUMNS)
    .unique(&[&["series_id", "season_number", "retired"]])
    .retireable();

  pub const SERIES_ID: Field<i64> = Field::new("series_id");
  pub const SEASON_NUMBER: Field<i64> = Field::new("season_number");
  pub const DATE_ADDED: Field<DateTime<Utc>> = Field::new("date_added");
}

pub mod episode {
  use chrono::{DateTime, Utc};

  use crate::{
    field::{ColumnDef, DefaultValue, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 9] = [
    ColumnDef::foreign_key("series_id", "series").not_null(),
    ColumnDef::foreign_key("season_id", "season"),
    ColumnDef::integer("tvdb_episode_ext_id"),
    ColumnDef::integer("season_number"),
    ColumnDef::integer("episode_number"),
    ColumnDef::text("title"),
    ColumnDef::timestamp("air_date"),
    ColumnDef::boolean("watched")
      .not_null()
      .default(DefaultValue::Bool(false)),
    ColumnDef::timestamp("date_added")
      .not_null()
      .default(DefaultValue::Now),
  ];

  pub static TABLE: TableDef = TableDef::new("episode", &COLUMNS)
    .unique(&[&["tvdb_episode_ext_id", "retired"]])
    .indexes(&[&["series_id"], &["season_id"]])
    .retireable();

  pub const SERIES_ID: Field<i64> = Field::new("series_id");
  pub const SEASON_ID: Field<i64> = Field::new("season_id");
  pub const TVDB_EPISODE_EXT_ID: Field<i64> = Field::new("tvdb_episode_ext_id");
  pub const SEASON_NUMBER: Field<i64> = Field::new("season_number");
  pub const EPISODE_NUMBER: Field<i64> = Field::new("episode_number");
  pub const TITLE: Field<String> = Field::new("title");
  pub const AIR_DATE: Field<DateTime<Utc>> = Field::new("air_date");
  pub const WATCHED: Field<bool> = Field::new("watched");
  pub const DATE_ADDED: Field<DateTime<Utc>> = Field::new("date_added");
}

pub mod episode_rating {
  use chrono::{DateTime, Utc};
  use rust_decimal::Decimal;

  use crate::{
    field::{ColumnDef, DefaultValue, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 4] = [
    ColumnDef::foreign_key("episode_id", "episode").not_null(),
    ColumnDef::numeric("rating_value"),
    ColumnDef::text("review"),
    ColumnDef::timestamp("rating_date")
      .not_null()
      .default(DefaultValue::Now),
  ];

  pub static TABLE: TableDef = TableDef::new("episode_rating", &COLUMNS)
    .indexes(&[&["episode_id"]])
    .retireable();

  pub const EPISODE_ID: Field<i64> = Field::new("episode_id");
  pub const RATING_VALUE: Field<Decimal> = Field::new("rating_value");
  pub const REVIEW: Field<String> = Field::new("review");
  pub const RATING_DATE: Field<DateTime<Utc>> = Field::new("rating_date");
}

pub mod episode_group_rating {
  use chrono::{DateTime, Utc};
  use rust_decimal::Decimal;

  use crate::{
    field::{ColumnDef, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 6] = [
    ColumnDef::foreign_key("series_id", "series").not_null(),
    ColumnDef::integer("year"),
    ColumnDef::timestamp("start_date"),
    ColumnDef::timestamp("end_date"),
    ColumnDef::numeric("rating"),
    ColumnDef::text("review"),
  ];

  /// A rating covering a run of episodes (a season, or a year of a daily
  /// show). Member episodes are linked through `group_rating_episode`.
  pub static TABLE: TableDef = TableDef::new("episode_group_rating", &COLUMNS)
    .indexes(&[&["series_id"]])
    .retireable();

  pub const SERIES_ID: Field<i64> = Field::new("series_id");
  pub const YEAR: Field<i64> = Field::new("year");
  pub const START_DATE: Field<DateTime<Utc>> = Field::new("start_date");
  pub const END_DATE: Field<DateTime<Utc>> = Field::new("end_date");
  pub const RATING: Field<Decimal> = Field::new("rating");
  pub const REVIEW: Field<String> = Field::new("review");
}

pub mod group_rating_episode {
  use crate::{
    field::{ColumnDef, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 2] = [
    ColumnDef::foreign_key("episode_group_rating_id", "episode_group_rating").not_null(),
    ColumnDef::foreign_key("episode_id", "episode").not_null(),
  ];

  pub static TABLE: TableDef = TableDef::new("group_rating_episode", &COLUMNS)
    .unique(&[&["episode_group_rating_id", "episode_id"]])
    .indexes(&[&["episode_id"]]);

  pub const EPISODE_GROUP_RATING_ID: Field<i64> = Field::new("episode_group_rating_id");
  pub const EPISODE_ID: Field<i64> = Field::new("episode_id");
}

pub mod match_log {
  use chrono::{DateTime, Utc};

  use crate::{
    field::{ColumnDef, DefaultValue, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 5] = [
    ColumnDef::foreign_key("series_id", "series").not_null(),
    ColumnDef::foreign_key("episode_id", "episode"),
    ColumnDef::text("tivo_program_id"),
    ColumnDef::text("match_status"),
    ColumnDef::timestamp("log_date")
      .not_null()
      .default(DefaultValue::Now),
  ];

  /// One attempt to match a recording to an episode.
  pub static TABLE: TableDef = TableDef::new("match_log", &COLUMNS)
    .indexes(&[&["series_id"], &["episode_id"]])
    .retireable();

  pub const SERIES_ID: Field<i64> = Field::new("series_id");
  pub const EPISODE_ID: Field<i64> = Field::new("episode_id");
  pub const TIVO_PROGRAM_ID: Field<String> = Field::new("tivo_program_id");
  pub const MATCH_STATUS: Field<String> = Field::new("match_status");
  pub const LOG_DATE: Field<DateTime<Utc>> = Field::new("log_date");
}

pub mod series_viewing_location {
  use crate::{
    field::{ColumnDef, Field},
    schema::TableDef,
  };

  static COLUMNS: [ColumnDef; 2] = [
    ColumnDef::foreign_key("series_id", "series").not_null(),
    ColumnDef::foreign_key("viewing_location_id", "viewing_location").not_null(),
  ];

  pub static TABLE: TableDef = TableDef::new("series_viewing_location", &COLUMNS)
    .unique(&[&["series_id", "viewing_location_id"]]);

  pub const SERIES_ID: Field<i64> = Field::new("series_id");
  pub const VIEWING_LOCATION_ID: Field<i64> = Field::new("viewing_location_id");
}
