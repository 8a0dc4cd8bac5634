//! Retiring a whole series.

use serde::Serialize;
use tracing::{error, info};

use super::{
  episode, episode_group_rating, episode_rating, group_rating_episode, match_log,
  season, series, series_viewing_location,
};
use crate::{
  Error, Result,
  record::Record,
  retire::{
    delete_edges_of, delete_edges_referencing_retired,
    propagate_retirement_across_reference, retire_children_of,
  },
  store::Store,
};

/// One step of the walk and how many rows it touched.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeStep {
  pub table:  &'static str,
  pub action: &'static str,
  pub rows:   usize,
  pub error:  Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesRetirement {
  pub series_id:     i64,
  /// False when the series row was already retired.
  pub newly_retired: bool,
  pub steps:         Vec<CascadeStep>,
}

impl SeriesRetirement {
  pub fn rows_touched(&self) -> usize { self.steps.iter().map(|s| s.rows).sum() }

  pub fn is_complete(&self) -> bool { self.steps.iter().all(|s| s.error.is_none()) }
}

/// Retire a series and everything it owns.
///
/// The series row is retired and committed first; if that fails nothing else
/// happens. The remaining steps are each idempotent and a failing step is
/// logged and skipped, so running this again finishes an interrupted walk.
pub fn retire_series<S: Store + ?Sized>(
  store: &S,
  series_id: i64,
) -> Result<SeriesRetirement> {
  let mut root = Record::fetch_by_id(store, &series::TABLE, series_id)?
    .ok_or_else(|| Error::invalid_state(format!("series {series_id} does not exist")))?;

  let newly_retired = !root.is_retired()?;
  root.retire()?;
  root.commit(store)?;

  let mut steps = Vec::new();
  let mut step = |table: &'static str, action: &'static str, result: Result<usize>| {
    let outcome = match result {
      Ok(rows) => CascadeStep { table, action, rows, error: None },
      Err(e) => {
        error!(series_id, table, action, error = %e, "cascade step failed; skipping");
        CascadeStep { table, action, rows: 0, error: Some(e.to_string()) }
      }
    };
    steps.push(outcome);
  };

  for child in [
    &season::TABLE,
    &episode::TABLE,
    &episode_group_rating::TABLE,
    &match_log::TABLE,
  ] {
    step(child.name, "retire", retire_children_of(store, &root, child));
  }

  for dependent in [&episode_rating::TABLE, &match_log::TABLE] {
    step(
      dependent.name,
      "propagate",
      propagate_retirement_across_reference(store, dependent, &episode::TABLE),
    );
  }

  step(
    series_viewing_location::TABLE.name,
    "delete",
    delete_edges_of(store, &root, &series_viewing_location::TABLE),
  );
  for target in [&episode::TABLE, &episode_group_rating::TABLE] {
    step(
      group_rating_episode::TABLE.name,
      "delete",
      delete_edges_referencing_retired(store, &group_rating_episode::TABLE, target),
    );
  }

  let report = SeriesRetirement { series_id, newly_retired, steps };
  info!(
    series_id,
    rows = report.rows_touched(),
    complete = report.is_complete(),
    "retired series"
  );
  Ok(report)
}
