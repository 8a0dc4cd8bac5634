//! Reconciling two episode rows that share a TVDB id.

use serde::Serialize;
use tracing::{info, warn};

use super::{episode, episode_rating, group_rating_episode, match_log};
use crate::{
  Error, Result,
  record::Record,
  reconcile::{DuplicateCandidate, Verdict, choose_survivor},
  retire::{ACTIVE, delete_edges_of, retire_children_of},
  store::Store,
  value::Value,
};

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateResolution {
  pub verdict:           Verdict,
  /// The loser was active and has now been retired.
  pub retired_loser:     bool,
  /// The winner had been retired and is active again.
  pub reinstated_winner: bool,
  /// Dependent rows of the loser retired or deleted along with it.
  pub cascaded:          usize,
}

fn load<S: Store + ?Sized>(store: &S, id: i64) -> Result<Record> {
  Record::fetch_by_id(store, &episode::TABLE, id)?
    .ok_or_else(|| Error::invalid_state(format!("episode {id} does not exist")))
}

fn candidate<S: Store + ?Sized>(
  store: &S,
  record: &Record,
) -> Result<DuplicateCandidate> {
  let id = record
    .id()
    .ok_or_else(|| Error::invalid_state("episode candidate has no id"))?;
  let ratings = store.query_i64(
    &format!(
      "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {ACTIVE}",
      episode_rating::TABLE.name,
      episode_rating::EPISODE_ID.name(),
    ),
    &[Value::Integer(id)],
  )?;
  let group_ratings = store.query_i64(
    &format!(
      "SELECT COUNT(*) FROM {} WHERE {} = ?1",
      group_rating_episode::TABLE.name,
      group_rating_episode::EPISODE_ID.name(),
    ),
    &[Value::Integer(id)],
  )?;
  Ok(DuplicateCandidate {
    id,
    retired: record.is_retired()?,
    created: record.get(episode::DATE_ADDED)?,
    season_number: record.get(episode::SEASON_NUMBER)?,
    episode_number: record.get(episode::EPISODE_NUMBER)?,
    rating_refs: ratings + group_ratings,
  })
}

/// Decide which of two episodes sharing a TVDB id is canonical, then retire
/// the other one (with its ratings, match logs, and group memberships) and
/// reinstate the winner if it had been retired.
///
/// The loser is retired and committed before the winner is reinstated, so the
/// `(tvdb_episode_ext_id, retired)` unique group never sees two active rows.
pub fn resolve_duplicate_episodes<S: Store + ?Sized>(
  store: &S,
  a_id: i64,
  b_id: i64,
) -> Result<DuplicateResolution> {
  if a_id == b_id {
    return Err(Error::invalid_state(format!(
      "episode {a_id} cannot be a duplicate of itself"
    )));
  }
  let a = load(store, a_id)?;
  let b = load(store, b_id)?;

  let ext_a = a.get(episode::TVDB_EPISODE_EXT_ID)?;
  if ext_a.is_none() || ext_a != b.get(episode::TVDB_EPISODE_EXT_ID)? {
    return Err(Error::invalid_state(format!(
      "episodes {a_id} and {b_id} do not share a TVDB id"
    )));
  }

  let verdict = choose_survivor(&candidate(store, &a)?, &candidate(store, &b)?);
  let Verdict::Survivor { winner: winner_id, loser: loser_id, reason } = verdict else {
    warn!(a_id, b_id, "duplicate episodes disagree on season/episode; left alone");
    return Ok(DuplicateResolution {
      verdict,
      retired_loser: false,
      reinstated_winner: false,
      cascaded: 0,
    });
  };

  let (mut winner, mut loser) = if winner_id == a_id { (a, b) } else { (b, a) };

  let retired_loser = !loser.is_retired()?;
  loser.retire()?;
  loser.commit(store)?;

  let mut cascaded = 0;
  for child in [&episode_rating::TABLE, &match_log::TABLE] {
    cascaded += retire_children_of(store, &loser, child)?;
  }
  cascaded += delete_edges_of(store, &loser, &group_rating_episode::TABLE)?;

  let reinstated_winner = winner.is_retired()?;
  winner.un_retire()?;
  winner.commit(store)?;

  info!(
    winner = winner_id,
    loser = loser_id,
    %reason,
    retired_loser,
    reinstated_winner,
    cascaded,
    "resolved duplicate episodes"
  );
  Ok(DuplicateResolution { verdict, retired_loser, reinstated_winner, cascaded })
}
