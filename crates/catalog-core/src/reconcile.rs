//! Choosing which of two duplicate rows survives.
//!
//! Two rows are duplicates when they carry the same external identity. The
//! policy lives here, in one place, so every maintenance job that reconciles
//! duplicates agrees on the outcome. It never touches the store; applying a
//! verdict is the caller's job (see `media::resolve_duplicate_episodes`).

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the policy needs to know about one side of a duplicate pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCandidate {
  pub id:             i64,
  pub retired:        bool,
  /// Original creation time of the row, if recorded.
  pub created:        Option<DateTime<Utc>>,
  pub season_number:  Option<i64>,
  pub episode_number: Option<i64>,
  /// Rating and group-rating rows that point at this row.
  pub rating_refs:    i64,
}

impl DuplicateCandidate {
  fn same_position(&self, other: &Self) -> bool {
    self.season_number == other.season_number
      && self.episode_number == other.episode_number
  }
}

/// The rule that decided a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
  /// Exactly one side had no rating references.
  NoRatings,
  /// Both or neither had ratings; the earlier-created row won.
  EarlierCreation,
  /// Nothing else distinguished them; the lower id won.
  LowerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
  /// Season or episode numbers disagree; the rows are not treated as
  /// duplicates and nothing should change.
  KeysDiffer,
  Survivor {
    winner: i64,
    loser:  i64,
    reason: TieBreak,
  },
}

/// Decide which of `a` and `b` survives.
///
/// Candidates must agree on season and episode number. Then, in order: the
/// row with no rating references wins over one with references; the row
/// created earlier wins (an unknown creation time loses to a known one); the
/// lower id wins.
pub fn choose_survivor(a: &DuplicateCandidate, b: &DuplicateCandidate) -> Verdict {
  if !a.same_position(b) {
    return Verdict::KeysDiffer;
  }

  let survivor = |winner: &DuplicateCandidate, reason| {
    let loser = if winner.id == a.id { b } else { a };
    Verdict::Survivor { winner: winner.id, loser: loser.id, reason }
  };

  match (a.rating_refs == 0, b.rating_refs == 0) {
    (true, false) => return survivor(a, TieBreak::NoRatings),
    (false, true) => return survivor(b, TieBreak::NoRatings),
    _ => {}
  }

  match (a.created, b.created) {
    (Some(x), Some(y)) if x < y => return survivor(a, TieBreak::EarlierCreation),
    (Some(x), Some(y)) if y < x => return survivor(b, TieBreak::EarlierCreation),
    (Some(_), None) => return survivor(a, TieBreak::EarlierCreation),
    (None, Some(_)) => return survivor(b, TieBreak::EarlierCreation),
    _ => {}
  }

  if a.id <= b.id {
    survivor(a, TieBreak::LowerId)
  } else {
    survivor(b, TieBreak::LowerId)
  }
}
