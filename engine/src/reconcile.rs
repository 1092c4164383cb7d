//! Reconciliation logic for leaderboard state.
//!
//! This is the core of determinism. Given raw score records from any source
//! (remote rows, the local cache, offline submissions), this module produces
//! the one-entry-per-player view and decides how a new score changes it.
//!
//! # Algorithm
//!
//! 1. Group records by player name, in encounter order
//! 2. Keep the record with the maximum score per group (first seen wins ties)
//! 3. Emit one record per group
//! 4. Stable-sort by score descending
//!
//! The same rule ("create, or replace only if strictly better") drives both
//! the local merge ([`apply_candidate`]) and the remote write plan
//! ([`plan_remote_write`]).

use crate::{Leaderboard, PlayerName, RemoteRow, RowId, Score, ScoreRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a submitted score did to a player's personal best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SubmitOutcome {
    /// First record for this player
    Created,
    /// The new score beat the previous best
    #[serde(rename_all = "camelCase")]
    Improved { previous: Score },
    /// The new score did not beat the current best
    #[serde(rename_all = "camelCase")]
    NotImproved { best: Score },
}

impl SubmitOutcome {
    /// Whether the submission changed the stored best.
    pub fn changed(&self) -> bool {
        !matches!(self, SubmitOutcome::NotImproved { .. })
    }
}

/// The remote mutation needed to record a candidate score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WritePlan {
    /// No row exists for the player: create one
    Create,
    /// Delete every stale row for the player, then create the new one
    #[serde(rename_all = "camelCase")]
    Replace { stale: Vec<RowId>, previous: Score },
    /// The remote best is at least as good: no mutation
    #[serde(rename_all = "camelCase")]
    Skip { best: Score },
}

impl WritePlan {
    /// The outcome reported to the caller once the plan is carried out.
    pub fn outcome(&self) -> SubmitOutcome {
        match self {
            WritePlan::Create => SubmitOutcome::Created,
            WritePlan::Replace { previous, .. } => SubmitOutcome::Improved {
                previous: *previous,
            },
            WritePlan::Skip { best } => SubmitOutcome::NotImproved { best: *best },
        }
    }

    /// Whether carrying out the plan touches the remote store.
    pub fn mutates(&self) -> bool {
        !matches!(self, WritePlan::Skip { .. })
    }
}

/// Reduce arbitrary records to one personal best per player.
pub fn reduce(records: impl IntoIterator<Item = ScoreRecord>) -> Leaderboard {
    let mut index: HashMap<PlayerName, usize> = HashMap::new();
    let mut entries: Vec<ScoreRecord> = Vec::new();

    for record in records {
        match index.get(&record.name).copied() {
            Some(i) => {
                // Strictly greater: the first record seen keeps exact ties
                if record.score > entries[i].score {
                    entries[i] = record;
                }
            }
            None => {
                index.insert(record.name.clone(), entries.len());
                entries.push(record);
            }
        }
    }

    let mut board = Leaderboard::from_reduced(entries);
    board.resort();
    board
}

/// Reduce remote rows. Rows with an invalid player name are ignored.
pub fn reduce_rows(rows: &[RemoteRow]) -> Leaderboard {
    reduce(rows.iter().filter_map(RemoteRow::to_record))
}

/// Apply the create-or-improve rule to a leaderboard in place.
pub fn apply_candidate(board: &mut Leaderboard, candidate: &ScoreRecord) -> SubmitOutcome {
    let entries = board.entries_mut();

    let outcome = match entries.iter().position(|r| r.name == candidate.name) {
        Some(i) if candidate.score > entries[i].score => {
            let previous = entries[i].score;
            entries[i] = candidate.clone();
            SubmitOutcome::Improved { previous }
        }
        Some(i) => SubmitOutcome::NotImproved {
            best: entries[i].score,
        },
        None => {
            entries.push(candidate.clone());
            SubmitOutcome::Created
        }
    };

    if outcome.changed() {
        board.resort();
    }
    outcome
}

/// Decide the remote mutation for a candidate, given the rows just read.
pub fn plan_remote_write(rows: &[RemoteRow], candidate: &ScoreRecord) -> WritePlan {
    let owned: Vec<&RemoteRow> = rows
        .iter()
        .filter(|row| row.belongs_to(&candidate.name))
        .collect();

    let best = match owned.iter().map(|row| row.score).max() {
        Some(best) => best,
        None => return WritePlan::Create,
    };

    if candidate.score > best {
        WritePlan::Replace {
            stale: owned.iter().map(|row| row.row_id.clone()).collect(),
            previous: best,
        }
    } else {
        WritePlan::Skip { best }
    }
}

/// Overlay locally pending records on a remote view.
///
/// A pending offline best stays visible until the remote store confirms a
/// score at least as high for that player.
pub fn merge_pending(remote: &Leaderboard, pending: &[ScoreRecord]) -> Leaderboard {
    reduce(remote.iter().cloned().chain(pending.iter().cloned()))
}

/// Split pending records into those the remote view already covers and those
/// that still need a write.
pub fn partition_pending(
    remote: &Leaderboard,
    pending: Vec<ScoreRecord>,
) -> (Vec<ScoreRecord>, Vec<ScoreRecord>) {
    pending.into_iter().partition(|record| {
        remote
            .get(&record.name)
            .is_some_and(|best| best.score >= record.score)
    })
}
