//! The merged leaderboard view.
//!
//! A [`Leaderboard`] holds at most one [`ScoreRecord`] per player, ordered by
//! score descending. The only ways to build one are the reduction in
//! [`crate::reconcile`] and the merge rule that preserves it, so the
//! invariant holds for every value of the type, including deserialized ones.

use crate::{reconcile, PlayerName, Score, ScoreRecord};
use serde::{Deserialize, Serialize};

/// Ordered, player-unique view of personal bests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ScoreRecord>", into = "Vec<ScoreRecord>")]
pub struct Leaderboard {
    entries: Vec<ScoreRecord>,
}

impl Leaderboard {
    /// An empty leaderboard.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a leaderboard from arbitrary records by reduction.
    pub fn from_records(records: impl IntoIterator<Item = ScoreRecord>) -> Self {
        reconcile::reduce(records)
    }

    /// Wrap entries that are already reduced and sorted.
    pub(crate) fn from_reduced(entries: Vec<ScoreRecord>) -> Self {
        Self { entries }
    }

    /// All entries, best first.
    pub fn entries(&self) -> &[ScoreRecord] {
        &self.entries
    }

    /// Iterate over entries, best first.
    pub fn iter(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.entries.iter()
    }

    /// Number of distinct players.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the leaderboard has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Personal best of a player.
    pub fn get(&self, name: &PlayerName) -> Option<&ScoreRecord> {
        self.entries.iter().find(|r| &r.name == name)
    }

    /// 1-based rank of a player.
    pub fn rank_of(&self, name: &PlayerName) -> Option<usize> {
        self.entries
            .iter()
            .position(|r| &r.name == name)
            .map(|i| i + 1)
    }

    /// The first `n` entries.
    pub fn top(&self, n: usize) -> &[ScoreRecord] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Highest score on the board.
    pub fn high_score(&self) -> Option<Score> {
        self.entries.first().map(|r| r.score)
    }

    /// Consume the leaderboard into its entries.
    pub fn into_records(self) -> Vec<ScoreRecord> {
        self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<ScoreRecord> {
        &mut self.entries
    }

    /// Re-establish descending order. Stable, so ties keep encounter order.
    pub(crate) fn resort(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
    }
}

impl From<Vec<ScoreRecord>> for Leaderboard {
    fn from(records: Vec<ScoreRecord>) -> Self {
        reconcile::reduce(records)
    }
}

impl From<Leaderboard> for Vec<ScoreRecord> {
    fn from(board: Leaderboard) -> Self {
        board.entries
    }
}

impl<'a> IntoIterator for &'a Leaderboard {
    type Item = &'a ScoreRecord;
    type IntoIter = std::slice::Iter<'a, ScoreRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
