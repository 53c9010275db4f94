//! Ranked leaderboard of recorded times
//!
//! [`Leaderboard`] keeps entries sorted by elapsed time (stable, so ties keep
//! insertion order) and remembers each competitor's position at the previous
//! render to compute movement indicators.
//!
//! The engine is a plain value. Callers that share it between the command
//! path and the race worker wrap it in [`SharedLeaderboard`], which serialises
//! every operation behind one lock so a render never sees a half-applied
//! insert.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{CompetitorName, LeaderboardEntry};

mod render;
mod store;

pub use render::{LeaderboardRow, Movement, RenderedRow, format_delta, format_seconds};
pub use store::{CsvLeaderboardFile, HEADER, LoadReport, format_leaderboard, parse_leaderboard};

/// Leaderboard shared between the command path and the race worker.
pub type SharedLeaderboard = Arc<Mutex<Leaderboard>>;

/// Position of each competitor (0-based) at the previous render.
///
/// When a name appears more than once the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankSnapshot {
    positions: HashMap<CompetitorName, usize>,
}

impl RankSnapshot {
    fn capture(entries: &[LeaderboardEntry]) -> Self {
        let positions =
            entries.iter().enumerate().map(|(i, e)| (e.competitor.clone(), i)).collect();
        Self { positions }
    }

    pub fn position_of(&self, competitor: &str) -> Option<usize> {
        self.positions.get(competitor).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Ordered collection of results.
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    snapshot: RankSnapshot,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh leaderboard for sharing.
    pub fn shared() -> SharedLeaderboard {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Append an entry and restore the ordering.
    pub fn insert(&mut self, entry: LeaderboardEntry) {
        self.entries.push(entry);
        self.sort();
    }

    /// Replace every entry. The rank snapshot is kept, so the next render
    /// shows movement relative to whatever was last displayed.
    pub fn load_from(&mut self, entries: impl IntoIterator<Item = LeaderboardEntry>) {
        self.entries = entries.into_iter().collect();
        self.sort();
    }

    /// Drop every entry and forget the previous ranks.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.snapshot = RankSnapshot::default();
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rank_snapshot(&self) -> &RankSnapshot {
        &self.snapshot
    }

    /// Produce display rows and replace the rank snapshot with the current
    /// ordering.
    pub fn render(&mut self) -> Vec<RenderedRow> {
        let rows = self
            .persist()
            .into_iter()
            .map(|row| {
                let index = row.position - 1;
                let previous = self.snapshot.position_of(row.competitor.as_str()).unwrap_or(index);
                let movement = Movement::between(previous, index);
                RenderedRow::new(row, movement)
            })
            .collect();

        self.snapshot = RankSnapshot::capture(&self.entries);
        rows
    }

    /// Rows ready for storage: same columns as [`render`](Self::render)
    /// without movement, and without touching the rank snapshot.
    pub fn persist(&self) -> Vec<LeaderboardRow> {
        let Some(first) = self.entries.first() else {
            return Vec::new();
        };
        let first = first.elapsed.as_secs();

        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let elapsed = entry.elapsed.as_secs();
                let (to_previous, to_first) = if i == 0 {
                    (None, None)
                } else {
                    (Some(elapsed - self.entries[i - 1].elapsed.as_secs()), Some(elapsed - first))
                };
                LeaderboardRow::new(i + 1, entry.competitor.clone(), elapsed, to_previous, to_first)
            })
            .collect()
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|entry| entry.elapsed);
    }
}
