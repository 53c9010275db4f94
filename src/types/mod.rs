//! Core value types shared by the timing components

mod competitor;
mod elapsed;
mod race_state;

pub use competitor::CompetitorName;
pub(crate) use elapsed::round_millis;
pub use elapsed::ElapsedTime;
pub use race_state::RaceState;

use serde::{Deserialize, Serialize};

/// One recorded result. Entries are never edited; the leaderboard replaces
/// them wholesale on load or reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub competitor: CompetitorName,
    pub elapsed: ElapsedTime,
}

impl LeaderboardEntry {
    pub fn new(competitor: CompetitorName, elapsed: ElapsedTime) -> Self {
        Self { competitor, elapsed }
    }
}
