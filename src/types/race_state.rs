//! Race attempt lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the single race session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RaceState {
    /// No attempt in progress; a start request is accepted
    #[default]
    Idle,
    /// Listening for the start node's timestamp
    AwaitingStart,
    /// Start received, waiting for the finish sensor to trip
    AwaitingFinish,
    /// Attempt finished and recorded on the leaderboard
    Completed,
    /// Attempt aborted by the operator or by a missing start signal
    Cancelled,
}

impl RaceState {
    /// Whether an attempt is in flight and can be cancelled.
    pub fn is_running(self) -> bool {
        matches!(self, RaceState::AwaitingStart | RaceState::AwaitingFinish)
    }
}

impl fmt::Display for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RaceState::Idle => "idle",
            RaceState::AwaitingStart => "awaiting start",
            RaceState::AwaitingFinish => "awaiting finish",
            RaceState::Completed => "completed",
            RaceState::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
