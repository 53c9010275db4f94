//! Commands accepted from, and events emitted to, the presentation layer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::leaderboard::RenderedRow;
use crate::types::RaceState;

/// Operator commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceCommand {
    /// Begin an attempt for the named competitor
    StartRequested { competitor: String },
    /// Abort the attempt in progress
    CancelRequested,
    /// Replace the leaderboard with the contents of a file and keep saving there
    ManualLoadRequested { path: PathBuf },
    /// Wipe the leaderboard and its file. Confirmation is the caller's job.
    ResetRequested,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    RaceStatusChanged(RaceState),
    LeaderboardUpdated(Vec<RenderedRow>),
    /// A command was rejected; the reason is meant for the operator
    ValidationFailed(String),
    /// Something went wrong without stopping the system (save failed, bad
    /// start payload, sensor fault)
    Warning(String),
}
