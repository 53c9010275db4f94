//! Display and storage rows

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DecimalSeparator;
use crate::types::{CompetitorName, round_millis};

/// Rank change since the previous render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    /// Leading the board (overrides up/down)
    First,
    Up,
    Down,
    Unchanged,
}

impl Movement {
    /// Compare previous and current 0-based positions.
    pub fn between(previous: usize, current: usize) -> Self {
        if current == 0 {
            Movement::First
        } else if current < previous {
            Movement::Up
        } else if current > previous {
            Movement::Down
        } else {
            Movement::Unchanged
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Movement::First => "*",
            Movement::Up => "^",
            Movement::Down => "v",
            Movement::Unchanged => "=",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Movement::First => "first",
            Movement::Up => "up",
            Movement::Down => "down",
            Movement::Unchanged => "unchanged",
        })
    }
}

/// Seconds with three decimals and the requested separator.
pub fn format_seconds(secs: f64, separator: DecimalSeparator) -> String {
    let text = format!("{:.3}", secs);
    match separator {
        DecimalSeparator::Point => text,
        DecimalSeparator::Comma => text.replace('.', ","),
    }
}

/// `+x.xxx` for a gap, `-` for the leader.
pub fn format_delta(delta: Option<f64>, separator: DecimalSeparator) -> String {
    match delta {
        Some(delta) => format!("+{}", format_seconds(delta, separator)),
        None => "-".to_string(),
    }
}

/// One leaderboard position as written to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// 1-based rank
    pub position: usize,
    pub competitor: CompetitorName,
    /// Seconds, rounded to milliseconds
    pub elapsed: f64,
    pub delta_to_previous: Option<f64>,
    pub delta_to_first: Option<f64>,
}

impl LeaderboardRow {
    pub fn new(
        position: usize,
        competitor: CompetitorName,
        elapsed: f64,
        delta_to_previous: Option<f64>,
        delta_to_first: Option<f64>,
    ) -> Self {
        Self {
            position,
            competitor,
            elapsed: round_millis(elapsed),
            delta_to_previous: delta_to_previous.map(round_millis),
            delta_to_first: delta_to_first.map(round_millis),
        }
    }

    /// Storage fields in column order.
    pub fn fields(&self, separator: DecimalSeparator) -> [String; 5] {
        [
            self.position.to_string(),
            self.competitor.to_string(),
            format_seconds(self.elapsed, separator),
            format_delta(self.delta_to_previous, separator),
            format_delta(self.delta_to_first, separator),
        ]
    }

    /// `;`-joined record without quoting.
    pub fn to_record(&self, separator: DecimalSeparator) -> String {
        self.fields(separator).join(";")
    }
}

/// One leaderboard position as shown live, with its movement indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedRow {
    /// 1-based rank
    pub rank: usize,
    pub competitor: CompetitorName,
    pub elapsed: f64,
    pub delta_to_previous: Option<f64>,
    pub delta_to_first: Option<f64>,
    pub movement: Movement,
}

impl RenderedRow {
    pub(crate) fn new(row: LeaderboardRow, movement: Movement) -> Self {
        Self {
            rank: row.position,
            competitor: row.competitor,
            elapsed: row.elapsed,
            delta_to_previous: row.delta_to_previous,
            delta_to_first: row.delta_to_first,
            movement,
        }
    }

    pub fn delta_to_previous_text(&self) -> String {
        format_delta(self.delta_to_previous, DecimalSeparator::Point)
    }

    pub fn delta_to_first_text(&self) -> String {
        format_delta(self.delta_to_first, DecimalSeparator::Point)
    }
}

impl fmt::Display for RenderedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {} {:<20} {:>10.3} {:>10} {:>10}",
            self.rank,
            self.movement.symbol(),
            self.competitor,
            self.elapsed,
            self.delta_to_previous_text(),
            self.delta_to_first_text()
        )
    }
}
