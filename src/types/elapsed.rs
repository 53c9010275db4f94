//! Elapsed race time

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::{Result, TimingError};

/// Seconds between the start signal and the finish trip.
///
/// Always finite and non-negative. A value outside that range means the two
/// nodes disagree about the time (or the payload was garbage) and never
/// reaches the leaderboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ElapsedTime(f64);

impl ElapsedTime {
    pub const ZERO: ElapsedTime = ElapsedTime(0.0);

    pub fn from_secs(secs: f64) -> Result<Self> {
        if secs.is_finite() && secs >= 0.0 {
            // Normalise -0.0 so ordering and formatting stay predictable
            Ok(Self(secs + 0.0))
        } else {
            Err(TimingError::InvalidElapsed { value: secs })
        }
    }

    /// Elapsed time between two timestamps on the same clock.
    pub fn between(start: f64, finish: f64) -> Result<Self> {
        Self::from_secs(finish - start)
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }
}

/// Round seconds to three decimals.
pub(crate) fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

impl TryFrom<f64> for ElapsedTime {
    type Error = TimingError;

    fn try_from(value: f64) -> Result<Self> {
        Self::from_secs(value)
    }
}

impl From<ElapsedTime> for f64 {
    fn from(value: ElapsedTime) -> Self {
        value.0
    }
}

impl PartialEq for ElapsedTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ElapsedTime {}

impl PartialOrd for ElapsedTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ElapsedTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}
