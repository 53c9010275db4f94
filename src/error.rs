//! Error types for race timing.
//!
//! Nothing in the timing core is fatal to the process: every failure resolves
//! to a session transition plus a surfaced event. The variants below mirror
//! the ways an attempt or a leaderboard operation can go wrong.
//!
//! ## Error Categories
//!
//! - **Command Errors**: rejected start requests (empty name, race in progress)
//! - **Wait Errors**: no start timestamp, pin faults
//! - **Storage Errors**: leaderboard file write failures and malformed rows
//! - **Configuration Errors**: invalid settings loaded at startup
//!
//! ```rust
//! use finishline::TimingError;
//!
//! let error = TimingError::validation("competitor name is empty");
//! assert!(error.is_recoverable());
//! println!("{}", error.user_message());
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::RaceState;

/// Result type alias for timing operations.
pub type Result<T, E = TimingError> = std::result::Result<T, E>;

/// Main error type for timing operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TimingError {
    #[error("Invalid start request: {reason}")]
    Validation { reason: String },

    #[error("A race is already running (state: {state})")]
    AlreadyRunning { state: RaceState },

    #[error("No start timestamp received: {reason}")]
    StartSignal {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Sensor input error: {reason}")]
    Sensor {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to persist leaderboard to {path}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed leaderboard row {line}: {details}")]
    MalformedRow { line: usize, details: String },

    #[error("Elapsed time {value} is not a finite non-negative number")]
    InvalidElapsed { value: f64 },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TimingError {
    /// Returns whether the process can carry on after this error.
    ///
    /// Only configuration errors stop the caller; they are raised before any
    /// race can start.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TimingError::Config { .. })
    }

    /// Short message suitable for showing to the operator.
    pub fn user_message(&self) -> String {
        match self {
            TimingError::Validation { .. } => "Enter the competitor name first".to_string(),
            TimingError::AlreadyRunning { .. } => {
                "A race is already running; cancel it before starting another".to_string()
            }
            TimingError::Persistence { path, .. } => format!(
                "Result kept in memory but could not be saved to {}",
                path.display()
            ),
            other => other.to_string(),
        }
    }

    /// Helper constructor for rejected start requests.
    pub fn validation(reason: impl Into<String>) -> Self {
        TimingError::Validation { reason: reason.into() }
    }

    /// Helper constructor for a missing start timestamp.
    pub fn start_signal(reason: impl Into<String>) -> Self {
        TimingError::StartSignal { reason: reason.into(), source: None }
    }

    /// Helper constructor for a missing start timestamp with an underlying cause.
    pub fn start_signal_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TimingError::StartSignal { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for input pin faults.
    pub fn sensor(reason: impl Into<String>) -> Self {
        TimingError::Sensor { reason: reason.into(), source: None }
    }

    /// Helper constructor for input pin faults with an underlying cause.
    pub fn sensor_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TimingError::Sensor { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for leaderboard file write failures.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TimingError::Persistence { path: path.into(), source }
    }

    /// Helper constructor for unparsable stored rows.
    pub fn malformed_row(line: usize, details: impl Into<String>) -> Self {
        TimingError::MalformedRow { line, details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TimingError::Config { reason: reason.into() }
    }
}
