//! Timestamp sources for the finish node
//!
//! Elapsed time is computed as `finish - start` where the start timestamp comes
//! from the start node's wall clock. The finish side therefore has to read the
//! same epoch: seconds since the UNIX epoch as a float.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of timestamps in seconds.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> f64;
}

/// Wall clock, seconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
    }
}

/// Clock that only moves when told to. Used by the simulated sensor backend
/// and in tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn set(&self, value: f64) {
        *self.now.lock() = value;
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}
