//! Finish sensor polling
//!
//! The finish node watches a single binary input. [`SensorPoller`] samples it at
//! a fixed interval until the input reaches the "object present" level or the
//! attempt is cancelled. Debouncing belongs to the hardware driver; a trip is a
//! trip.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::Result;
use crate::clock::Clock;
use crate::config::{MAX_POLL_INTERVAL, SensorBackend, SensorConfig};

mod simulated;
#[cfg(target_os = "linux")]
mod sysfs;

pub use simulated::SimulatedPin;
#[cfg(target_os = "linux")]
pub use sysfs::SysfsPin;

/// Electrical level of a binary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// A readable binary input.
///
/// Implementations must return quickly; the poller calls `read` once per
/// polling interval from the async worker.
pub trait InputPin: Send + 'static {
    fn read(&mut self) -> Result<Level>;
}

/// Blocking "wait for trip" over an [`InputPin`].
pub struct SensorPoller {
    pin: Mutex<Box<dyn InputPin>>,
    active_level: Level,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl SensorPoller {
    /// Create a poller. Intervals above 10 ms are clamped; a zero interval is
    /// raised to 1 ms so the loop never spins.
    pub fn new(
        pin: impl InputPin,
        active_level: Level,
        poll_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let poll_interval = poll_interval.clamp(Duration::from_millis(1), MAX_POLL_INTERVAL);
        Self { pin: Mutex::new(Box::new(pin)), active_level, poll_interval, clock }
    }

    /// Build the poller described by the sensor configuration.
    ///
    /// Returns the simulated pin handle as well when the simulated backend is
    /// selected, so a front-end can drive it.
    pub fn from_config(
        config: &SensorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, Option<SimulatedPin>)> {
        match config.backend {
            SensorBackend::Simulated => {
                let pin = SimulatedPin::new(config.active_level.inverted());
                let poller =
                    Self::new(pin.clone(), config.active_level, config.poll_interval(), clock);
                Ok((poller, Some(pin)))
            }
            #[cfg(target_os = "linux")]
            SensorBackend::Sysfs => {
                let pin = SysfsPin::open(config.pin)?;
                Ok((Self::new(pin, config.active_level, config.poll_interval(), clock), None))
            }
            #[cfg(not(target_os = "linux"))]
            SensorBackend::Sysfs => Err(crate::TimingError::config(
                "the sysfs sensor backend is only available on Linux",
            )),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn active_level(&self) -> Level {
        self.active_level
    }

    /// Wait until the input reads the active level.
    ///
    /// Returns:
    /// - `Ok(Some(timestamp))` - object detected, timestamp from the clock
    /// - `Ok(None)` - `cancel` was signalled first
    /// - `Err(e)` - the pin could not be read
    pub async fn wait_for_trip(&self, cancel: &CancellationToken) -> Result<Option<f64>> {
        self.wait_for_level(self.active_level, cancel).await
    }

    /// Wait until the object has left the sensor. Used to re-arm between
    /// triggers.
    pub async fn wait_for_release(&self, cancel: &CancellationToken) -> Result<Option<f64>> {
        self.wait_for_level(self.active_level.inverted(), cancel).await
    }

    async fn wait_for_level(&self, wanted: Level, cancel: &CancellationToken) -> Result<Option<f64>> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut samples = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(samples, "Sensor wait cancelled");
                    return Ok(None);
                }
                _ = ticker.tick() => {}
            }

            samples += 1;
            let level = self.pin.lock().read()?;
            trace!(?level, samples, "Sensor sample");

            if level == wanted {
                let timestamp = self.clock.now();
                debug!(?level, samples, timestamp, "Sensor reached level");
                return Ok(Some(timestamp));
            }
        }
    }
}
