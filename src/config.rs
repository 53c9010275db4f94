//! Finish node configuration
//!
//! Loaded from YAML. Every field has a default matching the stock node wiring
//! of the finish node (start signal on TCP port 5000, active-low sensor on
//! GPIO 17 polled every 10 ms, leaderboard in `classifica.csv`).
//!
//! ```yaml
//! signal:
//!   bind_address: 0.0.0.0
//!   port: 5000
//! sensor:
//!   backend: sysfs
//!   pin: 17
//!   active_level: low
//!   poll_interval_ms: 10
//! storage:
//!   path: classifica.csv
//!   decimal_separator: comma
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::sensor::Level;
use crate::{Result, TimingError};

/// Upper bound on the sensor polling interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerConfig {
    pub signal: SignalConfig,
    pub sensor: SensorConfig,
    pub storage: StorageConfig,
}

/// Where the finish node listens for the start timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalConfig {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 5000 }
    }
}

impl SignalConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Which input driver backs the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorBackend {
    /// Linux GPIO through `/sys/class/gpio`
    #[default]
    Sysfs,
    /// In-process pin driven from the console (dry runs without hardware)
    Simulated,
}

/// Finish sensor wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    pub backend: SensorBackend,
    pub pin: u32,
    /// Input level that means "object present"
    pub active_level: Level,
    pub poll_interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { backend: SensorBackend::Sysfs, pin: 17, active_level: Level::Low, poll_interval_ms: 10 }
    }
}

impl SensorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Decimal separator used when writing numbers to the leaderboard file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalSeparator {
    #[default]
    Comma,
    Point,
}

/// Leaderboard file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub decimal_separator: DecimalSeparator,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("classifica.csv"), decimal_separator: DecimalSeparator::Comma }
    }
}

impl TimerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TimerConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| TimingError::config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TimingError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    /// Serialize back to YAML (used to print the effective configuration).
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| TimingError::config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let interval = self.sensor.poll_interval();
        if interval.is_zero() {
            return Err(TimingError::config("sensor.poll_interval_ms must be greater than zero"));
        }
        if interval > MAX_POLL_INTERVAL {
            return Err(TimingError::config(format!(
                "sensor.poll_interval_ms must be at most {} ms, got {}",
                MAX_POLL_INTERVAL.as_millis(),
                self.sensor.poll_interval_ms
            )));
        }
        if self.storage.path.as_os_str().is_empty() {
            return Err(TimingError::config("storage.path must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_finish_node_wiring() {
        let config = TimerConfig::default();
        assert_eq!(config.signal.port, 5000);
        assert_eq!(config.sensor.pin, 17);
        assert_eq!(config.sensor.active_level, Level::Low);
        assert_eq!(config.sensor.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.storage.path, PathBuf::from("classifica.csv"));
        assert_eq!(config.storage.decimal_separator, DecimalSeparator::Comma);
        config.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = TimerConfig::from_yaml("signal:\n  port: 6000\nstorage:\n  decimal_separator: point\n")
            .unwrap();
        assert_eq!(config.signal.port, 6000);
        assert_eq!(config.sensor.pin, 17);
        assert_eq!(config.storage.decimal_separator, DecimalSeparator::Point);
    }

    #[test]
    fn rejects_slow_or_zero_polling() {
        let slow = TimerConfig::from_yaml("sensor:\n  poll_interval_ms: 50\n");
        assert!(matches!(slow, Err(TimingError::Config { .. })));

        let zero = TimerConfig::from_yaml("sensor:\n  poll_interval_ms: 0\n");
        assert!(matches!(zero, Err(TimingError::Config { .. })));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(TimerConfig::from_yaml("sensor:\n  pinn: 4\n").is_err());
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = TimerConfig::default();
        config.sensor.backend = SensorBackend::Simulated;
        config.sensor.active_level = Level::High;
        let yaml = config.to_yaml().unwrap();
        assert_eq!(TimerConfig::from_yaml(&yaml).unwrap(), config);
    }
}
