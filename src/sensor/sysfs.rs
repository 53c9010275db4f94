//! Linux GPIO input through the sysfs interface

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{InputPin, Level};
use crate::{Result, TimingError};

const GPIO_ROOT: &str = "/sys/class/gpio";

/// GPIO line configured as an input under `/sys/class/gpio`.
///
/// Exports the line on open if it is not exported yet, and unexports it again
/// on drop in that case.
#[derive(Debug)]
pub struct SysfsPin {
    root: PathBuf,
    pin: u32,
    value_path: PathBuf,
    exported_by_us: bool,
}

impl SysfsPin {
    pub fn open(pin: u32) -> Result<Self> {
        Self::open_at(GPIO_ROOT, pin)
    }

    /// Open a pin under an alternative sysfs root.
    pub fn open_at<P: AsRef<Path>>(root: P, pin: u32) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let line_dir = root.join(format!("gpio{}", pin));
        let mut exported_by_us = false;

        if !line_dir.exists() {
            fs::write(root.join("export"), pin.to_string()).map_err(|e| {
                TimingError::sensor_with_source(format!("cannot export GPIO {}", pin), Box::new(e))
            })?;
            exported_by_us = true;
            debug!(pin, "Exported GPIO line");
        }

        let direction = line_dir.join("direction");
        if direction.exists() {
            fs::write(&direction, "in").map_err(|e| {
                TimingError::sensor_with_source(
                    format!("cannot set GPIO {} as input", pin),
                    Box::new(e),
                )
            })?;
        }

        Ok(Self { root, pin, value_path: line_dir.join("value"), exported_by_us })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }
}

impl InputPin for SysfsPin {
    fn read(&mut self) -> Result<Level> {
        let raw = fs::read_to_string(&self.value_path).map_err(|e| {
            TimingError::sensor_with_source(format!("cannot read GPIO {}", self.pin), Box::new(e))
        })?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(TimingError::sensor(format!(
                "unexpected value {:?} on GPIO {}",
                other, self.pin
            ))),
        }
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if self.exported_by_us {
            if let Err(e) = fs::write(self.root.join("unexport"), self.pin.to_string()) {
                warn!(pin = self.pin, "Failed to unexport GPIO line: {}", e);
            }
        }
    }
}
