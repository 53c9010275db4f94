//! In-process input pin

use parking_lot::Mutex;
use std::sync::Arc;

use super::{InputPin, Level};
use crate::Result;

/// Pin whose level is set programmatically. Clones share the same level, so
/// one handle can be given to the poller and another kept to drive it.
#[derive(Debug, Clone)]
pub struct SimulatedPin {
    level: Arc<Mutex<Level>>,
}

impl SimulatedPin {
    pub fn new(initial: Level) -> Self {
        Self { level: Arc::new(Mutex::new(initial)) }
    }

    pub fn set_level(&self, level: Level) {
        *self.level.lock() = level;
    }

    pub fn level(&self) -> Level {
        *self.level.lock()
    }
}

impl InputPin for SimulatedPin {
    fn read(&mut self) -> Result<Level> {
        Ok(*self.level.lock())
    }
}
