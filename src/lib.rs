//! Two-node race timing with a ranked leaderboard.
//!
//! A start node sends its wall-clock timestamp over TCP when a competitor
//! leaves; the finish node waits for that timestamp, then polls a binary
//! proximity sensor until the competitor arrives. The difference is the
//! elapsed time, which goes straight onto a leaderboard kept sorted, saved to
//! a `;`-delimited file and rendered with gaps and rank-movement indicators.
//!
//! # Components
//!
//! - [`SensorPoller`]: fixed-interval, cancellable wait on an [`InputPin`]
//! - [`TcpStartSignal`]: single-use listener for the start timestamp
//! - [`RaceSession`]: one attempt at a time, `Idle -> AwaitingStart ->
//!   AwaitingFinish -> Completed/Cancelled -> Idle`
//! - [`Leaderboard`]: insertion, ranking, gaps and movement
//! - [`Timekeeper`]: command/event façade for a presentation layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use finishline::{Finishline, RaceCommand, RaceEvent, TimerConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> finishline::Result<()> {
//!     let node = Finishline::launch(&TimerConfig::default())?;
//!     let mut events = Box::pin(node.timekeeper.events());
//!
//!     node.timekeeper.handle(RaceCommand::StartRequested { competitor: "Mario".into() })?;
//!     while let Some(event) = events.next().await {
//!         if let RaceEvent::LeaderboardUpdated(rows) = event {
//!             for row in rows {
//!                 println!("{}", row);
//!             }
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
mod error;
pub mod events;
pub mod leaderboard;
pub mod sensor;
pub mod session;
pub mod signal;
pub mod timekeeper;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DecimalSeparator, SensorBackend, TimerConfig};
pub use error::*;
pub use events::{RaceCommand, RaceEvent};
pub use leaderboard::{
    CsvLeaderboardFile, Leaderboard, LeaderboardRow, Movement, RenderedRow, SharedLeaderboard,
};
pub use sensor::{InputPin, Level, SensorPoller, SimulatedPin};
pub use session::RaceSession;
pub use signal::{StartSignalListener, StartSignalSource, TcpStartSignal, send_start_timestamp};
pub use timekeeper::Timekeeper;
pub use types::{CompetitorName, ElapsedTime, LeaderboardEntry, RaceState};

use std::sync::Arc;
use tracing::info;

/// A running finish node.
pub struct FinishNode {
    pub timekeeper: Timekeeper,
    /// Handle to the simulated sensor when `sensor.backend` is `simulated`
    pub simulated_pin: Option<SimulatedPin>,
}

/// Entry point wiring the finish node from configuration.
pub struct Finishline;

impl Finishline {
    /// Build the finish node described by `config` and load its leaderboard.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the configuration is invalid
    /// - the sensor input cannot be opened
    /// - the leaderboard file exists but cannot be read
    pub fn launch(config: &TimerConfig) -> Result<FinishNode> {
        Self::launch_with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`launch`](Self::launch) with an explicit finish clock.
    pub fn launch_with_clock(config: &TimerConfig, clock: Arc<dyn Clock>) -> Result<FinishNode> {
        config.validate()?;
        let (sensor, simulated_pin) = SensorPoller::from_config(&config.sensor, clock)?;
        let start_signal = TcpStartSignal::new(config.signal.socket_addr());
        let store = CsvLeaderboardFile::new(&config.storage.path, config.storage.decimal_separator);

        let timekeeper = Timekeeper::new(start_signal, sensor, store);
        let rows = timekeeper.initialize()?;

        info!(
            listen = %config.signal.socket_addr(),
            sensor = ?config.sensor.backend,
            pin = config.sensor.pin,
            leaderboard = %config.storage.path.display(),
            entries = rows.len(),
            "Finish node ready"
        );

        Ok(FinishNode { timekeeper, simulated_pin })
    }
}
