//! Command façade for the finish node
//!
//! [`Timekeeper`] is what a presentation layer talks to. It accepts
//! [`RaceCommand`]s, owns the shared leaderboard and its file, and publishes
//! [`RaceEvent`]s. Every command returns as soon as it has been applied; race
//! waits run on the session's background worker.

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

use crate::events::{RaceCommand, RaceEvent};
use crate::leaderboard::{
    CsvLeaderboardFile, Leaderboard, LeaderboardRow, RenderedRow, SharedLeaderboard,
};
use crate::sensor::SensorPoller;
use crate::session::{RaceSession, SharedStore};
use crate::signal::StartSignalSource;
use crate::types::RaceState;
use crate::{Result, TimingError};

const EVENT_CAPACITY: usize = 64;

/// Finish node core: race session, leaderboard and leaderboard file.
pub struct Timekeeper {
    session: RaceSession,
    leaderboard: SharedLeaderboard,
    store: SharedStore,
    events: broadcast::Sender<RaceEvent>,
}

impl Timekeeper {
    pub fn new(
        start_signal: impl StartSignalSource,
        sensor: SensorPoller,
        store: CsvLeaderboardFile,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let leaderboard = Leaderboard::shared();
        let store = Arc::new(Mutex::new(store));
        let session = RaceSession::new(
            Arc::new(start_signal),
            Arc::new(sensor),
            Arc::clone(&leaderboard),
            Arc::clone(&store),
            events.clone(),
        );
        Self { session, leaderboard, store, events }
    }

    /// Load the configured leaderboard file and publish the first render.
    /// A missing file starts an empty leaderboard.
    pub fn initialize(&self) -> Result<Vec<RenderedRow>> {
        let mut leaderboard = self.leaderboard.lock();
        let report = self.store.lock().load()?;
        leaderboard.load_from(report.entries);
        let rows = leaderboard.render();
        drop(leaderboard);

        self.emit(RaceEvent::LeaderboardUpdated(rows.clone()));
        Ok(rows)
    }

    /// Apply one operator command.
    ///
    /// Rejected commands are also published as [`RaceEvent::ValidationFailed`]
    /// and failed loads or resets as [`RaceEvent::Warning`].
    pub fn handle(&self, command: RaceCommand) -> Result<()> {
        match command {
            RaceCommand::StartRequested { competitor } => self.start(&competitor),
            RaceCommand::CancelRequested => {
                self.cancel();
                Ok(())
            }
            RaceCommand::ManualLoadRequested { path } => self.load_from_path(path).map(|_| ()),
            RaceCommand::ResetRequested => self.reset(),
        }
    }

    pub fn start(&self, competitor: &str) -> Result<()> {
        self.session.start(competitor).inspect_err(|e| {
            warn!("Start rejected: {}", e);
            self.emit(RaceEvent::ValidationFailed(e.user_message()));
        })
    }

    /// Cancel the attempt in progress; `false` if there was none.
    pub fn cancel(&self) -> bool {
        self.session.cancel()
    }

    /// Replace the leaderboard with a file's contents and make that file the
    /// one saved to from now on. Returns the number of entries loaded.
    pub fn load_from_path(&self, path: impl Into<PathBuf>) -> Result<usize> {
        let path = path.into();
        // A result being recorded lands wholly before or after the switch
        let mut leaderboard = self.leaderboard.lock();
        let mut store = self.store.lock();

        let candidate = store.with_path(&path);
        let loaded = if path.is_file() {
            candidate.load()
        } else {
            Err(TimingError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )))
        };
        let report = match loaded {
            Ok(report) => report,
            Err(e) => {
                drop(store);
                drop(leaderboard);
                warn!("Cannot load leaderboard from {}: {}", path.display(), e);
                self.emit(RaceEvent::Warning(e.user_message()));
                return Err(e);
            }
        };

        let loaded = report.entries.len();
        *store = candidate;
        leaderboard.load_from(report.entries);
        let rows = leaderboard.render();
        drop(store);
        drop(leaderboard);

        self.emit(RaceEvent::LeaderboardUpdated(rows));
        info!(path = %path.display(), loaded, "Leaderboard loaded from file");
        Ok(loaded)
    }

    /// Clear the leaderboard, its rank history and its file.
    ///
    /// Destructive: front-ends must confirm with the operator first. A file
    /// that cannot be removed is reported but the in-memory reset stands.
    pub fn reset(&self) -> Result<()> {
        let (rows, removed) = {
            let mut leaderboard = self.leaderboard.lock();
            leaderboard.reset();
            let removed = self.store.lock().remove();
            (leaderboard.render(), removed)
        };
        self.emit(RaceEvent::LeaderboardUpdated(rows));
        info!("Leaderboard reset");

        removed.inspect_err(|e| {
            warn!("Leaderboard file not removed: {}", e);
            self.emit(RaceEvent::Warning(e.user_message()));
        })
    }

    /// Render the leaderboard (advancing the movement baseline) and publish it.
    pub fn refresh(&self) -> Vec<RenderedRow> {
        let rows = self.leaderboard.lock().render();
        self.emit(RaceEvent::LeaderboardUpdated(rows.clone()));
        rows
    }

    /// Storage rows for the current leaderboard, without touching the
    /// movement baseline.
    pub fn rows(&self) -> Vec<LeaderboardRow> {
        self.leaderboard.lock().persist()
    }

    pub fn state(&self) -> RaceState {
        self.session.state()
    }

    pub fn leaderboard(&self) -> SharedLeaderboard {
        Arc::clone(&self.leaderboard)
    }

    /// Path of the file results are saved to.
    pub fn storage_path(&self) -> PathBuf {
        self.store.lock().path().to_path_buf()
    }

    /// Raw event receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<RaceEvent> {
        self.events.subscribe()
    }

    /// Events as a stream. Events missed by a slow consumer are skipped with a
    /// warning.
    pub fn events(&self) -> impl Stream<Item = RaceEvent> + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| async move {
            match event {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    warn!(missed, "Event consumer lagging, events dropped");
                    None
                }
            }
        })
    }

    fn emit(&self, event: RaceEvent) {
        let _ = self.events.send(event);
    }
}
