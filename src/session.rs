//! Race attempt state machine
//!
//! One [`RaceSession`] exists per finish node and runs at most one attempt at
//! a time. `start` validates the request and spawns a background worker that
//! performs two cancellable waits in sequence (start timestamp, then finish
//! sensor) and records the result. `cancel` signals the attempt's token.
//!
//! ```text
//! Idle -> AwaitingStart -> AwaitingFinish -> Completed -> Idle
//!              |                 |
//!              +-----------------+--> Cancelled -> Idle
//! ```
//!
//! On completion the entry is inserted into the leaderboard and saved before
//! any completion event is sent.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::RaceEvent;
use crate::leaderboard::{CsvLeaderboardFile, SharedLeaderboard};
use crate::sensor::SensorPoller;
use crate::signal::StartSignalSource;
use crate::types::{CompetitorName, ElapsedTime, LeaderboardEntry, RaceState};
use crate::{Result, TimingError};

/// Leaderboard file shared between the worker and the command path.
///
/// Always locked after the leaderboard, never before.
pub type SharedStore = Arc<Mutex<CsvLeaderboardFile>>;

#[derive(Debug, Default)]
struct Attempt {
    state: RaceState,
    id: u64,
    competitor: Option<CompetitorName>,
    start_timestamp: Option<f64>,
    /// Present while the attempt can still be cancelled
    cancel: Option<CancellationToken>,
}

struct SessionShared {
    attempt: Mutex<Attempt>,
    start_signal: Arc<dyn StartSignalSource>,
    sensor: Arc<SensorPoller>,
    leaderboard: SharedLeaderboard,
    store: SharedStore,
    events: broadcast::Sender<RaceEvent>,
}

/// Single-lane race session.
pub struct RaceSession {
    shared: Arc<SessionShared>,
}

impl RaceSession {
    pub fn new(
        start_signal: Arc<dyn StartSignalSource>,
        sensor: Arc<SensorPoller>,
        leaderboard: SharedLeaderboard,
        store: SharedStore,
        events: broadcast::Sender<RaceEvent>,
    ) -> Self {
        let shared = SessionShared {
            attempt: Mutex::new(Attempt::default()),
            start_signal,
            sensor,
            leaderboard,
            store,
            events,
        };
        Self { shared: Arc::new(shared) }
    }

    pub fn state(&self) -> RaceState {
        self.shared.attempt.lock().state
    }

    /// Competitor of the attempt in progress, if any.
    pub fn competitor(&self) -> Option<CompetitorName> {
        self.shared.attempt.lock().competitor.clone()
    }

    /// Start timestamp held by the attempt in progress, once received.
    pub fn start_timestamp(&self) -> Option<f64> {
        self.shared.attempt.lock().start_timestamp
    }

    /// Begin an attempt. Must be called from within a tokio runtime.
    ///
    /// Fails with [`TimingError::AlreadyRunning`] unless the session is idle and
    /// with [`TimingError::Validation`] for a blank name; the session is left
    /// untouched in both cases.
    pub fn start(&self, competitor: &str) -> Result<()> {
        let mut attempt = self.shared.attempt.lock();
        if attempt.state != RaceState::Idle {
            return Err(TimingError::AlreadyRunning { state: attempt.state });
        }
        let competitor = CompetitorName::new(competitor)?;

        let cancel = CancellationToken::new();
        attempt.id += 1;
        attempt.competitor = Some(competitor.clone());
        attempt.start_timestamp = None;
        attempt.cancel = Some(cancel.clone());
        let id = attempt.id;
        self.shared.transition(&mut attempt, RaceState::AwaitingStart);
        drop(attempt);

        info!(%competitor, attempt = id, "Race started, waiting for start signal");
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            shared.run_attempt(id, competitor, cancel).await;
        });
        Ok(())
    }

    /// Abort the attempt in progress.
    ///
    /// Returns `false` (and does nothing) when there is nothing to cancel:
    /// idle, already terminal, or the result is being recorded.
    pub fn cancel(&self) -> bool {
        let mut attempt = self.shared.attempt.lock();
        if !attempt.state.is_running() {
            return false;
        }
        let Some(cancel) = attempt.cancel.take() else {
            debug!("Cancel ignored, result already being recorded");
            return false;
        };
        cancel.cancel();
        info!(attempt = attempt.id, "Race cancelled by operator");
        self.shared.transition(&mut attempt, RaceState::Cancelled);
        true
    }
}

impl Drop for RaceSession {
    fn drop(&mut self) {
        if let Some(cancel) = self.shared.attempt.lock().cancel.take() {
            debug!("Dropping race session, cancelling attempt in progress");
            cancel.cancel();
        }
    }
}

impl SessionShared {
    fn emit(&self, event: RaceEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn transition(&self, attempt: &mut Attempt, state: RaceState) {
        debug!(from = %attempt.state, to = %state, attempt = attempt.id, "Race state change");
        attempt.state = state;
        self.emit(RaceEvent::RaceStatusChanged(state));
    }

    async fn run_attempt(&self, id: u64, competitor: CompetitorName, cancel: CancellationToken) {
        let start = match self.start_signal.receive_start(&cancel).await {
            Ok(Some(timestamp)) => timestamp,
            Ok(None) => return self.abort(id, None),
            Err(e) => return self.abort(id, Some(e)),
        };

        if !self.begin_finish_wait(id, start) {
            return self.abort(id, None);
        }

        let finish = match self.sensor.wait_for_trip(&cancel).await {
            Ok(Some(timestamp)) => timestamp,
            Ok(None) => return self.abort(id, None),
            Err(e) => return self.abort(id, Some(e)),
        };

        match ElapsedTime::between(start, finish) {
            Ok(elapsed) => self.complete(id, LeaderboardEntry::new(competitor, elapsed)),
            Err(e) => {
                warn!(start, finish, "Start and finish clocks disagree");
                self.abort(id, Some(e))
            }
        }
    }

    fn begin_finish_wait(&self, id: u64, start: f64) -> bool {
        let mut attempt = self.attempt.lock();
        if attempt.id != id || attempt.state != RaceState::AwaitingStart {
            return false;
        }
        attempt.start_timestamp = Some(start);
        self.transition(&mut attempt, RaceState::AwaitingFinish);
        true
    }

    /// End the attempt without a result.
    fn abort(&self, id: u64, reason: Option<TimingError>) {
        let mut attempt = self.attempt.lock();
        if attempt.id != id {
            return;
        }

        if let Some(e) = reason {
            warn!(attempt = id, "Race aborted: {}", e);
            self.emit(RaceEvent::Warning(e.user_message()));
        }

        if attempt.state.is_running() {
            attempt.cancel = None;
            self.transition(&mut attempt, RaceState::Cancelled);
        }
        self.finish(&mut attempt);
    }

    fn complete(&self, id: u64, entry: LeaderboardEntry) {
        {
            let mut attempt = self.attempt.lock();
            if attempt.id != id || attempt.state != RaceState::AwaitingFinish {
                drop(attempt);
                return self.abort(id, None);
            }
            // From here on the result is recorded whatever the operator does
            attempt.cancel = None;
        }

        info!(
            competitor = %entry.competitor,
            elapsed = %entry.elapsed,
            "Race completed"
        );

        // Lock order: leaderboard, then store; both held while the file is written
        let rendered = {
            let mut leaderboard = self.leaderboard.lock();
            leaderboard.insert(entry);
            let store = self.store.lock();
            if let Err(e) = store.save(&leaderboard.persist()) {
                error!("Leaderboard not saved, result kept in memory: {}", e);
                self.emit(RaceEvent::Warning(e.user_message()));
            }
            leaderboard.render()
        };

        self.emit(RaceEvent::LeaderboardUpdated(rendered));

        let mut attempt = self.attempt.lock();
        if attempt.id == id {
            self.transition(&mut attempt, RaceState::Completed);
            self.finish(&mut attempt);
        }
    }

    /// Terminal state -> Idle.
    fn finish(&self, attempt: &mut Attempt) {
        attempt.competitor = None;
        attempt.start_timestamp = None;
        attempt.cancel = None;
        self.transition(attempt, RaceState::Idle);
    }
}
