//! Session timer implementation.
//!
//! The session timer is a two-state machine counting whole seconds of work in
//! the current session. It does not own a thread: ticks are delivered by the
//! caller, or by a [`Ticker`](super::Ticker) task, and each tick names the
//! session it belongs to.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = SessionTimer::new();
//! timer.start()?;
//! let id = timer.session_id().unwrap();
//! timer.tick(id); // once per second
//! let stopped = timer.stop()?;
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::events::Event;
use crate::rewards::{self, ProjectedReward};

/// Identifies one start-to-stop run of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
}

#[derive(Debug, Clone)]
struct RunningSession {
    id: SessionId,
    started_at: DateTime<Utc>,
    elapsed_seconds: u64,
}

/// Result of a successful `stop()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppedSession {
    pub session_id: SessionId,
    pub elapsed_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
}

/// Point-in-time view of the timer for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub session_id: Option<SessionId>,
    pub elapsed_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
}

/// Core session timer.
///
/// Elapsed seconds only exist while `Running`; the counter is dropped together
/// with the running session on stop, so a late tick has nothing to increment.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    running: Option<RunningSession>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        if self.running.is_some() {
            TimerState::Running
        } else {
            TimerState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn can_start(&self) -> bool {
        !self.is_running()
    }

    pub fn can_stop(&self) -> bool {
        self.is_running()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.running.as_ref().map(|r| r.id)
    }

    /// Seconds in the current session; 0 while idle.
    pub fn elapsed_seconds(&self) -> u64 {
        self.running.as_ref().map(|r| r.elapsed_seconds).unwrap_or(0)
    }

    /// Unrealized reward for the current session; all zero while idle.
    pub fn projected(&self) -> ProjectedReward {
        rewards::project(self.elapsed_seconds())
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state(),
            session_id: self.session_id(),
            elapsed_seconds: self.elapsed_seconds(),
            started_at: self.running.as_ref().map(|r| r.started_at),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a fresh session with a locally generated id.
    pub fn start(&mut self) -> Result<Event, LedgerError> {
        self.start_session(SessionId::new())
    }

    /// Start a session under an id issued by the ledger.
    pub fn start_session(&mut self, id: SessionId) -> Result<Event, LedgerError> {
        if let Some(current) = &self.running {
            return Err(LedgerError::illegal(
                "start session",
                format!("session {} is already running", current.id),
            ));
        }
        let now = Utc::now();
        self.running = Some(RunningSession {
            id,
            started_at: now,
            elapsed_seconds: 0,
        });
        tracing::info!(session = %id, "session started");
        Ok(Event::SessionStarted {
            session_id: id,
            at: now,
        })
    }

    /// Count one second for `session`.
    ///
    /// Returns the new elapsed count, or `None` when the timer is idle or
    /// running a different session. A `None` tells the tick source to exit.
    pub fn tick(&mut self, session: SessionId) -> Option<u64> {
        match self.running.as_mut() {
            Some(running) if running.id == session => {
                running.elapsed_seconds += 1;
                tracing::trace!(session = %session, elapsed = running.elapsed_seconds, "tick");
                Some(running.elapsed_seconds)
            }
            _ => {
                tracing::debug!(session = %session, "dropping tick for inactive session");
                None
            }
        }
    }

    /// Stop the running session and reset elapsed time to zero.
    pub fn stop(&mut self) -> Result<StoppedSession, LedgerError> {
        let running = self
            .running
            .take()
            .ok_or_else(|| LedgerError::illegal("stop session", "no session is running"))?;
        tracing::info!(
            session = %running.id,
            elapsed = running.elapsed_seconds,
            "session stopped"
        );
        Ok(StoppedSession {
            session_id: running.id,
            elapsed_seconds: running.elapsed_seconds,
            started_at: running.started_at,
            stopped_at: Utc::now(),
        })
    }
}
