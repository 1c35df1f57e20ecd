//! Periodic tick source for a running session.
//!
//! A ticker is bound to one session id. Each tick goes through the shared
//! timer's lock, the same lock `stop()` takes, so once stop has returned every
//! later tick sees an idle timer (or a different session) and is dropped. The
//! task exits on the first dropped tick; [`Ticker::cancel`] aborts it eagerly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{SessionId, SessionTimer};

/// Timer shared between the caller and its tick source.
pub type SharedTimer = Arc<Mutex<SessionTimer>>;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a tick source on the current tokio runtime.
    ///
    /// `on_tick` receives the elapsed seconds after each accepted tick and is
    /// called without the timer lock held.
    pub fn spawn<F>(timer: SharedTimer, session: SessionId, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let elapsed = match timer.lock() {
                    Ok(mut guard) => guard.tick(session),
                    Err(_) => None,
                };
                match elapsed {
                    Some(elapsed) => on_tick(elapsed),
                    None => break,
                }
            }
            tracing::debug!(session = %session, "tick source finished");
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        // Drop aborts the task.
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
