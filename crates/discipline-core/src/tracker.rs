//! Reconciliation between the running session and the ledger's balance.
//!
//! The displayed balance is whatever the ledger last returned, replaced
//! wholesale on every response. While a session runs, the display adds a
//! projection computed from the timer's elapsed seconds. Stopping the timer
//! drops its elapsed count in the same step that hands the minutes to the
//! ledger, so the next projection starts from zero and a deposited session
//! is never counted twice.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::client::{LedgerClient, Receipt, RedeemRequest, SessionReceipt, StatusReport};
use crate::error::LedgerError;
use crate::events::Event;
use crate::rewards::{self, MinutePolicy, ProjectedReward, RewardBalance};
use crate::timer::{SessionId, SessionTimer, SharedTimer, StoppedSession};

/// Last authoritative balance plus the user-facing status line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardView {
    balances: RewardBalance,
    total_work_minutes: Option<f64>,
    status: String,
}

impl RewardView {
    pub fn balances(&self) -> &RewardBalance {
        &self.balances
    }

    pub fn total_work_minutes(&self) -> Option<f64> {
        self.total_work_minutes
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn replace(&mut self, balances: RewardBalance) {
        self.balances = balances;
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Balance plus projection. Pass a zero projection while idle.
    pub fn totals(&self, projection: &ProjectedReward) -> RewardBalance {
        self.balances.plus(projection)
    }
}

/// Minutes from a stopped session the ledger has not yet accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingDeposit {
    pub session_id: SessionId,
    pub worked_minutes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopOutcome {
    pub stopped: StoppedSession,
    pub worked_minutes: f64,
    pub receipt: SessionReceipt,
}

impl StopOutcome {
    pub fn events(&self) -> Vec<Event> {
        vec![
            Event::SessionStopped {
                session_id: self.stopped.session_id,
                elapsed_seconds: self.stopped.elapsed_seconds,
                worked_minutes: self.worked_minutes,
                at: self.stopped.stopped_at,
            },
            Event::RewardsDeposited {
                worked_minutes: self.receipt.worked_minutes,
                balances: self.receipt.balances,
                at: Utc::now(),
            },
        ]
    }
}

pub struct RewardTracker<C: LedgerClient> {
    client: C,
    timer: SharedTimer,
    view: RewardView,
    policy: MinutePolicy,
    pending: Option<PendingDeposit>,
}

impl<C: LedgerClient> RewardTracker<C> {
    pub fn new(client: C, policy: MinutePolicy) -> Self {
        Self {
            client,
            timer: Arc::new(Mutex::new(SessionTimer::new())),
            view: RewardView::default(),
            policy,
            pending: None,
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, SessionTimer> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Shared handle for a tick source.
    pub fn timer(&self) -> SharedTimer {
        Arc::clone(&self.timer)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn view(&self) -> &RewardView {
        &self.view
    }

    pub fn pending(&self) -> Option<PendingDeposit> {
        self.pending
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.lock_timer().elapsed_seconds()
    }

    pub fn is_running(&self) -> bool {
        self.lock_timer().is_running()
    }

    /// A pending deposit keeps the ledger's session open, so starting is
    /// blocked until it is resubmitted.
    pub fn can_start(&self) -> bool {
        self.pending.is_none() && self.lock_timer().can_start()
    }

    pub fn can_stop(&self) -> bool {
        self.lock_timer().can_stop()
    }

    /// Unrealized reward of the running session; zero while idle.
    pub fn projected(&self) -> ProjectedReward {
        self.lock_timer().projected()
    }

    pub fn displayed_totals(&self) -> RewardBalance {
        self.view.totals(&self.projected())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Initial load of the authoritative balance.
    pub fn load(&mut self) -> Result<StatusReport, LedgerError> {
        let report = self.client.fetch_status();
        let report = self.settle(report)?;
        self.view.replace(report.balances);
        self.view.total_work_minutes = Some(report.total_work_minutes);
        Ok(report)
    }

    pub fn start(&mut self) -> Result<Event, LedgerError> {
        if !self.can_start() {
            let reason = if self.pending.is_some() {
                "the previous session has not been deposited"
            } else {
                "a session is already running"
            };
            return self.settle(Err(LedgerError::illegal("start session", reason)));
        }
        let session = self.client.begin_session();
        let session = self.settle(session)?;
        let event = self.lock_timer().start_session(session);
        let event = self.settle(event)?;
        self.view.set_status("Timer started!");
        Ok(event)
    }

    /// Stop the timer and deposit its minutes.
    ///
    /// The timer stops even if the ledger cannot be reached; the minutes are
    /// then held as a [`PendingDeposit`] for [`retry_pending`](Self::retry_pending).
    pub fn stop(&mut self) -> Result<StopOutcome, LedgerError> {
        let stopped = self.lock_timer().stop();
        let stopped = self.settle(stopped)?;
        let worked_minutes = rewards::worked_minutes(stopped.elapsed_seconds, self.policy);
        self.pending = Some(PendingDeposit {
            session_id: stopped.session_id,
            worked_minutes,
        });
        let receipt = self.submit_pending()?;
        Ok(StopOutcome {
            stopped,
            worked_minutes,
            receipt,
        })
    }

    pub fn retry_pending(&mut self) -> Result<SessionReceipt, LedgerError> {
        if self.pending.is_none() {
            return self.settle(Err(LedgerError::illegal(
                "retry deposit",
                "nothing is pending",
            )));
        }
        self.submit_pending()
    }

    pub fn redeem(&mut self, category: &str, amount: f64) -> Result<Receipt, LedgerError> {
        let request = RedeemRequest {
            category: category.to_string(),
            amount,
        };
        let receipt = self.client.redeem(&request);
        let receipt = self.settle(receipt)?;
        self.apply_receipt(&receipt);
        Ok(receipt)
    }

    pub fn add_time(&mut self, minutes: i64) -> Result<Receipt, LedgerError> {
        let receipt = self.client.add_time(minutes);
        let receipt = self.settle(receipt)?;
        self.apply_receipt(&receipt);
        Ok(receipt)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn submit_pending(&mut self) -> Result<SessionReceipt, LedgerError> {
        let Some(pending) = self.pending else {
            return Err(LedgerError::illegal("deposit", "nothing is pending"));
        };
        match self
            .client
            .end_session(pending.session_id, pending.worked_minutes)
        {
            Ok(receipt) => {
                self.pending = None;
                self.view.replace(receipt.balances);
                self.view.total_work_minutes = Some(receipt.total_work_minutes);
                self.view.set_status(receipt.message.clone());
                Ok(receipt)
            }
            Err(e) => {
                // A rejected session id will never be accepted; only keep
                // minutes the ledger failed to receive.
                if !matches!(e, LedgerError::CollaboratorUnavailable(_)) {
                    self.pending = None;
                }
                tracing::warn!(session = %pending.session_id, error = %e, "session deposit failed");
                self.view.set_status(e.to_string());
                Err(e)
            }
        }
    }

    fn apply_receipt(&mut self, receipt: &Receipt) {
        self.view.replace(receipt.balances);
        self.view.total_work_minutes = Some(receipt.total_work_minutes);
        self.view.set_status(receipt.message.clone());
    }

    /// Surface a failure as the status line, leaving the balance untouched.
    fn settle<T>(&mut self, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
        if let Err(e) = &result {
            self.view.set_status(e.to_string());
        }
        result
    }
}
