//! Ledger collaborator contract as seen from the session side.
//!
//! The tracker talks to the ledger only through [`LedgerClient`]. Payloads are
//! plain serde types so a transport can carry them as JSON unchanged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::{BalanceStore, Committed, LedgerEntry, RewardLedger};
use crate::rewards::RewardBalance;
use crate::timer::SessionId;

/// Response to `end_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReceipt {
    pub worked_minutes: f64,
    pub message: String,
    pub balances: RewardBalance,
    pub total_work_minutes: f64,
}

/// Response to `fetch_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub balances: RewardBalance,
    pub total_work_minutes: f64,
    pub session_open: bool,
}

/// Response to `redeem` and `add_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub message: String,
    pub balances: RewardBalance,
    pub total_work_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub category: String,
    pub amount: f64,
}

impl From<Committed> for Receipt {
    fn from(committed: Committed) -> Self {
        Receipt {
            message: committed.entry.message,
            balances: committed.state.balance,
            total_work_minutes: committed.state.total_work_minutes,
        }
    }
}

pub trait LedgerClient {
    fn begin_session(&self) -> Result<SessionId, LedgerError>;

    fn end_session(
        &self,
        session: SessionId,
        worked_minutes: f64,
    ) -> Result<SessionReceipt, LedgerError>;

    fn fetch_status(&self) -> Result<StatusReport, LedgerError>;

    fn redeem(&self, request: &RedeemRequest) -> Result<Receipt, LedgerError>;

    fn add_time(&self, minutes: i64) -> Result<Receipt, LedgerError>;

    fn history(&self, _limit: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(Vec::new()) // default no-op
    }
}

/// In-process client sharing a ledger with any other holder of the `Arc`.
pub struct LocalClient<S: BalanceStore> {
    ledger: Arc<RewardLedger<S>>,
}

impl<S: BalanceStore> LocalClient<S> {
    pub fn new(ledger: Arc<RewardLedger<S>>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<RewardLedger<S>> {
        &self.ledger
    }
}

impl<S: BalanceStore> Clone for LocalClient<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<S: BalanceStore> LedgerClient for LocalClient<S> {
    fn begin_session(&self) -> Result<SessionId, LedgerError> {
        self.ledger.begin_session()
    }

    fn end_session(
        &self,
        session: SessionId,
        worked_minutes: f64,
    ) -> Result<SessionReceipt, LedgerError> {
        let committed = self.ledger.end_session(session, worked_minutes)?;
        Ok(SessionReceipt {
            worked_minutes,
            message: committed.entry.message,
            balances: committed.state.balance,
            total_work_minutes: committed.state.total_work_minutes,
        })
    }

    fn fetch_status(&self) -> Result<StatusReport, LedgerError> {
        let state = self.ledger.snapshot()?;
        Ok(StatusReport {
            balances: state.balance,
            total_work_minutes: state.total_work_minutes,
            session_open: self.ledger.session_open()?.is_some(),
        })
    }

    fn redeem(&self, request: &RedeemRequest) -> Result<Receipt, LedgerError> {
        self.ledger
            .redeem_named(&request.category, request.amount)
            .map(Receipt::from)
    }

    fn add_time(&self, minutes: i64) -> Result<Receipt, LedgerError> {
        self.ledger.manual_add(minutes).map(Receipt::from)
    }

    fn history(&self, limit: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.ledger.history(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryStore;

    fn client() -> LocalClient<MemoryStore> {
        LocalClient::new(Arc::new(RewardLedger::new(MemoryStore::new())))
    }

    #[test]
    fn receipts_serialize_with_wire_names() {
        let client = client();
        let receipt = client.add_time(60).unwrap();
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["message"], "60 minutes added.");
        assert_eq!(json["balances"]["video_streaming"], 5.0);
        assert_eq!(json["balances"]["snack_money"], 1.0);
    }

    #[test]
    fn redeem_request_accepts_legacy_category() {
        let client = client();
        client.add_time(60).unwrap();
        let request: RedeemRequest =
            serde_json::from_str(r#"{"category": "youtube", "amount": 2}"#).unwrap();
        let receipt = client.redeem(&request).unwrap();
        assert_eq!(receipt.balances.video_streaming, 3.0);
    }

    #[test]
    fn status_reports_open_session() {
        let client = client();
        assert!(!client.fetch_status().unwrap().session_open);
        let id = client.begin_session().unwrap();
        assert!(client.fetch_status().unwrap().session_open);
        let receipt = client.end_session(id, 30.0).unwrap();
        assert_eq!(receipt.worked_minutes, 30.0);
        assert_eq!(receipt.balances.movie, 5.0);
        let status = client.fetch_status().unwrap();
        assert!(!status.session_open);
        assert_eq!(status.total_work_minutes, 30.0);
    }
}
