//! Persistence collaborator for the reward ledger.
//!
//! The ledger never writes balances itself; it hands a closure to
//! [`BalanceStore::transact`], which must run read, check and write as one
//! indivisible unit and persist nothing if the closure fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, LedgerError};
use crate::rewards::{RewardBalance, RewardCategory};

/// Authoritative ledger contents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerState {
    pub balance: RewardBalance,
    /// Work minutes ever deposited, from sessions and manual additions.
    pub total_work_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Plain deposit of worked minutes.
    Deposit,
    /// Deposit closing a timed session.
    Session,
    /// Out-of-band minutes.
    Manual,
    Redeem,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Session => "session",
            EntryKind::Manual => "manual",
            EntryKind::Redeem => "redeem",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(EntryKind::Deposit),
            "session" => Some(EntryKind::Session),
            "manual" => Some(EntryKind::Manual),
            "redeem" => Some(EntryKind::Redeem),
            _ => None,
        }
    }
}

/// Audit record written alongside every committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    /// Set for redemptions only.
    pub category: Option<RewardCategory>,
    /// Units redeemed, or minutes deposited.
    pub amount: f64,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Storage backing the authoritative balance.
pub trait BalanceStore: Send {
    fn load(&self) -> Result<LedgerState, DatabaseError>;

    /// Apply `apply` to the current state atomically.
    ///
    /// On `Ok` the mutated state and the returned entry are persisted together.
    /// On `Err` nothing is written and the error is passed through.
    fn transact<F>(&mut self, apply: F) -> Result<(LedgerState, LedgerEntry), LedgerError>
    where
        F: FnOnce(&mut LedgerState) -> Result<LedgerEntry, LedgerError>;

    /// Most recent entries first.
    fn history(&self, limit: usize) -> Result<Vec<LedgerEntry>, DatabaseError>;
}

/// In-process store; contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: LedgerState,
    entries: Vec<LedgerEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: RewardBalance) -> Self {
        Self {
            state: LedgerState {
                balance,
                total_work_minutes: 0.0,
            },
            entries: Vec::new(),
        }
    }
}

impl BalanceStore for MemoryStore {
    fn load(&self) -> Result<LedgerState, DatabaseError> {
        Ok(self.state)
    }

    fn transact<F>(&mut self, apply: F) -> Result<(LedgerState, LedgerEntry), LedgerError>
    where
        F: FnOnce(&mut LedgerState) -> Result<LedgerEntry, LedgerError>,
    {
        let mut next = self.state;
        let entry = apply(&mut next)?;
        self.state = next;
        self.entries.push(entry.clone());
        Ok((next, entry))
    }

    fn history(&self, limit: usize) -> Result<Vec<LedgerEntry>, DatabaseError> {
        Ok(self.entries.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind) -> LedgerEntry {
        LedgerEntry {
            kind,
            category: None,
            amount: 1.0,
            message: String::new(),
            at: Utc::now(),
        }
    }

    #[test]
    fn failed_transaction_writes_nothing() {
        let mut store = MemoryStore::new();
        let result = store.transact(|state| {
            state.balance.movie = 99.0;
            Err(LedgerError::UnknownCategory("x".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.load().unwrap().balance.movie, 0.0);
        assert!(store.history(10).unwrap().is_empty());
    }

    #[test]
    fn history_is_newest_first() {
        let mut store = MemoryStore::new();
        store.transact(|_| Ok(entry(EntryKind::Manual))).unwrap();
        store.transact(|_| Ok(entry(EntryKind::Redeem))).unwrap();
        let history = store.history(10).unwrap();
        assert_eq!(history[0].kind, EntryKind::Redeem);
        assert_eq!(history[1].kind, EntryKind::Manual);
        assert_eq!(store.history(1).unwrap().len(), 1);
    }
}
