//! Reward ledger: the single writer of the authoritative balance.
//!
//! Every mutation runs under one mutex and inside one store transaction, so a
//! redemption's balance check and its deduction can never interleave with
//! another operation's write.

mod store;

pub use store::{BalanceStore, EntryKind, LedgerEntry, LedgerState, MemoryStore};

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::error::LedgerError;
use crate::rewards::{self, RewardCategory, Ticks};
use crate::timer::SessionId;

/// A committed mutation: the new state and the audit entry describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub state: LedgerState,
    pub entry: LedgerEntry,
}

impl Committed {
    pub fn message(&self) -> &str {
        &self.entry.message
    }
}

struct Inner<S> {
    store: S,
    open_session: Option<SessionId>,
}

pub struct RewardLedger<S: BalanceStore> {
    inner: Mutex<Inner<S>>,
}

impl<S: BalanceStore> RewardLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store,
                open_session: None,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<S>>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::CollaboratorUnavailable("ledger lock poisoned".into()))
    }

    /// Current state without mutation.
    pub fn snapshot(&self) -> Result<LedgerState, LedgerError> {
        let inner = self.lock()?;
        Ok(inner.store.load()?)
    }

    pub fn history(&self, limit: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner.store.history(limit)?)
    }

    pub fn session_open(&self) -> Result<Option<SessionId>, LedgerError> {
        Ok(self.lock()?.open_session)
    }

    /// Credit `worked_minutes` of work to every category at its rate.
    pub fn deposit(&self, worked_minutes: f64) -> Result<Committed, LedgerError> {
        check_minutes("worked_minutes", worked_minutes)?;
        let mut inner = self.lock()?;
        credit(
            &mut inner.store,
            EntryKind::Deposit,
            worked_minutes,
            format!("Deposited {} min", fmt_amount(worked_minutes)),
        )
    }

    /// Out-of-band addition not tied to a live session.
    pub fn manual_add(&self, minutes: i64) -> Result<Committed, LedgerError> {
        if minutes < 0 {
            tracing::warn!(minutes, "rejected negative manual addition");
            return Err(LedgerError::invalid_amount("minutes", minutes));
        }
        let mut inner = self.lock()?;
        credit(
            &mut inner.store,
            EntryKind::Manual,
            minutes as f64,
            format!("{minutes} minutes added."),
        )
    }

    /// Withdraw `amount` from one category.
    ///
    /// The amount is rounded to the nearest tick before it is compared with
    /// the balance.
    pub fn redeem(&self, category: RewardCategory, amount: f64) -> Result<Committed, LedgerError> {
        check_minutes("amount", amount)?;
        let requested = Ticks::try_from_units(amount)
            .ok_or_else(|| LedgerError::invalid_amount("amount", amount))?;
        let amount = requested.to_units();
        let mut inner = self.lock()?;
        let result = inner.store.transact(|state| {
            let available = state.balance.ticks(category);
            if requested > available {
                return Err(LedgerError::InsufficientBalance {
                    category,
                    requested: amount,
                    available: available.to_units(),
                });
            }
            state
                .balance
                .set_ticks(category, available.saturating_sub(requested));
            Ok(LedgerEntry {
                kind: EntryKind::Redeem,
                category: Some(category),
                amount,
                message: format!("{} {} used.", fmt_amount(amount), category),
                at: Utc::now(),
            })
        });
        match result {
            Ok((state, entry)) => {
                tracing::info!(%category, amount, remaining = state.balance.get(category), "reward redeemed");
                Ok(Committed { state, entry })
            }
            Err(e) => {
                tracing::warn!(%category, amount, error = %e, "redemption rejected");
                Err(e)
            }
        }
    }

    /// Like [`redeem`](Self::redeem), for a category name arriving over the wire.
    pub fn redeem_named(&self, category: &str, amount: f64) -> Result<Committed, LedgerError> {
        let category: RewardCategory = category.parse()?;
        self.redeem(category, amount)
    }

    /// Open the server-side bracket for a timed session.
    pub fn begin_session(&self) -> Result<SessionId, LedgerError> {
        let mut inner = self.lock()?;
        if let Some(open) = inner.open_session {
            return Err(LedgerError::illegal(
                "begin session",
                format!("session {open} is still open"),
            ));
        }
        let id = SessionId::new();
        inner.open_session = Some(id);
        tracing::info!(session = %id, "ledger session opened");
        Ok(id)
    }

    /// Close the bracket opened by [`begin_session`](Self::begin_session) and
    /// deposit its minutes. A session id that is not the open one is stale.
    pub fn end_session(
        &self,
        session: SessionId,
        worked_minutes: f64,
    ) -> Result<Committed, LedgerError> {
        check_minutes("worked_minutes", worked_minutes)?;
        let mut inner = self.lock()?;
        match inner.open_session {
            Some(open) if open == session => {}
            Some(open) => {
                return Err(LedgerError::illegal(
                    "end session",
                    format!("session {session} is stale, {open} is open"),
                ))
            }
            None => {
                return Err(LedgerError::illegal(
                    "end session",
                    format!("session {session} was never started"),
                ))
            }
        }
        let committed = credit(
            &mut inner.store,
            EntryKind::Session,
            worked_minutes,
            format!("Worked {} min", fmt_amount(worked_minutes)),
        )?;
        inner.open_session = None;
        Ok(committed)
    }
}

fn credit<S: BalanceStore>(
    store: &mut S,
    kind: EntryKind,
    minutes: f64,
    message: String,
) -> Result<Committed, LedgerError> {
    let earned = rewards::reward_for_minutes(minutes);
    let (state, entry) = store.transact(|state| {
        state.balance = state.balance.plus(&earned);
        state.total_work_minutes += minutes;
        Ok(LedgerEntry {
            kind,
            category: None,
            amount: minutes,
            message,
            at: Utc::now(),
        })
    })?;
    tracing::info!(kind = kind.as_str(), minutes, "rewards deposited");
    Ok(Committed { state, entry })
}

fn check_minutes(field: &'static str, value: f64) -> Result<(), LedgerError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        tracing::warn!(field, value, "rejected invalid amount");
        Err(LedgerError::invalid_amount(field, value))
    }
}

/// `5` for whole numbers, `4.25` otherwise.
pub(crate) fn fmt_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::RewardBalance;

    fn ledger() -> RewardLedger<MemoryStore> {
        RewardLedger::new(MemoryStore::new())
    }

    #[test]
    fn one_hour_deposit_credits_every_category() {
        let ledger = ledger();
        let committed = ledger.deposit(60.0).unwrap();
        let balance = committed.state.balance;
        assert_eq!(balance.movie, 10.0);
        assert_eq!(balance.video_streaming, 5.0);
        assert_eq!(balance.social_media, 1.0);
        assert_eq!(balance.snack_money, 1.0);
        assert_eq!(committed.state.total_work_minutes, 60.0);
    }

    #[test]
    fn deposit_rejects_negative_and_non_finite() {
        let ledger = ledger();
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let err = ledger.deposit(bad).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        }
        assert_eq!(ledger.snapshot().unwrap(), LedgerState::default());
    }

    #[test]
    fn manual_add_negative_is_invalid() {
        let ledger = ledger();
        ledger.manual_add(30).unwrap();
        let before = ledger.snapshot().unwrap();

        let err = ledger.manual_add(-10).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { field: "minutes", .. }));
        assert_eq!(ledger.snapshot().unwrap(), before);
    }

    #[test]
    fn manual_add_message() {
        let committed = ledger().manual_add(45).unwrap();
        assert_eq!(committed.message(), "45 minutes added.");
        assert_eq!(committed.entry.kind, EntryKind::Manual);
    }

    #[test]
    fn redeem_deducts_only_its_category() {
        let ledger = ledger();
        ledger.deposit(60.0).unwrap();
        let committed = ledger.redeem(RewardCategory::Movie, 4.0).unwrap();
        assert_eq!(committed.state.balance.movie, 6.0);
        assert_eq!(committed.state.balance.video_streaming, 5.0);
        assert_eq!(committed.message(), "4 movie used.");
    }

    #[test]
    fn redeem_more_than_balance_is_rejected() {
        let ledger = RewardLedger::new(MemoryStore::with_balance(RewardBalance {
            movie: 4.0,
            ..RewardBalance::zero()
        }));
        let err = ledger.redeem(RewardCategory::Movie, 5.0).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                category: RewardCategory::Movie,
                requested: 5.0,
                available: 4.0,
            }
        );
        assert_eq!(ledger.snapshot().unwrap().balance.movie, 4.0);
        assert!(ledger.history(10).unwrap().is_empty());
    }

    #[test]
    fn redeem_exact_balance_reaches_zero() {
        let ledger = ledger();
        ledger.deposit(60.0).unwrap();
        let committed = ledger.redeem(RewardCategory::SnackMoney, 1.0).unwrap();
        assert_eq!(committed.state.balance.snack_money, 0.0);
    }

    #[test]
    fn split_deposits_can_be_redeemed_in_full() {
        let ledger = ledger();
        for _ in 0..6 {
            ledger.manual_add(10).unwrap();
        }
        let balance = ledger.snapshot().unwrap().balance;
        assert_eq!(balance, rewards::reward_for_minutes(60.0));

        for (category, amount) in [
            (RewardCategory::Movie, 10.0),
            (RewardCategory::VideoStreaming, 5.0),
            (RewardCategory::SocialMedia, 1.0),
            (RewardCategory::SnackMoney, 1.0),
        ] {
            ledger.redeem(category, amount).unwrap();
        }
        assert!(ledger.snapshot().unwrap().balance.is_zero());
    }

    #[test]
    fn split_sessions_can_be_redeemed_in_full() {
        let ledger = ledger();
        for _ in 0..6 {
            let session = ledger.begin_session().unwrap();
            ledger.end_session(session, 10.0).unwrap();
        }
        let committed = ledger.redeem(RewardCategory::Movie, 10.0).unwrap();
        assert_eq!(committed.state.balance.movie, 0.0);
        let committed = ledger.redeem(RewardCategory::SnackMoney, 1.0).unwrap();
        assert_eq!(committed.state.balance.snack_money, 0.0);
    }

    #[test]
    fn one_tick_short_is_still_insufficient() {
        let ledger = ledger();
        // 59 minutes of social media is 59/60 of a unit.
        ledger.manual_add(59).unwrap();
        let err = ledger.redeem(RewardCategory::SocialMedia, 1.0).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        ledger.manual_add(1).unwrap();
        ledger.redeem(RewardCategory::SocialMedia, 1.0).unwrap();
        assert_eq!(ledger.snapshot().unwrap().balance.social_media, 0.0);
    }

    #[test]
    fn redeem_named_rejects_unknown_category() {
        let ledger = ledger();
        ledger.deposit(60.0).unwrap();
        let err = ledger.redeem_named("tiktok", 1.0).unwrap_err();
        assert_eq!(err, LedgerError::UnknownCategory("tiktok".into()));
        assert_eq!(ledger.snapshot().unwrap().balance.movie, 10.0);
    }

    #[test]
    fn redeem_rejects_negative_amount() {
        let ledger = ledger();
        ledger.deposit(60.0).unwrap();
        let err = ledger.redeem(RewardCategory::Movie, -2.0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert_eq!(ledger.snapshot().unwrap().balance.movie, 10.0);
    }

    #[test]
    fn session_bracket_rejects_stale_id() {
        let ledger = ledger();
        let open = ledger.begin_session().unwrap();
        assert!(matches!(
            ledger.begin_session(),
            Err(LedgerError::IllegalTransition { .. })
        ));

        let stale = SessionId::new();
        assert!(matches!(
            ledger.end_session(stale, 60.0),
            Err(LedgerError::IllegalTransition { .. })
        ));

        let committed = ledger.end_session(open, 60.0).unwrap();
        assert_eq!(committed.state.balance.movie, 10.0);
        assert_eq!(committed.message(), "Worked 60 min");
        assert_eq!(ledger.session_open().unwrap(), None);

        // Resubmitting the same session is rejected.
        assert!(ledger.end_session(open, 60.0).is_err());
        assert_eq!(ledger.snapshot().unwrap().balance.movie, 10.0);
    }

    #[test]
    fn concurrent_redemptions_never_overdraw() {
        use std::sync::Arc;

        let ledger = Arc::new(ledger());
        ledger.deposit(60.0).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.redeem(RewardCategory::Movie, 3.0).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(ledger.snapshot().unwrap().balance.movie, 1.0);
    }

    #[test]
    fn fmt_amount_trims_whole_numbers() {
        assert_eq!(fmt_amount(5.0), "5");
        assert_eq!(fmt_amount(4.25), "4.25");
    }
}
