//! SQLite-backed reward ledger storage.
//!
//! Provides persistent storage for:
//! - Per-category reward balances
//! - The audit trail of deposits and redemptions
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::error::{DatabaseError, LedgerError};
use crate::ledger::{BalanceStore, EntryKind, LedgerEntry, LedgerState};
use crate::rewards::{RewardBalance, RewardCategory, Ticks};

use super::{data_dir, migrations};

const TOTAL_WORK_MINUTES_KEY: &str = "total_work_minutes";

/// SQLite database holding the authoritative balance.
///
/// Mutations run in `BEGIN IMMEDIATE` transactions, so two processes sharing
/// the file serialize their read-check-write cycles as well. Balances are
/// stored as integer [`Ticks`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/discipline.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::DataDir(e.to_string()))?;
        Self::open_at(&dir.join("discipline.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "ledger database opened");
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        kv_get(&self.conn, key)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        kv_set(&self.conn, key, value)
    }
}

impl BalanceStore for Database {
    fn load(&self) -> Result<LedgerState, DatabaseError> {
        read_state(&self.conn)
    }

    fn transact<F>(&mut self, apply: F) -> Result<(LedgerState, LedgerEntry), LedgerError>
    where
        F: FnOnce(&mut LedgerState) -> Result<LedgerEntry, LedgerError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;
        let mut state = read_state(&tx)?;
        // Dropping `tx` on the error path rolls back.
        let entry = apply(&mut state)?;
        write_state(&tx, &state)?;
        insert_entry(&tx, &entry)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok((state, entry))
    }

    fn history(&self, limit: usize) -> Result<Vec<LedgerEntry>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, category, amount, message, created_at
             FROM ledger_entries
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (kind, category, amount, message, created_at) = row?;
            let kind = EntryKind::parse(&kind)
                .ok_or_else(|| DatabaseError::QueryFailed(format!("unknown entry kind: {kind}")))?;
            let category = category
                .map(|c| c.parse::<RewardCategory>())
                .transpose()
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            let at = DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            entries.push(LedgerEntry {
                kind,
                category,
                amount,
                message,
                at,
            });
        }
        Ok(entries)
    }
}

fn read_state(conn: &Connection) -> Result<LedgerState, DatabaseError> {
    let mut balance = RewardBalance::zero();
    let mut stmt = conn.prepare("SELECT category, ticks FROM balances")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (category, ticks) = row?;
        match category.parse::<RewardCategory>() {
            Ok(category) => balance.set_ticks(category, Ticks::from_raw(ticks)),
            Err(_) => tracing::warn!(%category, "ignoring unknown balance row"),
        }
    }

    let total_work_minutes = match kv_get(conn, TOTAL_WORK_MINUTES_KEY)? {
        Some(v) => v
            .parse::<f64>()
            .map_err(|e| DatabaseError::QueryFailed(format!("{TOTAL_WORK_MINUTES_KEY}: {e}")))?,
        None => 0.0,
    };

    Ok(LedgerState {
        balance,
        total_work_minutes,
    })
}

fn write_state(conn: &Connection, state: &LedgerState) -> Result<(), DatabaseError> {
    for category in RewardCategory::ALL {
        conn.execute(
            "INSERT OR REPLACE INTO balances (category, ticks) VALUES (?1, ?2)",
            params![category.as_str(), state.balance.ticks(category).raw()],
        )?;
    }
    kv_set(
        conn,
        TOTAL_WORK_MINUTES_KEY,
        &state.total_work_minutes.to_string(),
    )?;
    Ok(())
}

fn insert_entry(conn: &Connection, entry: &LedgerEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO ledger_entries (kind, category, amount, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.kind.as_str(),
            entry.category.map(|c| c.as_str()),
            entry.amount,
            entry.message,
            entry.at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind, category: Option<RewardCategory>, amount: f64) -> LedgerEntry {
        LedgerEntry {
            kind,
            category,
            amount,
            message: "test".into(),
            at: Utc::now(),
        }
    }

    #[test]
    fn fresh_database_is_zero() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.load().unwrap(), LedgerState::default());
    }

    #[test]
    fn transact_persists_state_and_entry() {
        let mut db = Database::open_memory().unwrap();
        db.transact(|state| {
            state.balance.movie = 10.0;
            state.total_work_minutes = 60.0;
            Ok(entry(EntryKind::Manual, None, 60.0))
        })
        .unwrap();

        let state = db.load().unwrap();
        assert_eq!(state.balance.movie, 10.0);
        assert_eq!(state.total_work_minutes, 60.0);

        let history = db.history(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, EntryKind::Manual);
    }

    #[test]
    fn failed_transact_rolls_back() {
        let mut db = Database::open_memory().unwrap();
        let result = db.transact(|state| {
            state.balance.movie = 10.0;
            Err(LedgerError::UnknownCategory("nope".into()))
        });
        assert!(result.is_err());
        assert_eq!(db.load().unwrap().balance.movie, 0.0);
        assert!(db.history(10).unwrap().is_empty());
    }

    #[test]
    fn negative_write_is_refused_by_schema() {
        let mut db = Database::open_memory().unwrap();
        let result = db.transact(|state| {
            state.balance.social_media = -1.0;
            Ok(entry(EntryKind::Redeem, Some(RewardCategory::SocialMedia), 1.0))
        });
        assert!(matches!(
            result,
            Err(LedgerError::CollaboratorUnavailable(_))
        ));
        assert_eq!(db.load().unwrap().balance.social_media, 0.0);
    }

    #[test]
    fn balances_are_stored_as_whole_ticks() {
        let mut db = Database::open_memory().unwrap();
        for _ in 0..6 {
            db.transact(|state| {
                state.balance = state.balance.plus(&crate::rewards::reward_for_minutes(10.0));
                Ok(entry(EntryKind::Manual, None, 10.0))
            })
            .unwrap();
        }
        let ticks: i64 = db
            .conn
            .query_row(
                "SELECT ticks FROM balances WHERE category = 'social_media'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(ticks, crate::rewards::TICKS_PER_UNIT);
        assert_eq!(db.load().unwrap().balance.movie, 10.0);
    }

    #[test]
    fn history_round_trips_category() {
        let mut db = Database::open_memory().unwrap();
        db.transact(|_| Ok(entry(EntryKind::Redeem, Some(RewardCategory::SnackMoney), 0.5)))
            .unwrap();
        let history = db.history(1).unwrap();
        assert_eq!(history[0].category, Some(RewardCategory::SnackMoney));
        assert_eq!(history[0].amount, 0.5);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}
