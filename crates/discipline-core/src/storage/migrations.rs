//! Database schema migrations for the reward ledger.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

use crate::rewards::{RewardCategory, TICKS_PER_UNIT};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: balances, audit entries and the kv table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS balances (
            category TEXT PRIMARY KEY,
            amount   REAL NOT NULL DEFAULT 0 CHECK (amount >= 0)
        );

        CREATE TABLE IF NOT EXISTS ledger_entries (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            kind       TEXT NOT NULL,
            category   TEXT,
            amount     REAL NOT NULL,
            message    TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_ledger_entries_created_at ON ledger_entries(created_at);",
    )?;

    for category in RewardCategory::ALL {
        tx.execute(
            "INSERT OR IGNORE INTO balances (category, amount) VALUES (?1, 0)",
            [category.as_str()],
        )?;
    }

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: import a legacy `user_state` row if one is present.
///
/// The legacy layout stored total work minutes and per-category usage, with
/// rewards earned in whole hours only. The derived balance becomes the
/// opening balance.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_legacy: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user_state'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if has_legacy {
        let legacy = tx.query_row(
            "SELECT total_work_minutes, used_movie, used_youtube, used_instagram, used_snack_money
             FROM user_state WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            },
        );
        match legacy {
            Ok((total, movie, video, social, snack)) => {
                let units = (total / 60) as f64;
                let used = [movie, video, social, snack];
                for (category, used) in RewardCategory::ALL.into_iter().zip(used) {
                    let amount = (units * category.rate() - used).max(0.0);
                    tx.execute(
                        "UPDATE balances SET amount = ?1 WHERE category = ?2",
                        rusqlite::params![amount, category.as_str()],
                    )?;
                }
                tx.execute(
                    "INSERT OR REPLACE INTO kv (key, value) VALUES ('total_work_minutes', ?1)",
                    [total.to_string()],
                )?;
                tracing::info!(total_work_minutes = total, "imported legacy user_state");
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {}
            Err(e) => return Err(e),
        }
    }

    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: store balances as integer ticks instead of `REAL` units.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(&format!(
        "ALTER TABLE balances RENAME TO balances_v2;

        CREATE TABLE balances (
            category TEXT PRIMARY KEY,
            ticks    INTEGER NOT NULL DEFAULT 0 CHECK (ticks >= 0)
        );

        INSERT INTO balances (category, ticks)
            SELECT category, MAX(0, CAST(ROUND(amount * {TICKS_PER_UNIT}) AS INTEGER))
            FROM balances_v2;

        DROP TABLE balances_v2;"
    ))?;

    set_schema_version(&tx, 3)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(conn: &Connection, category: &str) -> f64 {
        let ticks: i64 = conn
            .query_row(
                "SELECT ticks FROM balances WHERE category = ?1",
                [category],
                |row| row.get(0),
            )
            .unwrap();
        ticks as f64 / TICKS_PER_UNIT as f64
    }

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM balances", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 4);
        assert_eq!(balance(&conn, "movie"), 0.0);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn negative_balance_violates_check() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let result = conn.execute(
            "UPDATE balances SET ticks = -1 WHERE category = 'movie'",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_v2_amounts_become_ticks() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        migrate_v2(&conn).unwrap();
        conn.execute(
            "UPDATE balances SET amount = ?1 WHERE category = 'movie'",
            [9.999_999_999_998],
        )
        .unwrap();

        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), 3);
        assert_eq!(balance(&conn, "movie"), 10.0);
        assert_eq!(balance(&conn, "snack_money"), 0.0);
    }

    #[test]
    fn test_legacy_import() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE user_state (
                id INTEGER PRIMARY KEY,
                total_work_minutes INTEGER,
                used_movie INTEGER,
                used_youtube INTEGER,
                used_instagram INTEGER,
                used_snack_money FLOAT
            );
            INSERT INTO user_state VALUES (1, 150, 5, 0, 2, 0.5);",
        )
        .unwrap();

        migrate(&conn).unwrap();

        // 150 minutes = 2 whole legacy units.
        assert_eq!(balance(&conn, "movie"), 15.0);
        assert_eq!(balance(&conn, "video_streaming"), 10.0);
        assert_eq!(balance(&conn, "social_media"), 0.0);
        assert_eq!(balance(&conn, "snack_money"), 1.5);
    }
}
