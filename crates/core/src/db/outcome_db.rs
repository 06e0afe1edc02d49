use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::db::OutcomeRecord;
use crate::model::Outcome;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Error type for outcome ledger operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },

    /// A stored outcome token is not one we recognize.
    #[error("Unknown outcome '{0}' in ledger")]
    UnknownOutcome(String),
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed ledger of execution outcomes.
///
/// A thin wrapper around `rusqlite::Connection` that opens/creates the file,
/// applies migrations and exposes small query helpers.
#[derive(Debug)]
pub struct OutcomeDb {
    conn: Connection,
}

impl OutcomeDb {
    /// Open (or create) a ledger at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory ledger, mostly for tests.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Record an outcome. Returns `false` if one was already recorded for the
    /// same source and renderer; the existing row is left untouched.
    pub fn record(&self, record: &OutcomeRecord) -> DbResult<bool> {
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO outcomes (source_hash, renderer, outcome, elapsed_ms, detail, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.source_hash,
                record.renderer,
                record.outcome.as_str(),
                record.elapsed_ms as i64,
                record.detail,
                record.recorded_at,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Look up the recorded outcome for a source/renderer pair.
    pub fn lookup(&self, source_hash: &str, renderer: &str) -> DbResult<Option<OutcomeRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT source_hash, renderer, outcome, elapsed_ms, detail, recorded_at
                FROM outcomes
                WHERE source_hash = ?1 AND renderer = ?2
                "#,
                params![source_hash, renderer],
                map_row,
            )
            .optional()?;
        row.map(into_record).transpose()
    }

    /// List recorded outcomes (ordered by insertion), optionally filtered by outcome.
    pub fn list(&self, outcome: Option<Outcome>) -> DbResult<Vec<OutcomeRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT source_hash, renderer, outcome, elapsed_ms, detail, recorded_at
            FROM outcomes
            WHERE ?1 IS NULL OR outcome = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![outcome.map(|o| o.as_str())], map_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(into_record(row?)?);
        }
        Ok(out)
    }

    /// Number of recorded rows per outcome token.
    pub fn counts(&self) -> DbResult<BTreeMap<String, u64>> {
        let mut stmt =
            self.conn.prepare("SELECT outcome, COUNT(*) FROM outcomes GROUP BY outcome")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (outcome, count) = row?;
            out.insert(outcome, count.max(0) as u64);
        }
        Ok(out)
    }
}

type RawRow = (String, String, String, i64, Option<String>, String);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn into_record(
    (source_hash, renderer, outcome, elapsed_ms, detail, recorded_at): RawRow,
) -> DbResult<OutcomeRecord> {
    let outcome = Outcome::from_str(&outcome).map_err(|_| DbError::UnknownOutcome(outcome))?;
    Ok(OutcomeRecord {
        source_hash,
        renderer,
        outcome,
        elapsed_ms: elapsed_ms.max(0) as u64,
        detail,
        recorded_at,
    })
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: outcomes table
/// - 2: index on outcome for filtered listings
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS outcomes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                source_hash TEXT NOT NULL,
                renderer    TEXT NOT NULL,
                outcome     TEXT NOT NULL,
                elapsed_ms  INTEGER NOT NULL,
                detail      TEXT,
                recorded_at TEXT NOT NULL,
                UNIQUE (source_hash, renderer)
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE INDEX IF NOT EXISTS idx_outcomes_outcome ON outcomes (outcome);
            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
