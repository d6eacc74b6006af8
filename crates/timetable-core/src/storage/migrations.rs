//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

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
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: kids, matters, timetables and their blocks.
///
/// A block row is keyed by (kid, day, id) so a half-applied cross-day move
/// stays representable and can be repaired by reconciliation.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    debug!("applying schema migration v1");
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kids (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS matters (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            color       TEXT,
            start_date  TEXT,
            end_date    TEXT
        );

        CREATE TABLE IF NOT EXISTS timetables (
            kid_id      TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS blocks (
            kid_id      TEXT NOT NULL,
            day         TEXT NOT NULL,
            id          TEXT NOT NULL,
            matter_id   TEXT NOT NULL,
            start_min   INTEGER NOT NULL,
            end_min     INTEGER NOT NULL,
            revision    INTEGER NOT NULL,
            PRIMARY KEY (kid_id, day, id)
        );

        CREATE INDEX IF NOT EXISTS idx_blocks_kid_day ON blocks(kid_id, day);",
    )?;
    set_schema_version(conn, 1)
}

/// v2: lookups by matter (matter deletion) and by block id (reconciliation).
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    debug!("applying schema migration v2");
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_blocks_matter ON blocks(matter_id);
        CREATE INDEX IF NOT EXISTS idx_blocks_kid_id ON blocks(kid_id, id);",
    )?;
    set_schema_version(conn, 2)
}
