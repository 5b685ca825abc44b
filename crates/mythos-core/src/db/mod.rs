//! SQLite binding of the consumed retrieval capabilities.
//!
//! The engine itself only sees the adapter traits in `mythos-search`; this
//! module is the default relational/vector backend behind them. Open
//! connections through [`open`] (or [`open_in_memory`] in tests) so the
//! sqlite-vec extension is registered before the first connection exists;
//! when the extension is unavailable, KNN transparently uses the Rust
//! cosine fallback.

pub mod fts;
pub mod schema;
pub mod vec;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};
use tracing::debug;

/// Busy timeout for file-backed connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the search database, apply runtime pragmas, and ensure
/// the schema is in place.
///
/// # Errors
///
/// Returns an error if opening or configuring the database fails.
pub fn open(path: &Path) -> Result<Connection> {
    register_vector_extension();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create database directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("open search database {}", path.display()))?;
    configure_connection(&conn).context("configure sqlite pragmas")?;
    schema::ensure_schema(&conn)?;
    Ok(conn)
}

/// In-memory variant of [`open`], for tests and scratch indexes.
///
/// # Errors
///
/// Returns an error if the schema cannot be created.
pub fn open_in_memory() -> Result<Connection> {
    register_vector_extension();

    let conn = Connection::open_in_memory().context("open in-memory search database")?;
    schema::ensure_schema(&conn)?;
    Ok(conn)
}

fn register_vector_extension() {
    if let Err(reason) = vec::register_auto_extension() {
        debug!("sqlite-vec not registered, vector search uses the Rust fallback: {reason}");
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
