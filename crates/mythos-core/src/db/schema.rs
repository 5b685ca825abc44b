//! Canonical SQLite schema for the entity search backend.
//!
//! - `entities` keeps the hydrated record for each world-bible entity
//! - `entities_fts` is the FTS5 index over name/summary/aliases, kept in
//!   sync by INSERT/UPDATE/DELETE triggers
//! - `entity_embeddings` stores one vector per (entity, collection) pair,
//!   where the collection key names a per-world, per-kind namespace

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Entity tables, FTS5 index, and sync triggers.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    entity_id INTEGER PRIMARY KEY,
    world_id INTEGER NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('faction', 'region', 'character')),
    name TEXT NOT NULL,
    summary TEXT,
    aliases TEXT NOT NULL DEFAULT '',
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1))
);

CREATE INDEX IF NOT EXISTS idx_entities_world_kind
    ON entities(world_id, kind);

CREATE VIRTUAL TABLE IF NOT EXISTS entities_fts USING fts5(
    name,
    summary,
    aliases,
    entity_id UNINDEXED,
    tokenize='porter unicode61',
    prefix='2 3'
);

CREATE TRIGGER IF NOT EXISTS entities_ai
AFTER INSERT ON entities
BEGIN
    INSERT INTO entities_fts(rowid, name, summary, aliases, entity_id)
    VALUES (
        new.rowid,
        new.name,
        COALESCE(new.summary, ''),
        new.aliases,
        new.entity_id
    );
END;

CREATE TRIGGER IF NOT EXISTS entities_au
AFTER UPDATE ON entities
BEGIN
    DELETE FROM entities_fts WHERE rowid = old.rowid;

    INSERT INTO entities_fts(rowid, name, summary, aliases, entity_id)
    VALUES (
        new.rowid,
        new.name,
        COALESCE(new.summary, ''),
        new.aliases,
        new.entity_id
    );
END;

CREATE TRIGGER IF NOT EXISTS entities_ad
AFTER DELETE ON entities
BEGIN
    DELETE FROM entities_fts WHERE rowid = old.rowid;
END;

CREATE TABLE IF NOT EXISTS entity_embeddings (
    entity_id INTEGER NOT NULL,
    collection TEXT NOT NULL,
    embedding_json TEXT NOT NULL,
    PRIMARY KEY (entity_id, collection)
);

CREATE INDEX IF NOT EXISTS idx_entity_embeddings_collection
    ON entity_embeddings(collection);
"#;

/// Create all search tables, indexes, and triggers if absent. Idempotent.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
        .context("create entity search schema")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
