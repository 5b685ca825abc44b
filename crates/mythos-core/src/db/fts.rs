//! FTS5 keyword search with BM25 ranking and entity hydration.
//!
//! This is the relational half of the retrieval pipeline. Besides scoring
//! keyword matches it is also the only place full entity records are
//! fetched, so the caller passes in the ids discovered by the vector pass
//! (`extra_ids`) and gets them back hydrated with a raw score of 0 —
//! present, but unscored by this source.
//!
//! # Column Weights (BM25)
//!
//! | Column  | Weight | Rationale                               |
//! |---------|--------|-----------------------------------------|
//! | name    | 3.0    | Most specific, short, high signal        |
//! | summary | 2.0    | Detailed context, moderate signal        |
//! | aliases | 1.0    | Alternate names, low cardinality         |
//!
//! # Tokenizer
//!
//! Porter stemmer + `unicode61` with prefix indexes on 2 and 3 characters,
//! so "dragons" matches "dragon" and "emb*" matches "ember".

use anyhow::{Context, Result};
use rusqlite::{Connection, params, params_from_iter};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::IndexError;
use crate::model::{EntityId, EntityRecord, KeywordQuery, Scope};

/// Default BM25 column weights: name=3, summary=2, aliases=1.
pub const BM25_WEIGHT_NAME: f64 = 3.0;
pub const BM25_WEIGHT_SUMMARY: f64 = 2.0;
pub const BM25_WEIGHT_ALIASES: f64 = 1.0;

/// A hydrated keyword-search hit.
///
/// `raw_score` is the negated BM25 rank (higher = better); exactly 0.0 for
/// entities hydrated only because the vector pass discovered them.
/// `match_percent` is `raw_score / max(raw_score)` within the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
    pub entity: EntityRecord,
    pub raw_score: f32,
    pub match_percent: f32,
}

/// Search the FTS5 index for a scope and hydrate the union with `extra_ids`.
///
/// Keyword matches come back first, ordered best-to-worst; unmatched extra
/// ids follow with `raw_score = 0.0`. Extra ids are never dropped unless no
/// row exists for them at all (nothing to hydrate), which is logged.
///
/// # Errors
///
/// Returns an error if the FTS5 query is malformed or the schema is not
/// initialized. This path hydrates every record the search can return, so
/// a failure here is fatal for the whole search call.
pub fn search_keyword(
    conn: &Connection,
    scope: &Scope,
    query: &KeywordQuery,
    extra_ids: &[EntityId],
    limit: u32,
) -> Result<Vec<KeywordHit>> {
    let mut hits = if query.is_empty() {
        Vec::new()
    } else {
        fts_matches(conn, scope, &query.match_expr(), limit)?
    };

    let max_raw = hits.iter().map(|h| h.raw_score).fold(0.0_f32, f32::max);
    if max_raw > 0.0 {
        for hit in &mut hits {
            hit.match_percent = hit.raw_score / max_raw;
        }
    }

    let matched: HashSet<EntityId> = hits.iter().map(|h| h.entity.id).collect();
    let missing: Vec<EntityId> = extra_ids
        .iter()
        .copied()
        .filter(|id| !matched.contains(id))
        .collect();

    if !missing.is_empty() {
        let mut by_id: HashMap<EntityId, EntityRecord> = fetch_by_ids(conn, scope, &missing)?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        for id in missing {
            match by_id.remove(&id) {
                Some(entity) => hits.push(KeywordHit {
                    entity,
                    raw_score: 0.0,
                    match_percent: 0.0,
                }),
                None => debug!("vector-discovered id {id} has no entity row, skipping"),
            }
        }
    }

    Ok(hits)
}

fn fts_matches(
    conn: &Connection,
    scope: &Scope,
    match_expr: &str,
    limit: u32,
) -> Result<Vec<KeywordHit>> {
    let sql = "SELECT e.entity_id, e.name, e.summary, \
                      -bm25(entities_fts, ?1, ?2, ?3) AS score \
               FROM entities_fts f \
               INNER JOIN entities e ON e.entity_id = f.entity_id \
               WHERE entities_fts MATCH ?4 AND e.is_deleted = 0 \
                 AND e.world_id = ?5 AND e.kind = ?6 \
               ORDER BY score DESC \
               LIMIT ?7";

    let mut stmt = conn
        .prepare(sql)
        .map_err(IndexError::FtsMissing)
        .context("prepare FTS5 BM25 search query (search schema missing?)")?;

    let rows = stmt
        .query_map(
            params![
                BM25_WEIGHT_NAME,
                BM25_WEIGHT_SUMMARY,
                BM25_WEIGHT_ALIASES,
                match_expr,
                scope.world.0,
                scope.kind.as_str(),
                limit,
            ],
            |row| {
                Ok(KeywordHit {
                    entity: EntityRecord {
                        id: EntityId(row.get(0)?),
                        world: scope.world,
                        kind: scope.kind,
                        name: row.get(1)?,
                        summary: row.get(2)?,
                    },
                    raw_score: row.get::<_, f64>(3)? as f32,
                    match_percent: 0.0,
                })
            },
        )
        .with_context(|| format!("execute FTS5 search for '{match_expr}'"))?;

    let mut hits = Vec::new();
    for row in rows {
        hits.push(row.context("read FTS5 search hit")?);
    }
    Ok(hits)
}

/// Fetch full entity records by id within a scope.
///
/// Soft-deleted rows and rows outside the scope are excluded; ids with no
/// surviving row are simply absent from the result.
pub fn fetch_by_ids(
    conn: &Connection,
    scope: &Scope,
    ids: &[EntityId],
) -> Result<Vec<EntityRecord>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT entity_id, name, summary FROM entities \
         WHERE is_deleted = 0 AND world_id = ? AND kind = ? \
           AND entity_id IN ({placeholders})"
    );

    let bindings = std::iter::once(rusqlite::types::Value::Integer(scope.world.0))
        .chain(std::iter::once(rusqlite::types::Value::Text(
            scope.kind.as_str().to_string(),
        )))
        .chain(ids.iter().map(|id| rusqlite::types::Value::Integer(id.0)));

    let mut stmt = conn.prepare(&sql).context("prepare entity hydration query")?;
    let rows = stmt
        .query_map(params_from_iter(bindings), |row| {
            Ok(EntityRecord {
                id: EntityId(row.get(0)?),
                world: scope.world,
                kind: scope.kind,
                name: row.get(1)?,
                summary: row.get(2)?,
            })
        })
        .context("execute entity hydration query")?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.context("read entity row")?);
    }
    Ok(records)
}

/// Rebuild the FTS5 index from the current `entities` table.
///
/// # Errors
///
/// Returns an error if the rebuild SQL fails.
pub fn rebuild_fts_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM entities_fts;
         INSERT INTO entities_fts(rowid, name, summary, aliases, entity_id)
         SELECT rowid, name, COALESCE(summary, ''), aliases, entity_id
         FROM entities;",
    )
    .context("rebuild FTS5 index from entities table")?;
    Ok(())
}

/// Return the number of rows in the FTS5 index.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn fts_row_count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM entities_fts", [], |row| row.get(0))
        .context("count FTS5 rows")?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Check whether the FTS5 index row count matches the `entities` table.
///
/// A mismatch means the triggers were bypassed (bulk import, manual
/// surgery) and [`rebuild_fts_index`] should run.
///
/// # Errors
///
/// Returns an error if either count query fails.
pub fn fts_in_sync(conn: &Connection) -> Result<bool> {
    let entity_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))
        .context("count entity rows")?;
    Ok(fts_row_count(conn)? == u64::try_from(entity_count).unwrap_or(0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
