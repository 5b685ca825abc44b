//! Vector KNN search over stored entity embeddings.
//!
//! Embeddings live in `entity_embeddings`, one row per (entity, collection)
//! pair. Queries run through the sqlite-vec extension when available and
//! fall back to Rust-side cosine distance over `embedding_json` otherwise.
//! Distances are cosine distances: 0 is identical, larger is farther.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::IndexError;

const AUTO_ENABLE_ENV: &str = "MYTHOS_SQLITE_VEC_AUTO";

static REGISTRATION: OnceLock<Result<(), String>> = OnceLock::new();

/// Register sqlite-vec as an auto-loaded extension for new connections.
///
/// Safe to call repeatedly; registration happens once per process. Set
/// `MYTHOS_SQLITE_VEC_AUTO=0` to force the Rust cosine fallback.
pub fn register_auto_extension() -> Result<(), String> {
    if matches!(
        std::env::var(AUTO_ENABLE_ENV).ok().as_deref(),
        Some("0" | "false" | "off")
    ) {
        return Err(format!(
            "sqlite-vec auto-extension disabled by {AUTO_ENABLE_ENV}"
        ));
    }

    REGISTRATION.get_or_init(register_once).clone()
}

fn register_once() -> Result<(), String> {
    #[allow(clippy::transmute_ptr_to_ptr)]
    let entrypoint: unsafe extern "C" fn(
        *mut rusqlite::ffi::sqlite3,
        *mut *const std::os::raw::c_char,
        *const rusqlite::ffi::sqlite3_api_routines,
    ) -> std::os::raw::c_int =
        unsafe { std::mem::transmute(sqlite_vec::sqlite3_vec_init as *const ()) };

    let rc = unsafe { rusqlite::ffi::sqlite3_auto_extension(Some(entrypoint)) };
    if rc == rusqlite::ffi::SQLITE_OK {
        Ok(())
    } else {
        Err(format!("sqlite3_auto_extension failed with rc={rc}"))
    }
}

/// A single vector-search match.
///
/// `entity_id` is the string form used by vector index payloads; the
/// engine parses it back into a relational id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorHit {
    pub entity_id: String,
    pub distance: f32,
}

/// Top-N nearest entities in a collection by cosine distance, ascending.
///
/// # Errors
///
/// Returns an error when the embeddings table is missing or unreadable.
/// Without candidate ids there is nothing to rank, so callers treat this
/// as fatal for the search.
pub fn knn_search(
    conn: &Connection,
    collection: &str,
    query_embedding: &[f32],
    top_n: usize,
) -> Result<Vec<VectorHit>> {
    if top_n == 0 || query_embedding.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(hits) = try_knn_sqlite_vec(conn, collection, query_embedding, top_n)? {
        return Ok(hits);
    }

    let mut stmt = conn
        .prepare(
            "SELECT entity_id, embedding_json FROM entity_embeddings WHERE collection = ?1",
        )
        .map_err(IndexError::VectorMissing)
        .context("prepare vector KNN query (embeddings table missing?)")?;

    let rows = stmt
        .query_map([collection], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .context("execute vector KNN query")?;

    let mut hits = Vec::new();
    for row in rows {
        let (entity_id, embedding_json) = row.context("read vector KNN row")?;
        let embedding: Vec<f32> = match serde_json::from_str(&embedding_json) {
            Ok(value) => value,
            Err(err) => {
                debug!("skipping malformed embedding row for {entity_id}: {err}");
                continue;
            }
        };

        if embedding.len() != query_embedding.len() {
            debug!(
                "skipping embedding row for {entity_id} with dimension {}",
                embedding.len()
            );
            continue;
        }

        let Some(cosine) = cosine_similarity(query_embedding, &embedding) else {
            continue;
        };
        hits.push(VectorHit {
            entity_id: entity_id.to_string(),
            distance: (1.0 - cosine).max(0.0),
        });
    }

    sort_by_distance(&mut hits);
    hits.truncate(top_n);
    Ok(hits)
}

fn try_knn_sqlite_vec(
    conn: &Connection,
    collection: &str,
    query_embedding: &[f32],
    top_n: usize,
) -> Result<Option<Vec<VectorHit>>> {
    let vec_available = conn
        .query_row("SELECT vec_version()", [], |row| row.get::<_, String>(0))
        .is_ok();
    if !vec_available {
        return Ok(None);
    }

    let query_json = encode_embedding_json(query_embedding);
    let mut stmt = match conn.prepare(
        "SELECT entity_id,
                vec_distance_cosine(vec_f32(embedding_json), vec_f32(?1)) AS distance
         FROM entity_embeddings
         WHERE collection = ?2
         ORDER BY distance ASC
         LIMIT ?3",
    ) {
        Ok(stmt) => stmt,
        Err(err) => {
            debug!("sqlite-vec KNN unavailable, falling back to Rust KNN: {err}");
            return Ok(None);
        }
    };

    let rows = match stmt.query_map(
        rusqlite::params![query_json, collection, top_n as i64],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
    ) {
        Ok(rows) => rows,
        Err(err) => {
            debug!("sqlite-vec KNN query failed, falling back to Rust KNN: {err}");
            return Ok(None);
        }
    };

    // A malformed embedding row errors mid-iteration here; the Rust
    // fallback can skip such rows individually, so degrade to it.
    let mut hits = Vec::new();
    for row in rows {
        match row {
            Ok((entity_id, distance)) => hits.push(VectorHit {
                entity_id: entity_id.to_string(),
                distance: (distance as f32).max(0.0),
            }),
            Err(err) => {
                debug!("sqlite-vec KNN row failed, falling back to Rust KNN: {err}");
                return Ok(None);
            }
        }
    }

    sort_by_distance(&mut hits);
    Ok(Some(hits))
}

fn sort_by_distance(hits: &mut [VectorHit]) {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
}

fn encode_embedding_json(embedding: &[f32]) -> String {
    let mut encoded = String::from("[");
    for (idx, value) in embedding.iter().enumerate() {
        if idx != 0 {
            encoded.push(',');
        }
        encoded.push_str(&value.to_string());
    }
    encoded.push(']');
    encoded
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> Option<f32> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }

    let mut dot = 0.0_f32;
    let mut left_norm_sq = 0.0_f32;
    let mut right_norm_sq = 0.0_f32;

    for (a, b) in left.iter().zip(right.iter()) {
        dot += a * b;
        left_norm_sq += a * a;
        right_norm_sq += b * b;
    }

    let denom = left_norm_sq.sqrt() * right_norm_sq.sqrt();
    if denom <= f32::EPSILON {
        return None;
    }

    Some((dot / denom).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
