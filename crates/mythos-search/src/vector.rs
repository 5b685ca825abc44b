//! Vector retrieval seam.
//!
//! Two capabilities enter here: an [`Embedder`] turning query text into a
//! vector (how embeddings are produced is not this engine's business), and
//! a [`VectorSource`] answering nearest-neighbour queries for a scope's
//! collection. [`SqliteVectorSource`] binds the latter to the sqlite-vec
//! index in `mythos-core`.

use anyhow::Result;
use rusqlite::Connection;

use mythos_core::db::vec::{self, VectorHit};
use mythos_core::model::Scope;

/// Text-to-vector embedding capability.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Nearest-neighbour search over a scope's embedding collection.
///
/// Returns up to `top_n` hits ordered by ascending distance. Failures are
/// fatal for the search call: without candidate ids there is nothing to
/// rank.
pub trait VectorSource {
    fn search(&self, scope: &Scope, query_embedding: &[f32], top_n: usize)
    -> Result<Vec<VectorHit>>;
}

/// sqlite-vec (or Rust-fallback) vector source over a SQLite connection.
pub struct SqliteVectorSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteVectorSource<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl VectorSource for SqliteVectorSource<'_> {
    fn search(
        &self,
        scope: &Scope,
        query_embedding: &[f32],
        top_n: usize,
    ) -> Result<Vec<VectorHit>> {
        vec::knn_search(self.conn, &scope.collection_key(), query_embedding, top_n)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
