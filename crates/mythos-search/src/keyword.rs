//! Keyword retrieval seam.
//!
//! The engine talks to a [`KeywordSource`] trait object so that the
//! relational backend stays swappable; [`SqliteKeywordSource`] is the
//! default binding over the FTS5 index in `mythos-core`.

use anyhow::Result;
use rusqlite::Connection;

use mythos_core::db::fts::{self, KeywordHit};
use mythos_core::model::{EntityId, KeywordQuery, Scope};

/// Full-text retrieval plus entity hydration.
///
/// Implementations must return keyword matches with positive raw scores
/// first, then every hydratable `extra_id` with `raw_score = 0.0`. This is
/// the only stage that fetches full records, so failures are fatal for the
/// search call.
pub trait KeywordSource {
    fn search(
        &self,
        scope: &Scope,
        query: &KeywordQuery,
        extra_ids: &[EntityId],
        limit: u32,
    ) -> Result<Vec<KeywordHit>>;
}

/// FTS5/BM25 keyword source over a SQLite connection.
pub struct SqliteKeywordSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteKeywordSource<'a> {
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl KeywordSource for SqliteKeywordSource<'_> {
    fn search(
        &self,
        scope: &Scope,
        query: &KeywordQuery,
        extra_ids: &[EntityId],
        limit: u32,
    ) -> Result<Vec<KeywordHit>> {
        fts::search_keyword(self.conn, scope, query, extra_ids, limit)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
