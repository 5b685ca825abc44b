//! Shared stub sources for engine-level tests.
#![allow(dead_code)]

use anyhow::Result;

use mythos_core::db::fts::KeywordHit;
use mythos_core::db::vec::VectorHit;
use mythos_core::model::{EntityId, EntityKind, EntityRecord, KeywordQuery, Scope, WorldId};
use mythos_search::rerank::RerankHit;
use mythos_search::{Embedder, KeywordSource, Reranker, VectorSource};

pub fn record(id: i64, kind: EntityKind, name: &str, summary: &str) -> EntityRecord {
    EntityRecord {
        id: EntityId(id),
        world: WorldId(1),
        kind,
        name: name.to_string(),
        summary: Some(summary.to_string()),
    }
}

pub fn keyword_hit(entity: EntityRecord, raw_score: f32) -> KeywordHit {
    KeywordHit {
        entity,
        raw_score,
        match_percent: 0.0,
    }
}

pub fn vector_hit(id: i64, distance: f32) -> VectorHit {
    VectorHit {
        entity_id: id.to_string(),
        distance,
    }
}

/// Embedder returning a fixed unit vector; the stubs below ignore it.
pub struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}

/// Embedder that always fails, for exercising the fatal path.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("embedding backend offline")
    }
}

/// Keyword source returning a fixed hit list, hydration included.
pub struct StaticKeyword(pub Vec<KeywordHit>);

impl KeywordSource for StaticKeyword {
    fn search(
        &self,
        _scope: &Scope,
        _query: &KeywordQuery,
        _extra_ids: &[EntityId],
        _limit: u32,
    ) -> Result<Vec<KeywordHit>> {
        Ok(self.0.clone())
    }
}

/// Keyword source that always fails.
pub struct FailingKeyword;

impl KeywordSource for FailingKeyword {
    fn search(
        &self,
        _scope: &Scope,
        _query: &KeywordQuery,
        _extra_ids: &[EntityId],
        _limit: u32,
    ) -> Result<Vec<KeywordHit>> {
        anyhow::bail!("keyword index unavailable")
    }
}

/// Vector source returning a fixed hit list.
pub struct StaticVectors(pub Vec<VectorHit>);

impl VectorSource for StaticVectors {
    fn search(
        &self,
        _scope: &Scope,
        _query_embedding: &[f32],
        _top_n: usize,
    ) -> Result<Vec<VectorHit>> {
        Ok(self.0.clone())
    }
}

/// Vector source that always fails.
pub struct FailingVectors;

impl VectorSource for FailingVectors {
    fn search(
        &self,
        _scope: &Scope,
        _query_embedding: &[f32],
        _top_n: usize,
    ) -> Result<Vec<VectorHit>> {
        anyhow::bail!("vector index unavailable")
    }
}

/// Reranker answering with a fixed response.
pub struct ScriptedReranker(pub Vec<RerankHit>);

impl Reranker for ScriptedReranker {
    fn rerank(&self, _query: &str, _documents: &[String]) -> Result<Vec<RerankHit>> {
        Ok(self.0.clone())
    }
}

/// Reranker that always fails.
pub struct FailingReranker;

impl Reranker for FailingReranker {
    fn rerank(&self, _query: &str, _documents: &[String]) -> Result<Vec<RerankHit>> {
        anyhow::bail!("rerank service unreachable")
    }
}
