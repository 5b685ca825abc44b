//! The hybrid search pipeline.
//!
//! Stage order is fixed: embed the query, fetch vector neighbours, run
//! keyword search with the vector-discovered ids as hydration extras,
//! calibrate both score sets, fuse adaptively, rerank (or fall back), and
//! finally apply the score threshold. Retrieval failures are fatal; only
//! the rerank stage degrades gracefully.

use anyhow::{Context, Result};
use std::collections::{HashMap, hash_map::Entry};
use tracing::{debug, warn};

use mythos_core::config::SearchConfig;
use mythos_core::db::fts::KeywordHit;
use mythos_core::error::ErrorCode;
use mythos_core::model::{EntityId, KeywordQuery, Scope};

use crate::calibrate::{calibrate_about_mean, calibrate_keyword, distance_to_similarity};
use crate::fusion::{self, CandidateScores};
use crate::keyword::KeywordSource;
use crate::rerank::{self, RankedCandidate, Reranker};
use crate::vector::{Embedder, VectorSource};

/// Hybrid retrieval engine over pluggable keyword, vector, and rerank
/// sources.
pub struct SearchEngine<'a> {
    keyword: &'a dyn KeywordSource,
    vectors: &'a dyn VectorSource,
    embedder: &'a dyn Embedder,
    reranker: Option<&'a dyn Reranker>,
    config: SearchConfig,
}

impl<'a> SearchEngine<'a> {
    #[must_use]
    pub const fn new(
        keyword: &'a dyn KeywordSource,
        vectors: &'a dyn VectorSource,
        embedder: &'a dyn Embedder,
        config: SearchConfig,
    ) -> Self {
        Self {
            keyword,
            vectors,
            embedder,
            reranker: None,
            config,
        }
    }

    /// Attach a reranker. Its failures never fail the search.
    #[must_use]
    pub const fn with_reranker(mut self, reranker: &'a dyn Reranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Run the full pipeline with the configured score threshold.
    ///
    /// # Errors
    ///
    /// Returns an error when embedding, vector retrieval, or keyword
    /// retrieval fails. Rerank failures degrade to fused ordering instead.
    pub fn search(&self, scope: &Scope, query: &KeywordQuery) -> Result<Vec<RankedCandidate>> {
        self.search_with_threshold(scope, query, self.config.score_threshold)
    }

    /// Run the full pipeline with an explicit score threshold (inclusive).
    pub fn search_with_threshold(
        &self,
        scope: &Scope,
        query: &KeywordQuery,
        threshold: f32,
    ) -> Result<Vec<RankedCandidate>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let query_text = query.joined();

        let embedding = self
            .embedder
            .embed(&query_text)
            .context("failed to embed query")?;

        let vector_hits = self
            .vectors
            .search(scope, &embedding, self.config.vector_top_n)
            .context("vector search failed")?;

        // Vector-discovered ids get hydrated through the keyword stage so
        // both sources contribute to one candidate union.
        let extra_ids: Vec<EntityId> = vector_hits
            .iter()
            .filter_map(|hit| {
                let parsed = EntityId::parse_str(&hit.entity_id);
                if parsed.is_none() {
                    debug!(id = %hit.entity_id, "skipping unparseable vector index id");
                }
                parsed
            })
            .collect();

        let keyword_hits = self
            .keyword
            .search(scope, query, &extra_ids, self.config.keyword_limit)
            .context("keyword search failed")?;

        if keyword_hits.is_empty() {
            debug!(scope = %scope.collection_key(), "no candidates for query");
            return Ok(Vec::new());
        }

        // One candidate per entity. A trigger-bypassed FTS index can hold
        // duplicate rows for an id; this runs before calibration so a
        // repeated raw score cannot skew the batch mean.
        let keyword_hits = dedup_by_entity(keyword_hits);

        let keyword_raw: Vec<f32> = keyword_hits.iter().map(|h| h.raw_score).collect();
        let keyword_calibrated = calibrate_keyword(&keyword_raw, self.config.keyword_slope);

        // Vector scores are calibrated over the vector batch itself, not
        // the candidate union, so hydration fills cannot shift its mean.
        let similarities: Vec<f32> = vector_hits
            .iter()
            .map(|hit| distance_to_similarity(hit.distance))
            .collect();
        let vector_calibrated =
            calibrate_about_mean(&similarities, self.config.vector_slope_for(scope.kind));
        let vector_scores: HashMap<&str, f32> = vector_hits
            .iter()
            .zip(&vector_calibrated)
            .map(|(hit, &score)| (hit.entity_id.as_str(), score))
            .collect();

        let candidates: Vec<CandidateScores> = keyword_hits
            .into_iter()
            .zip(keyword_calibrated)
            .map(|(hit, keyword_score)| {
                let key = hit.entity.id.0.to_string();
                let vector_score = vector_scores.get(key.as_str()).copied();
                CandidateScores {
                    entity: hit.entity,
                    keyword_score,
                    vector_score: vector_score.unwrap_or(0.0),
                    vector_present: vector_score.is_some(),
                }
            })
            .collect();

        let stats = fusion::overlap_stats(&candidates);
        let weights = fusion::blend_weights(
            self.config.base_weights_for(scope.kind),
            &stats,
            self.config.weight_cap,
        );
        debug!(
            total = stats.total,
            overlap = stats.overlap,
            ratio = stats.ratio,
            vector_weight = weights.vector,
            keyword_weight = weights.keyword,
            "fusing candidate scores"
        );

        let fused = fusion::fuse(candidates, weights);

        let mut ranked = match self.reranker {
            Some(reranker) => {
                match rerank::rerank_candidates(
                    reranker,
                    &query_text,
                    &fused,
                    self.config.rerank_slope,
                ) {
                    Ok(ranked) => ranked,
                    Err(err) => {
                        warn!(
                            code = %ErrorCode::RerankServiceUnavailable,
                            "reranker unavailable, falling back to fused ordering: {err:#}"
                        );
                        rerank::fallback_ranked(&fused)
                    }
                }
            }
            None => rerank::fallback_ranked(&fused),
        };

        ranked.retain(|c| c.final_score >= threshold);
        Ok(ranked)
    }
}

/// Collapse keyword hits to one per entity id, keeping the best raw score.
fn dedup_by_entity(hits: Vec<KeywordHit>) -> Vec<KeywordHit> {
    let mut index: HashMap<EntityId, usize> = HashMap::with_capacity(hits.len());
    let mut unique: Vec<KeywordHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        match index.entry(hit.entity.id) {
            Entry::Occupied(entry) => {
                let kept = &mut unique[*entry.get()];
                if hit.raw_score > kept.raw_score {
                    *kept = hit;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(unique.len());
                unique.push(hit);
            }
        }
    }
    unique
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
