//! Cross-encoder reranking with calibrated relevance scores.
//!
//! Fused candidates' join-text is sent to an external rerank service as
//! `(query, documents)`; the service answers with a relevance score and the
//! original document index, in no guaranteed order. Returned scores are
//! sigmoid-calibrated about the batch mean, exactly like the retrieval
//! sources.
//!
//! Reranking is a quality improvement, not a correctness requirement: any
//! error crossing this boundary is converted into fused-score ordering by
//! the engine, never propagated to the caller. This is the only stage of
//! the pipeline that tolerates partial failure.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::calibrate::calibrate_about_mean;
use crate::fusion::FusedCandidate;
use mythos_core::model::EntityRecord;

/// One reranked document: position in the submitted batch plus relevance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankHit {
    pub index: usize,
    pub relevance: f32,
}

/// Cross-encoder relevance scoring capability.
pub trait Reranker {
    fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankHit>>;
}

/// A terminal ranked candidate with its calibrated final score in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub entity: EntityRecord,
    pub final_score: f32,
}

/// Rerank fused candidates and calibrate the returned relevance scores.
///
/// # Errors
///
/// Returns an error when the service call fails or the response is
/// malformed (index out of range, duplicate, or missing documents). The
/// engine treats any error here as a signal to fall back to fused-score
/// ordering.
pub fn rerank_candidates(
    reranker: &dyn Reranker,
    query: &str,
    candidates: &[FusedCandidate],
    slope: f32,
) -> Result<Vec<RankedCandidate>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let documents: Vec<String> = candidates.iter().map(|c| c.entity.join_text()).collect();
    let hits = reranker.rerank(query, &documents)?;

    // Re-key relevance by submission order; the service may answer in any
    // order, but it must answer for every document exactly once.
    let mut relevance: Vec<Option<f32>> = vec![None; candidates.len()];
    for hit in hits {
        if hit.index >= candidates.len() {
            bail!(
                "rerank response index {} out of range for {} documents",
                hit.index,
                candidates.len()
            );
        }
        if relevance[hit.index].replace(hit.relevance).is_some() {
            bail!("rerank response repeats index {}", hit.index);
        }
    }

    let raw: Vec<f32> = relevance
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.ok_or_else(|| anyhow::anyhow!("rerank response missing document {idx}"))
        })
        .collect::<Result<_>>()?;

    let calibrated = calibrate_about_mean(&raw, slope);

    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .zip(calibrated)
        .map(|(candidate, final_score)| RankedCandidate {
            entity: candidate.entity.clone(),
            final_score,
        })
        .collect();
    sort_ranked(&mut ranked);
    Ok(ranked)
}

/// Rank by fused score directly, for when reranking is disabled or failed.
#[must_use]
pub fn fallback_ranked(candidates: &[FusedCandidate]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|c| RankedCandidate {
            entity: c.entity.clone(),
            final_score: c.fused_score,
        })
        .collect();
    sort_ranked(&mut ranked);
    ranked
}

fn sort_ranked(ranked: &mut [RankedCandidate]) {
    ranked.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity.id.cmp(&b.entity.id))
    });
}

#[cfg(feature = "rerank-http")]
pub use http::HttpReranker;

#[cfg(feature = "rerank-http")]
mod http {
    //! ureq-backed client for hosted rerank services speaking the
    //! `{index, relevance_score}` JSON convention.

    use anyhow::{Context, Result};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    use super::{Reranker, RerankHit};
    use mythos_core::config::RerankConfig;

    #[derive(Serialize)]
    struct RerankRequest<'a> {
        model: &'a str,
        query: &'a str,
        documents: &'a [String],
    }

    #[derive(Deserialize)]
    struct RerankResponse {
        results: Vec<RerankResult>,
    }

    #[derive(Deserialize)]
    struct RerankResult {
        index: usize,
        relevance_score: f32,
    }

    /// HTTP rerank client with a bounded timeout.
    pub struct HttpReranker {
        endpoint: String,
        model: String,
        agent: ureq::Agent,
    }

    impl HttpReranker {
        /// Build a client from config; errors when no endpoint is set.
        pub fn new(config: &RerankConfig) -> Result<Self> {
            let endpoint = config
                .endpoint
                .clone()
                .context("rerank endpoint not configured")?;
            let agent = ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build();
            Ok(Self {
                endpoint,
                model: config.model.clone(),
                agent,
            })
        }
    }

    impl Reranker for HttpReranker {
        fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankHit>> {
            let body = serde_json::to_string(&RerankRequest {
                model: &self.model,
                query,
                documents,
            })
            .context("serialize rerank request")?;

            let response = self
                .agent
                .post(&self.endpoint)
                .set("Content-Type", "application/json")
                .send_string(&body)
                .with_context(|| format!("rerank request to {} failed", self.endpoint))?;

            let parsed: RerankResponse = serde_json::from_reader(response.into_reader())
                .context("parse rerank response")?;

            Ok(parsed
                .results
                .into_iter()
                .map(|r| RerankHit {
                    index: r.index,
                    relevance: r.relevance_score,
                })
                .collect())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
