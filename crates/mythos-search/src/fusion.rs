//! Adaptive fusion of calibrated keyword and vector scores.
//!
//! This module decides, per query, how much to trust each retrieval source
//! and merges the two calibrated score sets into one fused score per
//! entity.
//!
//! # Algorithm Overview
//!
//! Over the candidate union (the keyword-hydrated set, a superset by
//! construction):
//!
//! ```text
//! keyword_zero = candidates with calibrated keyword score == 0
//! vector_zero  = candidates absent from the vector result set
//! overlap      = total - keyword_zero - vector_zero
//! ratio        = overlap / min(total - keyword_zero, total - vector_zero)
//! ```
//!
//! The kind's nominally dominant source starts from its base weight and is
//! boosted by its own overlap-scaled amount, capped:
//!
//! ```text
//! w_dominant = min(base + base * ratio, cap)
//! w_other    = 1 - w_dominant
//! fused      = vector * w_vector + keyword * w_keyword
//! ```
//!
//! When the two sources agree on most of the candidate set, that agreement
//! is evidence both signals are reliable for this query, so the engine
//! leans further into the dominant one. When they diverge, weight stays
//! near the base split. If the keyword signal is entirely absent its
//! weight is forced to exactly 0 rather than letting zero-fills contribute
//! noise.

use serde::Serialize;

use mythos_core::model::EntityRecord;

/// Per-query blend weights. Always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlendWeights {
    pub vector: f32,
    pub keyword: f32,
}

/// Agreement statistics between the two candidate sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapStats {
    /// Size of the candidate union.
    pub total: usize,
    /// Candidates found only via the vector source.
    pub keyword_zero: usize,
    /// Candidates found only via the keyword source.
    pub vector_zero: usize,
    /// Candidates found by both sources.
    pub overlap: usize,
    /// Agreement relative to the smaller non-empty subset; 0 when either
    /// denominator is 0.
    pub ratio: f32,
}

/// One candidate's calibrated per-source scores, pre-fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScores {
    pub entity: EntityRecord,
    /// Calibrated keyword score; exactly 0 when absent from that source.
    pub keyword_score: f32,
    /// Calibrated vector score; exactly 0 when absent from that source.
    pub vector_score: f32,
    /// Whether the vector source returned this entity at all.
    pub vector_present: bool,
}

/// A fused candidate with full scoring breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedCandidate {
    pub entity: EntityRecord,
    pub keyword_score: f32,
    pub vector_score: f32,
    /// Convex combination of the two calibrated scores, in [0, 1].
    pub fused_score: f32,
    pub weights: BlendWeights,
}

/// Compute agreement statistics over the candidate union.
#[must_use]
pub fn overlap_stats(candidates: &[CandidateScores]) -> OverlapStats {
    let total = candidates.len();
    let keyword_zero = candidates
        .iter()
        .filter(|c| c.keyword_score == 0.0)
        .count();
    let vector_zero = total
        - candidates
            .iter()
            .filter(|c| c.vector_present)
            .count();
    let overlap = total.saturating_sub(keyword_zero + vector_zero);

    let keyword_found = total - keyword_zero;
    let vector_found = total - vector_zero;
    let denom = keyword_found.min(vector_found);
    let ratio = if denom == 0 {
        0.0
    } else {
        overlap as f32 / denom as f32
    };

    OverlapStats {
        total,
        keyword_zero,
        vector_zero,
        overlap,
        ratio,
    }
}

/// Derive blend weights from base weights and agreement statistics.
///
/// `base` is the `(vector, keyword)` pair from config for the entity kind;
/// the larger of the two is the dominant source. `cap` bounds the boosted
/// dominant weight.
#[must_use]
pub fn blend_weights(base: (f32, f32), stats: &OverlapStats, cap: f32) -> BlendWeights {
    // A keyword signal that scored nothing contributes noise, not evidence.
    if stats.total > 0 && stats.keyword_zero == stats.total {
        return BlendWeights {
            vector: 1.0,
            keyword: 0.0,
        };
    }

    let (base_vector, base_keyword) = base;
    if base_vector >= base_keyword {
        let vector = base_vector.mul_add(stats.ratio, base_vector).min(cap);
        BlendWeights {
            vector,
            keyword: 1.0 - vector,
        }
    } else {
        let keyword = base_keyword.mul_add(stats.ratio, base_keyword).min(cap);
        BlendWeights {
            vector: 1.0 - keyword,
            keyword,
        }
    }
}

/// Fuse per-source scores into one score per candidate, sorted descending.
///
/// Ties break on entity id for deterministic output.
#[must_use]
pub fn fuse(candidates: Vec<CandidateScores>, weights: BlendWeights) -> Vec<FusedCandidate> {
    let mut fused: Vec<FusedCandidate> = candidates
        .into_iter()
        .map(|c| FusedCandidate {
            fused_score: c.vector_score * weights.vector + c.keyword_score * weights.keyword,
            entity: c.entity,
            keyword_score: c.keyword_score,
            vector_score: c.vector_score,
            weights,
        })
        .collect();

    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity.id.cmp(&b.entity.id))
    });

    fused
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
