//! Score calibration: distance-to-similarity mapping and mean-centered
//! sigmoid normalization.
//!
//! Raw scores from the two retrieval sources live on incompatible scales
//! that also shift per query (BM25 depends on corpus statistics, cosine
//! distance on the embedding space). Rather than assuming a universal
//! scale, each batch is calibrated against its own observed mean: the
//! sigmoid midpoint is the batch mean, so a score at the mean maps to 0.5
//! and the slope controls how sharply scores separate around it.

/// Map a non-negative dissimilarity to a similarity in `(0, 1]`.
///
/// `1 / (1 + d)`: identical inputs (distance 0) map to 1, and similarity
/// tends to 0 as distance grows.
#[must_use]
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Standard logistic function centered at `midpoint` with steepness `slope`.
#[must_use]
pub fn sigmoid(x: f32, slope: f32, midpoint: f32) -> f32 {
    1.0 / (1.0 + (-slope * (x - midpoint)).exp())
}

/// Calibrate a batch about its own mean.
///
/// Used for vector similarities and rerank relevance scores, where every
/// entry was genuinely scored by the source.
#[must_use]
pub fn calibrate_about_mean(scores: &[f32], slope: f32) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    scores.iter().map(|&s| sigmoid(s, slope, mean)).collect()
}

/// Calibrate keyword raw scores.
///
/// The batch mean is taken over non-zero entries only: zero rows are
/// hydration fills for vector-discovered entities, and letting them drag
/// the midpoint down would inflate every genuine match. Zero stays exactly
/// zero so fusion can tell "absent from this source" from "weak match".
#[must_use]
pub fn calibrate_keyword(scores: &[f32], slope: f32) -> Vec<f32> {
    let scored: Vec<f32> = scores.iter().copied().filter(|&s| s != 0.0).collect();
    if scored.is_empty() {
        return vec![0.0; scores.len()];
    }
    let mean = scored.iter().sum::<f32>() / scored.len() as f32;

    scores
        .iter()
        .map(|&s| if s == 0.0 { 0.0 } else { sigmoid(s, slope, mean) })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
