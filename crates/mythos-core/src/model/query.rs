//! Free-text keyword queries.
//!
//! Term order is irrelevant to retrieval semantics but is preserved so the
//! reranker sees the query exactly as the caller phrased it.

use serde::{Deserialize, Serialize};

/// An ordered, deduplicated set of free-text search terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordQuery {
    terms: Vec<String>,
}

impl KeywordQuery {
    /// Build a query from raw terms.
    ///
    /// Empty/whitespace terms are discarded and duplicates are removed while
    /// preserving first-occurrence order.
    #[must_use]
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for term in terms {
            let term = term.into();
            let term = term.trim();
            if term.is_empty() || seen.iter().any(|t| t == term) {
                continue;
            }
            seen.push(term.to_string());
        }
        Self { terms: seen }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Space-joined query text, used for embedding and reranking.
    #[must_use]
    pub fn joined(&self) -> String {
        self.terms.join(" ")
    }

    /// FTS5 match expression: each term quoted and OR-ed.
    ///
    /// Quoting keeps terms containing FTS5 operators (`-`, `*`, `NEAR`)
    /// from being interpreted as syntax.
    #[must_use]
    pub fn match_expr(&self) -> String {
        self.terms
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
