#![forbid(unsafe_code)]
//! mythos-search library.
//!
//! Hybrid entity retrieval: FTS5 keyword search and vector similarity run
//! against the same query, each source is sigmoid-calibrated about its own
//! batch mean, an adaptive blend fuses the two signals, and an optional
//! cross-encoder rerank pass refines the final ordering.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod calibrate;
pub mod engine;
pub mod fusion;
pub mod keyword;
pub mod rerank;
pub mod vector;

pub use engine::SearchEngine;
pub use fusion::{BlendWeights, FusedCandidate, OverlapStats};
pub use keyword::{KeywordSource, SqliteKeywordSource};
pub use rerank::{RankedCandidate, RerankHit, Reranker};
pub use vector::{Embedder, SqliteVectorSource, VectorSource};
