//! Project configuration, loaded from `.mythos/config.toml`.
//!
//! Every calibration and fusion constant lives here rather than in code:
//! the slopes and base weights were tuned empirically against one specific
//! embedding model and relational scoring backend, and a different backend
//! will want different values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::EntityKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
}

/// Retrieval, calibration, and fusion tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of nearest neighbours requested from the vector index.
    #[serde(default = "default_vector_top_n")]
    pub vector_top_n: usize,

    /// Maximum keyword matches fetched from the full-text index.
    ///
    /// Hydration of vector-discovered ids is not subject to this limit.
    #[serde(default = "default_keyword_limit")]
    pub keyword_limit: u32,

    /// Minimum final score a candidate must reach (inclusive).
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Sigmoid steepness for keyword score calibration.
    #[serde(default = "default_keyword_slope")]
    pub keyword_slope: f32,

    /// Sigmoid steepness for vector score calibration (faction/character).
    #[serde(default = "default_vector_slope")]
    pub vector_slope: f32,

    /// Sigmoid steepness for vector score calibration of regions.
    ///
    /// Region vector scores cluster more tightly than the other kinds and
    /// need a much steeper curve to separate.
    #[serde(default = "default_region_vector_slope")]
    pub region_vector_slope: f32,

    /// Sigmoid steepness for rerank relevance calibration.
    #[serde(default = "default_rerank_slope")]
    pub rerank_slope: f32,

    /// Base blend weight of the vector signal for faction/region searches.
    #[serde(default = "default_vector_base_weight")]
    pub vector_base_weight: f32,

    /// Base blend weight of the keyword signal for character searches.
    ///
    /// Character names are reliable literal strings, so keyword matching is
    /// the nominally dominant signal for that kind.
    #[serde(default = "default_character_keyword_base_weight")]
    pub character_keyword_base_weight: f32,

    /// Upper bound on the dominant source's boosted blend weight.
    #[serde(default = "default_weight_cap")]
    pub weight_cap: f32,
}

impl SearchConfig {
    /// Vector calibration slope for a given entity kind.
    #[must_use]
    pub const fn vector_slope_for(&self, kind: EntityKind) -> f32 {
        match kind {
            EntityKind::Region => self.region_vector_slope,
            EntityKind::Faction | EntityKind::Character => self.vector_slope,
        }
    }

    /// Base `(vector, keyword)` blend weights for a given entity kind.
    ///
    /// Weights sum to 1; fusion boosts the dominant one per query.
    #[must_use]
    pub fn base_weights_for(&self, kind: EntityKind) -> (f32, f32) {
        match kind {
            EntityKind::Faction | EntityKind::Region => {
                (self.vector_base_weight, 1.0 - self.vector_base_weight)
            }
            EntityKind::Character => (
                1.0 - self.character_keyword_base_weight,
                self.character_keyword_base_weight,
            ),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_top_n: default_vector_top_n(),
            keyword_limit: default_keyword_limit(),
            score_threshold: default_score_threshold(),
            keyword_slope: default_keyword_slope(),
            vector_slope: default_vector_slope(),
            region_vector_slope: default_region_vector_slope(),
            rerank_slope: default_rerank_slope(),
            vector_base_weight: default_vector_base_weight(),
            character_keyword_base_weight: default_character_keyword_base_weight(),
            weight_cap: default_weight_cap(),
        }
    }
}

/// Cross-encoder rerank service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Rerank endpoint URL. `None` disables reranking entirely.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model identifier passed through to the rerank service.
    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// Request timeout. The engine is called from request handlers, so
    /// this stays bounded.
    #[serde(default = "default_rerank_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_rerank_model(),
            timeout_secs: default_rerank_timeout_secs(),
        }
    }
}

/// Load the project config, falling back to defaults when the file is absent.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".mythos/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_vector_top_n() -> usize {
    10
}

const fn default_keyword_limit() -> u32 {
    50
}

const fn default_score_threshold() -> f32 {
    0.5
}

const fn default_keyword_slope() -> f32 {
    5.0
}

const fn default_vector_slope() -> f32 {
    10.0
}

const fn default_region_vector_slope() -> f32 {
    35.0
}

const fn default_rerank_slope() -> f32 {
    5.0
}

const fn default_vector_base_weight() -> f32 {
    0.6
}

const fn default_character_keyword_base_weight() -> f32 {
    0.6
}

const fn default_weight_cap() -> f32 {
    0.8
}

fn default_rerank_model() -> String {
    "bge-reranker-base".to_string()
}

const fn default_rerank_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.search.vector_top_n, 10);
        assert!((cfg.search.score_threshold - 0.5).abs() < 1e-6);
        assert!(cfg.rerank.endpoint.is_none());
    }

    #[test]
    fn partial_config_fills_remaining_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mythos_dir = dir.path().join(".mythos");
        std::fs::create_dir_all(&mythos_dir).expect("create config dir");
        std::fs::write(
            mythos_dir.join("config.toml"),
            "[search]\nvector_top_n = 25\n\n[rerank]\nendpoint = \"http://localhost:9100/rerank\"\n",
        )
        .expect("write config");

        let cfg = load_project_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.search.vector_top_n, 25);
        assert!((cfg.search.keyword_slope - 5.0).abs() < 1e-6);
        assert_eq!(
            cfg.rerank.endpoint.as_deref(),
            Some("http://localhost:9100/rerank")
        );
        assert_eq!(cfg.rerank.model, "bge-reranker-base");
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mythos_dir = dir.path().join(".mythos");
        std::fs::create_dir_all(&mythos_dir).expect("create config dir");
        std::fs::write(mythos_dir.join("config.toml"), "[search\n").expect("write config");

        let err = load_project_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
        assert_eq!(
            crate::error::error_code(&err),
            crate::error::ErrorCode::ConfigParseError
        );
    }

    #[test]
    fn region_gets_steeper_vector_slope() {
        let cfg = SearchConfig::default();
        assert!((cfg.vector_slope_for(EntityKind::Region) - 35.0).abs() < 1e-6);
        assert!((cfg.vector_slope_for(EntityKind::Faction) - 10.0).abs() < 1e-6);
        assert!((cfg.vector_slope_for(EntityKind::Character) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn base_weights_sum_to_one_for_all_kinds() {
        let cfg = SearchConfig::default();
        for kind in [EntityKind::Faction, EntityKind::Region, EntityKind::Character] {
            let (vector, keyword) = cfg.base_weights_for(kind);
            assert!((vector + keyword - 1.0).abs() < 1e-6, "{kind}");
        }
    }

    #[test]
    fn character_searches_lean_on_keywords() {
        let cfg = SearchConfig::default();
        let (vector, keyword) = cfg.base_weights_for(EntityKind::Character);
        assert!(keyword > vector);

        let (vector, keyword) = cfg.base_weights_for(EntityKind::Faction);
        assert!(vector > keyword);
    }
}
