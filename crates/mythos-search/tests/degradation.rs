//! Failure-mode tests: which stage failures are fatal and which degrade.
//!
//! Only the rerank stage is allowed to fail without failing the search;
//! embedding, vector retrieval, and keyword retrieval are load-bearing.

mod common;

use common::{
    FailingEmbedder, FailingKeyword, FailingReranker, FailingVectors, ScriptedReranker,
    StaticKeyword, StaticVectors, StubEmbedder, keyword_hit, record, vector_hit,
};
use mythos_core::config::SearchConfig;
use mythos_core::model::{EntityId, EntityKind, KeywordQuery, Scope, WorldId};
use mythos_search::SearchEngine;
use mythos_search::rerank::RerankHit;

fn scope() -> Scope {
    Scope::new(WorldId(1), EntityKind::Faction)
}

fn query() -> KeywordQuery {
    KeywordQuery::new(["dragon"])
}

fn healthy_sources() -> (StaticKeyword, StaticVectors) {
    let keyword = StaticKeyword(vec![
        keyword_hit(
            record(1, EntityKind::Faction, "Ashen Covenant", "dragon cult"),
            9.0,
        ),
        keyword_hit(
            record(2, EntityKind::Faction, "Saltmarsh League", "smugglers"),
            3.0,
        ),
    ]);
    let vectors = StaticVectors(vec![vector_hit(1, 0.2)]);
    (keyword, vectors)
}

#[test]
fn embedder_failure_is_fatal() {
    let (keyword, vectors) = healthy_sources();
    let engine = SearchEngine::new(&keyword, &vectors, &FailingEmbedder, SearchConfig::default());

    let err = engine.search(&scope(), &query()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to embed query"));
}

#[test]
fn vector_source_failure_is_fatal() {
    let (keyword, _) = healthy_sources();
    let engine = SearchEngine::new(
        &keyword,
        &FailingVectors,
        &StubEmbedder,
        SearchConfig::default(),
    );

    let err = engine.search(&scope(), &query()).unwrap_err();
    assert!(format!("{err:#}").contains("vector search failed"));
}

#[test]
fn keyword_source_failure_is_fatal() {
    let vectors = StaticVectors(vec![vector_hit(1, 0.2)]);
    let engine = SearchEngine::new(
        &FailingKeyword,
        &vectors,
        &StubEmbedder,
        SearchConfig::default(),
    );

    let err = engine.search(&scope(), &query()).unwrap_err();
    assert!(format!("{err:#}").contains("keyword search failed"));
}

#[test]
fn rerank_failure_degrades_to_fused_ordering() {
    let (keyword, vectors) = healthy_sources();
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default())
        .with_reranker(&FailingReranker);

    let results = engine
        .search_with_threshold(&scope(), &query(), 0.0)
        .expect("rerank failure must not fail the search");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entity.id, EntityId(1));
    assert!(results[0].final_score >= results[1].final_score);
}

#[test]
fn malformed_rerank_response_degrades_to_fused_ordering() {
    let (keyword, vectors) = healthy_sources();
    // Index 9 is out of range for a two-document batch.
    let reranker = ScriptedReranker(vec![RerankHit {
        index: 9,
        relevance: 1.0,
    }]);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default())
        .with_reranker(&reranker);

    let results = engine
        .search_with_threshold(&scope(), &query(), 0.0)
        .expect("malformed rerank response must not fail the search");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entity.id, EntityId(1));
}

#[test]
fn degraded_results_still_respect_the_threshold() {
    let (keyword, vectors) = healthy_sources();
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default())
        .with_reranker(&FailingReranker);

    let results = engine.search(&scope(), &query()).expect("search");
    for r in &results {
        assert!(r.final_score >= 0.5);
    }
}

#[test]
fn empty_sources_yield_empty_ok() {
    let keyword = StaticKeyword(vec![]);
    let vectors = StaticVectors(vec![]);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default())
        .with_reranker(&FailingReranker);

    let results = engine.search(&scope(), &query()).expect("search");
    assert!(results.is_empty());
}

#[test]
fn empty_vector_results_keep_keyword_ranking() {
    let (keyword, _) = healthy_sources();
    let vectors = StaticVectors(vec![]);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    let results = engine
        .search_with_threshold(&scope(), &query(), 0.0)
        .expect("search");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entity.id, EntityId(1));
    assert_eq!(results[1].entity.id, EntityId(2));
}
