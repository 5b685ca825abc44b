//! Full-stack search tests over a real SQLite database: FTS5 keyword
//! retrieval, embedding KNN, fusion, and thresholding together.

mod common;

use common::StubEmbedder;
use rusqlite::Connection;

use mythos_core::config::SearchConfig;
use mythos_core::model::{EntityId, EntityKind, KeywordQuery, Scope, WorldId};
use mythos_search::{SearchEngine, SqliteKeywordSource, SqliteVectorSource};

/// Open a schema-ready in-memory database (vector extension registered)
/// and seed two worlds of entities.
fn seed_world() -> Connection {
    let conn = mythos_core::db::open_in_memory().expect("open db");

    conn.execute_batch(
        "INSERT INTO entities (entity_id, world_id, kind, name, summary) VALUES
            (1, 1, 'faction', 'Ashen Covenant', 'A dragon cult of the cinder peaks'),
            (2, 1, 'faction', 'Saltmarsh League', 'Coastal smugglers and fence networks'),
            (3, 1, 'faction', 'Ember Court', 'Fire spirit nobility of the deep forges'),
            (4, 2, 'faction', 'Dragon Banner Host', 'A dragon army from another world'),
            (5, 1, 'region', 'Dragonspine Ridge', 'Mountains where dragons nest');
         INSERT INTO entities (entity_id, world_id, kind, name, summary, is_deleted) VALUES
            (6, 1, 'faction', 'Dragon Eaters', 'A disbanded dragon-hunting company', 1);",
    )
    .expect("seed entities");

    // The stub embedder answers [1, 0, 0]; the Covenant sits on top of the
    // query, the Court off-axis, the League has no embedding at all.
    conn.execute_batch(
        "INSERT INTO entity_embeddings (entity_id, collection, embedding_json) VALUES
            (1, 'faction-world-1', '[1.0, 0.0, 0.0]'),
            (3, 'faction-world-1', '[0.0, 1.0, 0.0]'),
            (5, 'region-world-1', '[1.0, 0.0, 0.0]');",
    )
    .expect("seed embeddings");

    conn
}

fn faction_scope() -> Scope {
    Scope::new(WorldId(1), EntityKind::Faction)
}

#[test]
fn hybrid_search_merges_both_sources() {
    let conn = seed_world();

    let keyword = SqliteKeywordSource::new(&conn);
    let vectors = SqliteVectorSource::new(&conn);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    let results = engine
        .search_with_threshold(&faction_scope(), &KeywordQuery::new(["dragon"]), 0.0)
        .expect("search");

    // Covenant matches on keywords and vectors; the Court is discovered by
    // the vector index alone and hydrated. The League matches neither.
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entity.id, EntityId(1));
    assert_eq!(results[1].entity.id, EntityId(3));
    assert!(results[0].final_score > results[1].final_score);
}

#[test]
fn default_threshold_filters_vector_only_stragglers() {
    let conn = seed_world();

    let keyword = SqliteKeywordSource::new(&conn);
    let vectors = SqliteVectorSource::new(&conn);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    let results = engine
        .search(&faction_scope(), &KeywordQuery::new(["dragon"]))
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entity.id, EntityId(1));
}

#[test]
fn results_stay_inside_the_scope() {
    let conn = seed_world();

    let keyword = SqliteKeywordSource::new(&conn);
    let vectors = SqliteVectorSource::new(&conn);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    let results = engine
        .search_with_threshold(&faction_scope(), &KeywordQuery::new(["dragon"]), 0.0)
        .expect("search");

    // Entity 4 lives in world 2 and entity 5 is a region; neither may
    // appear in a world-1 faction search.
    assert!(results.iter().all(|r| r.entity.world == WorldId(1)));
    assert!(results.iter().all(|r| r.entity.kind == EntityKind::Faction));
    assert!(results.iter().all(|r| r.entity.id != EntityId(4)));
    assert!(results.iter().all(|r| r.entity.id != EntityId(5)));
}

#[test]
fn soft_deleted_entities_never_surface() {
    let conn = seed_world();

    let keyword = SqliteKeywordSource::new(&conn);
    let vectors = SqliteVectorSource::new(&conn);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    let results = engine
        .search_with_threshold(&faction_scope(), &KeywordQuery::new(["dragon"]), 0.0)
        .expect("search");

    assert!(results.iter().all(|r| r.entity.id != EntityId(6)));
}

#[test]
fn region_scope_searches_its_own_collection() {
    let conn = seed_world();

    let keyword = SqliteKeywordSource::new(&conn);
    let vectors = SqliteVectorSource::new(&conn);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    let results = engine
        .search_with_threshold(
            &Scope::new(WorldId(1), EntityKind::Region),
            &KeywordQuery::new(["dragons"]),
            0.0,
        )
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entity.id, EntityId(5));
    assert_eq!(results[0].entity.kind, EntityKind::Region);
}

#[test]
fn keyword_miss_still_surfaces_strong_vector_neighbours() {
    let conn = seed_world();

    let keyword = SqliteKeywordSource::new(&conn);
    let vectors = SqliteVectorSource::new(&conn);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    // No entity mentions this term, so every keyword score is zero and the
    // blend collapses to pure vector weighting. The Covenant sits exactly
    // on the query embedding and clears the threshold on its own.
    let results = engine
        .search(&faction_scope(), &KeywordQuery::new(["xyzzy"]))
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entity.id, EntityId(1));
    assert!(results[0].final_score >= 0.5);
}

#[test]
fn multi_term_queries_use_or_semantics() {
    let conn = seed_world();

    let keyword = SqliteKeywordSource::new(&conn);
    let vectors = SqliteVectorSource::new(&conn);
    let engine = SearchEngine::new(&keyword, &vectors, &StubEmbedder, SearchConfig::default());

    let results = engine
        .search_with_threshold(
            &faction_scope(),
            &KeywordQuery::new(["dragon", "smugglers"]),
            0.0,
        )
        .expect("search");

    let ids: Vec<i64> = results.iter().map(|r| r.entity.id.0).collect();
    assert!(ids.contains(&1));
    assert!(ids.contains(&2));
}
