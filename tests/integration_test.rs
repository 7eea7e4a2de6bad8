//! End-to-end scenarios against the facade over an in-memory SQLite
//! backend: round trips, cycle refusal, bi-temporal queries, pagination,
//! context extraction, and migration.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use memorygraph::config::MemoryGraphConfig;
use memorygraph::db::MemoryDatabase;
use memorygraph::migration;
use memorygraph::models::{MemoryInput, MemoryType, RelationshipInput, SearchQuery};
use memorygraph::storage::{MemoryOperations, SqliteBackend};
use memorygraph::{Error, MemoryId};

fn database() -> MemoryDatabase {
    let config = MemoryGraphConfig::default();
    let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
    MemoryDatabase::new(backend, &config)
}

fn store(db: &MemoryDatabase, memory_type: MemoryType, title: &str) -> MemoryId {
    db.store_memory(MemoryInput {
        memory_type,
        title: title.to_string(),
        content: format!("content for {title}"),
        ..Default::default()
    })
    .unwrap()
    .id
}

fn link(from: &MemoryId, to: &MemoryId, rel_type: &str) -> RelationshipInput {
    RelationshipInput {
        from_memory_id: from.as_str().to_string(),
        to_memory_id: to.as_str().to_string(),
        relationship_type: rel_type.to_string(),
        strength: None,
        confidence: None,
        context: None,
        valid_from: None,
    }
}

fn ts(text: &str) -> DateTime<Utc> {
    text.parse::<DateTime<Utc>>().unwrap()
}

#[test]
fn test_store_round_trip_normalizes_tags() {
    let db = database();
    let stored = db
        .store_memory(MemoryInput {
            memory_type: MemoryType::Solution,
            title: "Fix".to_string(),
            content: "Use backoff".to_string(),
            tags: vec!["Redis".to_string(), "Timeout".to_string()],
            ..Default::default()
        })
        .unwrap();

    let fetched = db.get_memory(&stored.id, false).unwrap().memory;
    assert_eq!(fetched.title, "Fix");
    assert_eq!(fetched.tags, vec!["redis", "timeout"]);
    assert_eq!(fetched.version, 1);
    assert_eq!(fetched, stored);
}

#[test]
fn test_cycle_refused_then_permitted() {
    let db = database();
    let a = store(&db, MemoryType::General, "A");
    let b = store(&db, MemoryType::General, "B");
    let c = store(&db, MemoryType::General, "C");

    db.create_relationship(link(&a, &b, "DEPENDS_ON")).unwrap();
    db.create_relationship(link(&b, &c, "DEPENDS_ON")).unwrap();

    let err = db
        .create_relationship(link(&c, &a, "DEPENDS_ON"))
        .unwrap_err();
    assert!(err.to_string().to_lowercase().contains("cycle"));
    let Error::CycleDetected { path } = err else {
        panic!("expected CycleDetected");
    };
    // The path reproduces a valid cycle containing A, B, C in some rotation.
    assert_eq!(path.first(), path.last());
    assert_eq!(path.len(), 4);
    for id in [&a, &b, &c] {
        assert!(path.contains(&id.as_str().to_string()));
    }

    // With cycles allowed the same edge is accepted.
    let permissive_config = MemoryGraphConfig::default().with_allow_cycles(true);
    let permissive = MemoryDatabase::new(Arc::clone(db.backend()), &permissive_config);
    permissive
        .create_relationship(link(&c, &a, "DEPENDS_ON"))
        .unwrap();
}

#[test]
fn test_bitemporal_supersession() {
    let db = database();
    let a = store(&db, MemoryType::Solution, "A");
    let b = store(&db, MemoryType::Problem, "B");
    let c = store(&db, MemoryType::Solution, "C");

    let mut a_solves = link(&a, &b, "SOLVES");
    a_solves.valid_from = Some(ts("2024-01-01T00:00:00Z"));
    let a_edge = db.create_relationship(a_solves).unwrap();

    let mut c_solves = link(&c, &b, "SOLVES");
    c_solves.valid_from = Some(ts("2024-06-01T00:00:00Z"));
    let c_edge = db.create_relationship(c_solves).unwrap();

    db.invalidate_relationship(
        &a_edge.id,
        Some(c_edge.id.clone()),
        Some(ts("2024-06-01T00:00:00Z")),
    )
    .unwrap();

    // March: only the A edge was valid.
    let march = db.query_as_of(&b, ts("2024-03-01T00:00:00Z")).unwrap();
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].relationship.id, a_edge.id);

    // August: only the C edge.
    let august = db.query_as_of(&b, ts("2024-08-01T00:00:00Z")).unwrap();
    assert_eq!(august.len(), 1);
    assert_eq!(august[0].relationship.id, c_edge.id);

    // History: both rows, ordered by valid_from.
    let history = db.get_relationship_history(&b).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, a_edge.id);
    assert_eq!(history[1].id, c_edge.id);
    assert_eq!(history[0].invalidated_by.as_ref(), Some(&c_edge.id));

    // The default view hides the invalidated edge entirely.
    let current = db.get_memory(&b, true).unwrap();
    assert_eq!(current.relationships.len(), 1);
    assert_eq!(current.relationships[0].id, c_edge.id);
}

#[test]
fn test_pagination_over_237_memories() {
    let db = database();
    for i in 0..237 {
        store(&db, MemoryType::General, &format!("memory {i:03}"));
    }

    let query = SearchQuery::new().with_limit(50).with_offset(100);
    let page = db.search_memories(&query).unwrap();
    assert_eq!(page.items.len(), 50);
    assert_eq!(page.total_count, 237);
    assert!(page.has_more);
    assert_eq!(page.next_offset, Some(150));

    // Final partial page.
    let query = SearchQuery::new().with_limit(50).with_offset(200);
    let page = db.search_memories(&query).unwrap();
    assert_eq!(page.items.len(), 37);
    assert!(!page.has_more);
    assert_eq!(page.next_offset, None);
}

#[test]
fn test_context_extraction_on_create() {
    let db = database();
    let a = store(&db, MemoryType::Solution, "auth work");
    let b = store(&db, MemoryType::Task, "auth milestone");

    let mut input = link(&a, &b, "ADDRESSES");
    input.context = Some(
        "partially implements auth module, only works in production, verified by E2E tests"
            .to_string(),
    );
    let created = db.create_relationship(input).unwrap();

    let fetched = db.get_relationship(&created.id).unwrap();
    let context = fetched.properties.context_json.expect("structured context");
    assert_eq!(
        context["text"],
        "partially implements auth module, only works in production, verified by E2E tests"
    );
    assert_eq!(context["scope"], "partial");
    assert_eq!(context["components"], serde_json::json!(["auth module"]));
    assert_eq!(context["conditions"], serde_json::json!(["production"]));
    assert_eq!(context["evidence"], serde_json::json!(["E2E tests"]));
    assert_eq!(context["temporal"], serde_json::Value::Null);
    assert_eq!(context["exceptions"], serde_json::json!([]));
}

#[test]
fn test_migration_between_backends() {
    let source_db = database();
    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(store(&source_db, MemoryType::General, &format!("m{i}")));
    }
    for pair in ids.chunks(2) {
        source_db
            .create_relationship(link(&pair[0], &pair[1], "RELATED_TO"))
            .unwrap();
    }
    // One invalidated relationship rides along.
    let extra = source_db
        .create_relationship(link(&ids[0], &ids[2], "LEADS_TO"))
        .unwrap();
    source_db
        .invalidate_relationship(&extra.id, None, None)
        .unwrap();

    let target_db = database();
    let report = migration::migrate(
        source_db.backend(),
        &target_db,
        migration::ImportMode::RefuseIfExists,
        false,
    )
    .unwrap();
    assert!(report.verified);
    assert_eq!(report.counts.memories, 10);
    assert_eq!(report.counts.relationships, 6);

    let validation =
        migration::validate_migration(source_db.backend(), target_db.backend()).unwrap();
    assert!(validation.matches);
    assert_eq!(validation.source_checksum, validation.target_checksum);

    // Search returns identical results in identical order on both sides.
    let query = SearchQuery::new().with_limit(100);
    let source_page = source_db.search_memories(&query).unwrap();
    let target_page = target_db.search_memories(&query).unwrap();
    let source_ids: Vec<_> = source_page.items.iter().map(|m| m.id.clone()).collect();
    let target_ids: Vec<_> = target_page.items.iter().map(|m| m.id.clone()).collect();
    assert_eq!(source_ids, target_ids);
}

#[test]
fn test_update_bumps_version_and_delete_cascades() {
    let db = database();
    let a = store(&db, MemoryType::General, "a");
    let b = store(&db, MemoryType::General, "b");
    db.create_relationship(link(&a, &b, "SIMILAR_TO")).unwrap();

    let updated = db
        .update_memory(&a, memorygraph::models::MemoryUpdate::default())
        .unwrap();
    assert_eq!(updated.version, 2);

    db.delete_memory(&a).unwrap();
    assert!(matches!(db.get_memory(&a, false), Err(Error::NotFound(_))));
    assert!(db.get_memory(&b, true).unwrap().relationships.is_empty());
}

#[test]
fn test_reinforcement_lifecycle() {
    let db = database();
    let a = store(&db, MemoryType::Fix, "fix");
    let b = store(&db, MemoryType::Error, "error");
    let rel = db
        .create_relationship(link(&a, &b, "FIXES"))
        .unwrap();

    let reinforced = db.reinforce_relationship(&rel.id, Some(0.3)).unwrap();
    assert_eq!(reinforced.properties.evidence_count, 2);
    assert!(reinforced.properties.strength > rel.properties.strength);
    assert!(reinforced.properties.last_reinforced >= rel.properties.last_reinforced);

    db.invalidate_relationship(&rel.id, None, None).unwrap();
    let err = db.reinforce_relationship(&rel.id, None).unwrap_err();
    assert!(matches!(err, Error::Relationship(_)));
}
