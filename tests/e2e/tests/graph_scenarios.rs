//! End-to-end scenarios across storage, search, and traversal.

use std::sync::Arc;

use graphrag_core::{
    Edge, GraphTraversalEngine, Node, RelationshipType, SemanticSearchEngine,
};
use graphrag_e2e_tests::{open_store, seed_catalog};

#[test]
fn category_tagging_filters_nodes() {
    let (_dir, store) = open_store();
    seed_catalog(&store);

    let communication = store.get_nodes_by_category("Communication").unwrap();
    assert_eq!(communication.len(), 1);
    assert_eq!(communication[0].id, "slack");
}

#[test]
fn direct_edge_yields_a_one_hop_path() {
    let (_dir, store) = open_store();
    seed_catalog(&store);

    let edges = store.get_edges_from_node("httpRequest").unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, "slack");

    let traversal = GraphTraversalEngine::new(Arc::clone(&store));
    let path = traversal
        .find_shortest_path("httpRequest", "slack", 5)
        .unwrap()
        .unwrap();
    assert_eq!(path.length, 1);
    assert!((path.confidence - 0.95).abs() < 1e-9);
}

#[test]
fn keyword_search_prefers_keyword_matches() {
    let (_dir, store) = open_store();
    seed_catalog(&store);

    let search = SemanticSearchEngine::new(Arc::clone(&store));
    let results = search.keyword_search("send message", 5, None).unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    assert!(ids.contains(&"slack"));
    assert!(!ids.contains(&"httpRequest"));

    let slack_pos = ids.iter().position(|id| *id == "slack").unwrap();
    if let Some(email_pos) = ids.iter().position(|id| *id == "email") {
        assert!(slack_pos <= email_pos);
    }

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.rank, i + 1);
    }
}

#[test]
fn all_paths_orders_short_and_strong_first() {
    let (_dir, store) = open_store();
    for id in ["A", "B", "C"] {
        store.add_node(&Node::new(id, id)).unwrap();
    }
    store
        .add_edge(&Edge::new("A", "B", RelationshipType::CompatibleWith, 1.0))
        .unwrap();
    store
        .add_edge(&Edge::new("B", "C", RelationshipType::CompatibleWith, 1.0))
        .unwrap();
    store
        .add_edge(&Edge::new("A", "C", RelationshipType::CompatibleWith, 1.0))
        .unwrap();

    let traversal = GraphTraversalEngine::new(Arc::clone(&store));
    let paths = traversal.find_all_paths("A", "C", 3, 3).unwrap();

    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].nodes, vec!["A", "C"]);
    assert_eq!(paths[0].length, 1);
    assert_eq!(paths[1].nodes, vec!["A", "B", "C"]);
    assert_eq!(paths[1].length, 2);
    assert!(paths[0].confidence >= paths[1].confidence);
}

#[test]
fn cycles_are_detected_only_where_present() {
    let (_dir, store) = open_store();
    for id in ["X", "Y", "P", "Q"] {
        store.add_node(&Node::new(id, id)).unwrap();
    }
    store
        .add_edge(&Edge::new("X", "Y", RelationshipType::TriggeredBy, 1.0))
        .unwrap();
    store
        .add_edge(&Edge::new("Y", "X", RelationshipType::TriggeredBy, 1.0))
        .unwrap();
    store
        .add_edge(&Edge::new("P", "Q", RelationshipType::TriggeredBy, 1.0))
        .unwrap();

    let traversal = GraphTraversalEngine::new(Arc::clone(&store));
    assert!(traversal.detect_circular_dependencies("X").unwrap());
    assert!(!traversal.detect_circular_dependencies("P").unwrap());
}

#[test]
fn reopening_preserves_graph_and_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("graph.db");

    {
        let store = graphrag_core::GraphStore::open(&db_path).unwrap();
        seed_catalog(&store);
    }

    let store = graphrag_core::GraphStore::open(&db_path).unwrap();
    assert_eq!(store.node_count().unwrap(), 4);
    assert_eq!(store.edge_count().unwrap(), 1);

    let history = store.get_update_history(None, 50).unwrap();
    assert!(history.iter().any(|h| h.operation == "add_edge"));
}
