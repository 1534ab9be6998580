//! Shared fixtures for the end-to-end tests.

use std::sync::Arc;

use graphrag_core::{Edge, GraphStore, Node, RelationshipType};

/// Open a store in a fresh temp directory. Keep the guard alive for the
/// duration of the test.
pub fn open_store() -> (tempfile::TempDir, Arc<GraphStore>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = GraphStore::open(dir.path().join("graph.db")).expect("open store");
    (dir, Arc::new(store))
}

/// The small workflow catalog the scenarios run against.
pub fn seed_catalog(store: &GraphStore) {
    let mut slack = Node::new("slack", "Slack");
    slack.category = Some("Communication".to_string());
    slack.keywords = vec!["slack".to_string(), "message".to_string(), "channel".to_string()];
    slack.metadata.use_cases = vec!["send alerts to a channel".to_string()];
    store.add_node(&slack).expect("add slack");

    let mut email = Node::new("email", "Email");
    email.metadata.use_cases = vec!["send notifications".to_string()];
    store.add_node(&email).expect("add email");

    let mut http = Node::new("httpRequest", "HTTP Request");
    http.keywords = vec!["http".to_string(), "api".to_string()];
    store.add_node(&http).expect("add http");

    store.add_node(&Node::new("set", "Set")).expect("add set");

    store
        .add_edge(&Edge::new(
            "httpRequest",
            "slack",
            RelationshipType::CompatibleWith,
            0.95,
        ))
        .expect("add edge");
}
