//! JSON-RPC wire flow: serialized request in, one-line response out.

use serde_json::{Value, json};

use graphrag_e2e_tests::{open_store, seed_catalog};
use graphrag_service::protocol::types::JsonRpcRequest;
use graphrag_service::server::RpcServer;

fn dispatch(server: &RpcServer, line: &str) -> Value {
    let request: JsonRpcRequest = serde_json::from_str(line).expect("parse request");
    let response = server.handle_request(request);
    let wire = serde_json::to_string(&response).expect("serialize response");
    assert!(!wire.contains('\n'));
    serde_json::from_str(&wire).expect("response is valid JSON")
}

#[test]
fn query_graph_wire_roundtrip() {
    let (_dir, store) = open_store();
    seed_catalog(&store);
    let server = RpcServer::new(store);

    let response = dispatch(
        &server,
        r#"{"jsonrpc":"2.0","method":"query_graph","params":{"text":"slack","top_k":3},"id":7}"#,
    );

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 7);
    let nodes = response["result"]["nodes"].as_array().unwrap();
    assert_eq!(nodes[0]["id"], "slack");
    let summary = response["result"]["summary"].as_str().unwrap();
    assert!(summary.contains(&format!("{}", nodes.len())));
}

#[test]
fn update_then_query_observes_the_update() {
    let (_dir, store) = open_store();
    let server = RpcServer::new(store);

    let update = dispatch(
        &server,
        r#"{"jsonrpc":"2.0","method":"apply_update","params":{"added":[{"id":"nodes-base.airtable","label":"Airtable"}]},"id":1}"#,
    );
    assert_eq!(update["result"]["ok"], true);
    assert_eq!(update["result"]["updates_applied"], 1);

    let query = dispatch(
        &server,
        r#"{"jsonrpc":"2.0","method":"query_graph","params":{"text":"airtable"},"id":2}"#,
    );
    assert_eq!(query["result"]["nodes"][0]["id"], "nodes-base.airtable");
}

#[test]
fn ping_unknown_method_and_parse_salvage() {
    let (_dir, store) = open_store();
    let server = RpcServer::new(store);

    let pong = dispatch(&server, r#"{"jsonrpc":"2.0","method":"ping","id":1}"#);
    assert_eq!(pong["result"]["ok"], true);
    assert!(pong["result"]["ts"].as_i64().unwrap() > 0);

    let unknown = dispatch(&server, r#"{"jsonrpc":"2.0","method":"frobnicate","id":2}"#);
    assert_eq!(unknown["error"]["code"], -32603);
    assert!(
        unknown["error"]["message"]
            .as_str()
            .unwrap()
            .contains("frobnicate")
    );
}

#[test]
fn removal_updates_are_applied() {
    let (_dir, store) = open_store();
    seed_catalog(&store);
    let server = RpcServer::new(store.clone());

    let response = dispatch(
        &server,
        r#"{"jsonrpc":"2.0","method":"apply_update","params":{"removed":[{"id":"set"}]},"id":9}"#,
    );
    assert_eq!(response["result"]["ok"], true);
    assert!(store.get_node("set").unwrap().is_none());
}

#[test]
fn mixed_update_batch_counts_every_item() {
    let (_dir, store) = open_store();
    seed_catalog(&store);
    let server = RpcServer::new(store.clone());

    let response = dispatch(
        &server,
        &json!({
            "jsonrpc": "2.0",
            "method": "apply_update",
            "params": {
                "added": [{"id": "nodes-base.switch", "label": "Switch", "embedding": [0.5, 0.5]}],
                "modified": [{"id": "slack", "label": "Slack", "description": "Messaging"}],
                "removed": [{"id": "email"}],
            },
            "id": 3,
        })
        .to_string(),
    );

    assert_eq!(response["result"]["updates_applied"], 3);
    assert_eq!(
        store.get_node("slack").unwrap().unwrap().description.as_deref(),
        Some("Messaging")
    );
    assert_eq!(
        store.get_embedding("nodes-base.switch").unwrap().unwrap().dimension,
        2
    );
}
