//! RPC Server
//!
//! Routes JSON-RPC methods onto the graph engine:
//!
//! - `ping` - liveness check, returns `{ok, ts}`
//! - `query_graph` - subgraph summary for a text query, semantic when an
//!   embedding accompanies it
//! - `apply_update` - incremental node upserts/removals, atomic per item
//!
//! Unknown methods and handler failures answer with error code -32603.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use graphrag_core::{
    Embedding, GraphStore, Node, NodeMetadata, QueryEngine, QueryLog, QueryType,
};

use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Default `top_k` for `query_graph`.
const DEFAULT_TOP_K: usize = 5;

/// Model tag recorded for embeddings arriving without one.
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

// ============================================================================
// PARAMS
// ============================================================================

#[derive(Debug, Deserialize)]
struct QueryGraphParams {
    #[serde(default)]
    text: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default)]
    embedding: Vec<f32>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize)]
struct ApplyUpdateParams {
    #[serde(default)]
    added: Vec<Value>,
    #[serde(default)]
    modified: Vec<Value>,
    #[serde(default)]
    removed: Vec<Value>,
}

// ============================================================================
// SERVER
// ============================================================================

/// Dispatches decoded JSON-RPC requests onto storage and the query engine.
pub struct RpcServer {
    store: Arc<GraphStore>,
    engine: QueryEngine,
}

impl RpcServer {
    pub fn new(store: Arc<GraphStore>) -> Self {
        let engine = QueryEngine::new(Arc::clone(&store));
        Self { store, engine }
    }

    /// Handle one request and produce its response.
    pub fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let result = match request.method.as_str() {
            "ping" => Ok(json!({"ok": true, "ts": chrono::Utc::now().timestamp()})),
            "query_graph" => self.handle_query_graph(request.params),
            "apply_update" => self.handle_apply_update(request.params),
            method => {
                warn!("unknown method: {}", method);
                Err(JsonRpcError::internal_error(&format!(
                    "Unknown method: {method}"
                )))
            }
        };

        match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        }
    }

    // ========================================================================
    // query_graph
    // ========================================================================

    fn handle_query_graph(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: QueryGraphParams = decode_params(params)?;
        let started = Instant::now();

        let embedding = if params.embedding.is_empty() {
            None
        } else {
            // The query vector must match the stored dimension
            if let Some(dimension) = self
                .store
                .embedding_dimension()
                .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?
                && dimension != params.embedding.len()
            {
                return Err(JsonRpcError::internal_error(&format!(
                    "embedding dimension mismatch: expected {dimension}, got {}",
                    params.embedding.len()
                )));
            }
            Some(params.embedding.as_slice())
        };

        let results = self
            .engine
            .subgraph_query(&params.text, embedding, params.top_k.max(1))
            .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;

        let semantic = embedding.is_some();
        let nodes: Vec<Value> = results
            .iter()
            .map(|r| {
                json!({
                    "id": r.node_id,
                    "label": r.node_label,
                    "type": r.node_type,
                    "description": r.description,
                    "score": if semantic { r.similarity_score } else { r.relevance_score },
                    "confidence": r.confidence,
                    "metadata": r.metadata,
                })
            })
            .collect();

        // Stored edges whose endpoints both landed in the result set
        let ids: std::collections::HashSet<&str> =
            results.iter().map(|r| r.node_id.as_str()).collect();
        let mut edges = Vec::new();
        for result in &results {
            let outgoing = self
                .store
                .get_edges_from_node(&result.node_id)
                .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
            for edge in outgoing {
                if ids.contains(edge.target_id.as_str()) {
                    edges.push(json!({
                        "source": edge.source_id,
                        "target": edge.target_id,
                        "type": edge.kind.as_str(),
                    }));
                }
            }
        }

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.log_query(&params.text, semantic, latency_ms, results.len());

        Ok(json!({
            "nodes": nodes,
            "edges": edges,
            "summary": format!("Found {} node(s) related to '{}'.", results.len(), params.text),
        }))
    }

    fn log_query(&self, text: &str, semantic: bool, latency_ms: f64, result_count: usize) {
        let query_type = if semantic {
            QueryType::SemanticSearch
        } else {
            QueryType::KeywordSearch
        };
        let mut log = QueryLog::new(text, query_type);
        log.latency_ms = Some(latency_ms as i64);
        log.result_count = Some(result_count as i64);
        if let Err(e) = self.store.log_query(&log) {
            warn!("query log write failed: {}", e);
        }
    }

    // ========================================================================
    // apply_update
    // ========================================================================

    fn handle_apply_update(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ApplyUpdateParams = decode_params(params)?;
        let mut applied = 0usize;

        // added and modified are both upserts
        for item in params.added.iter().chain(params.modified.iter()) {
            match self.apply_upsert(item) {
                Ok(()) => applied += 1,
                Err(e) => {
                    warn!("apply_update upsert failed: {}", e);
                    return Ok(json!({"ok": false, "error": e}));
                }
            }
        }

        for item in &params.removed {
            match self.apply_removal(item) {
                Ok(()) => applied += 1,
                Err(e) => {
                    warn!("apply_update removal failed: {}", e);
                    return Ok(json!({"ok": false, "error": e}));
                }
            }
        }

        info!("apply_update: {} item(s) applied", applied);
        Ok(json!({"ok": true, "updates_applied": applied}))
    }

    /// Upsert one catalog item and, when present, its embedding, in a single
    /// transaction.
    fn apply_upsert(&self, item: &Value) -> Result<(), String> {
        let node = item_to_node(item)?;

        let embedding = match item.get("embedding") {
            Some(Value::Array(values)) if !values.is_empty() => {
                let vector: Vec<f32> = values
                    .iter()
                    .map(|v| v.as_f64().map(|f| f as f32))
                    .collect::<Option<Vec<f32>>>()
                    .ok_or_else(|| format!("non-numeric embedding for node '{}'", node.id))?;
                let model = self
                    .store
                    .get_metadata("embedding_model")
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
                Some(Embedding::new(&node.id, vector, model))
            }
            _ => None,
        };

        self.store
            .add_node_with_embedding(&node, embedding.as_ref())
            .map_err(|e| e.to_string())
    }

    fn apply_removal(&self, item: &Value) -> Result<(), String> {
        let id = item_id(item).ok_or_else(|| "removed item has no id".to_string())?;
        // Removing an absent node is not an error; the graph already agrees
        self.store.delete_node(&id).map(|_| ()).map_err(|e| e.to_string())
    }
}

// ============================================================================
// ITEM DECODING
// ============================================================================

fn item_id(item: &Value) -> Option<String> {
    ["id", "type", "name"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Build a [`Node`] from a catalog item. The id falls back through
/// `id`/`type`/`name`, the label through `label`/`displayName`/id, and the
/// keyword set is derived from id and label tokens when not given explicitly.
fn item_to_node(item: &Value) -> Result<Node, String> {
    let id = item_id(item).ok_or_else(|| "item has no id, type, or name".to_string())?;
    let label = ["label", "displayName"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .unwrap_or(&id)
        .to_string();

    let mut node = Node::new(id, label);
    node.description = item
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    node.category = item
        .get("category")
        .and_then(Value::as_str)
        .map(str::to_string);

    node.keywords = match item.get("keywords") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => derived_keywords(&node.id, &node.label),
    };

    if let Some(metadata) = item.get("metadata") {
        node.metadata = serde_json::from_value::<NodeMetadata>(metadata.clone())
            .map_err(|e| format!("undecodable metadata for node '{}': {e}", node.id))?;
    }

    Ok(node)
}

/// Tokenize the id (on `.` and whitespace) and label into a sorted,
/// deduplicated keyword set.
fn derived_keywords(id: &str, label: &str) -> Vec<String> {
    let mut keywords: Vec<String> = id
        .to_lowercase()
        .replace('.', " ")
        .split_whitespace()
        .chain(label.to_lowercase().split_whitespace())
        .map(str::to_string)
        .collect();
    keywords.sort();
    keywords.dedup();
    keywords
}

fn decode_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================
