//! Semantic Search Engine
//!
//! Ranks nodes by meaning. Three entry points share one result shape:
//!
//! - [`SemanticSearchEngine::semantic_search`] - cosine similarity against
//!   caller-supplied query vectors
//! - [`SemanticSearchEngine::keyword_search`] - weighted substring relevance
//!   over labels, descriptions, keywords, and use cases
//! - [`SemanticSearchEngine::hybrid_search`] - confidence-weighted merge of
//!   the two
//!
//! Confidence is always in [0, 1]. A candidate that cannot be scored (missing
//! embedding, undecodable vector) is skipped with a log line; only a failure
//! of the node listing itself aborts a search.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeMetadata};
use crate::storage::{GraphStore, Result};

/// Capacity of the per-engine node-embedding cache.
const EMBEDDING_CACHE_SIZE: usize = 256;

/// Numerical guard added to cosine denominators.
const COSINE_EPSILON: f64 = 1e-8;

/// Keyword candidates scoring below this relevance are dropped.
const MIN_KEYWORD_RELEVANCE: f64 = 0.1;

// ============================================================================
// SEARCH RESULT
// ============================================================================

/// Single ranked hit with the agent-facing enrichment attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub node_id: String,
    pub node_label: String,
    pub node_type: String,
    pub category: String,
    pub description: Option<String>,
    /// Ranking score in [0, 1].
    pub confidence: f64,
    /// Remapped cosine similarity; 0 outside semantic mode.
    pub similarity_score: f64,
    /// Keyword relevance; 0 outside keyword/hybrid mode.
    pub relevance_score: f64,
    /// 1-based position, assigned after the final sort.
    pub rank: usize,
    pub use_cases: Vec<String>,
    pub agent_tips: Vec<String>,
    pub prerequisites: Vec<String>,
    pub failure_modes: Vec<String>,
    pub related_nodes: Vec<String>,
    pub why_match: String,
    pub metadata: NodeMetadata,
}

// ============================================================================
// STATS
// ============================================================================

/// Best-effort per-engine counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    pub total_searches: u64,
    pub semantic_searches: u64,
    pub keyword_searches: u64,
    pub hybrid_searches: u64,
    pub avg_query_time_ms: f64,
    pub last_search_time: Option<String>,
}

enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Vector, keyword, and hybrid search over the graph store.
pub struct SemanticSearchEngine {
    store: Arc<GraphStore>,
    embedding_cache: Mutex<LruCache<String, Arc<Vec<f32>>>>,
    stats: Mutex<SearchStats>,
}

impl SemanticSearchEngine {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            store,
            embedding_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(EMBEDDING_CACHE_SIZE).expect("cache capacity is non-zero"),
            )),
            stats: Mutex::new(SearchStats::default()),
        }
    }

    /// Rank nodes by cosine similarity to `query_vector`.
    ///
    /// Results are sorted by confidence descending (label, then id, break
    /// ties), ranked from 1, and filtered to `min_confidence`.
    pub fn semantic_search(
        &self,
        query_vector: &[f32],
        limit: usize,
        category_filter: Option<&str>,
        type_filter: Option<&str>,
        min_confidence: f64,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let nodes = self.store.get_nodes(-1, 0)?;

        let mut results = Vec::new();
        for node in &nodes {
            if !matches_category(node, category_filter) {
                continue;
            }
            if let Some(wanted) = type_filter
                && node.metadata.node_type.as_deref() != Some(wanted)
            {
                continue;
            }

            let vector = match self.node_embedding(&node.id) {
                Some(v) => v,
                None => continue,
            };

            let similarity = remapped_cosine(query_vector, &vector);
            let confidence = similarity;
            if confidence < min_confidence {
                continue;
            }

            let why_match = format!(
                "Found '{}' with {:.1}% confidence based on semantic similarity",
                node.label,
                confidence * 100.0
            );
            results.push(self.build_result(node, confidence, similarity, 0.0, why_match));
        }

        sort_by_confidence(&mut results);
        results.truncate(limit);
        assign_ranks(&mut results);

        self.record(SearchMode::Semantic, started);
        tracing::debug!("semantic search returned {} results", results.len());
        Ok(results)
    }

    /// Rank nodes by weighted substring relevance of the lower-cased query.
    pub fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        category_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let query_lower = query.to_lowercase();
        let nodes = self.store.get_nodes(-1, 0)?;

        let mut results = Vec::new();
        for node in &nodes {
            if !matches_category(node, category_filter) {
                continue;
            }

            let relevance = keyword_relevance(&query_lower, node);
            if relevance < MIN_KEYWORD_RELEVANCE {
                continue;
            }

            let confidence = (relevance * 0.8).clamp(0.2, 1.0);
            let why_match = format!(
                "Found '{}' matching keyword '{}' ({:.1}% match)",
                node.label,
                query,
                relevance * 100.0
            );
            results.push(self.build_result(node, confidence, 0.0, relevance, why_match));
        }

        // Relevance is the ranking metric here; confidence is derived from it
        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_label.cmp(&b.node_label))
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        results.truncate(limit);
        assign_ranks(&mut results);

        self.record(SearchMode::Keyword, started);
        tracing::debug!("keyword search returned {} results", results.len());
        Ok(results)
    }

    /// Merge semantic and keyword hits: `c = w * c_sem + (1 - w) * c_kw`,
    /// with a missing side contributing zero. Default weight is 0.7.
    pub fn hybrid_search(
        &self,
        query_text: &str,
        query_vector: Option<&[f32]>,
        limit: usize,
        category_filter: Option<&str>,
        semantic_weight: f64,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let semantic_weight = semantic_weight.clamp(0.0, 1.0);

        let semantic_results = match query_vector {
            Some(vector) => {
                self.semantic_search(vector, limit * 2, category_filter, None, 0.2)?
            }
            None => Vec::new(),
        };
        let keyword_results = self.keyword_search(query_text, limit * 2, category_filter)?;

        let mut merged: HashMap<String, SearchResult> = HashMap::new();
        for mut result in semantic_results {
            result.confidence *= semantic_weight;
            merged.insert(result.node_id.clone(), result);
        }
        for mut result in keyword_results {
            match merged.entry(result.node_id.clone()) {
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.confidence += result.confidence * (1.0 - semantic_weight);
                    existing.relevance_score = result.relevance_score;
                }
                Entry::Vacant(entry) => {
                    result.confidence *= 1.0 - semantic_weight;
                    entry.insert(result);
                }
            }
        }

        let mut results: Vec<SearchResult> = merged.into_values().collect();
        sort_by_confidence(&mut results);
        results.truncate(limit);
        assign_ranks(&mut results);

        self.record(SearchMode::Hybrid, started);
        tracing::debug!("hybrid search returned {} results", results.len());
        Ok(results)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> SearchStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Assemble a result with metadata enrichment and related-node lookup.
    fn build_result(
        &self,
        node: &Node,
        confidence: f64,
        similarity: f64,
        relevance: f64,
        why_match: String,
    ) -> SearchResult {
        SearchResult {
            node_id: node.id.clone(),
            node_label: node.label.clone(),
            node_type: node
                .metadata
                .node_type
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            category: node
                .effective_category()
                .unwrap_or("uncategorized")
                .to_string(),
            description: node.description.clone(),
            confidence,
            similarity_score: similarity,
            relevance_score: relevance,
            rank: 0,
            use_cases: top_n(&node.metadata.use_cases, 3),
            agent_tips: top_n(&node.metadata.agent_tips, 2),
            prerequisites: top_n(&node.metadata.prerequisites, 2),
            failure_modes: top_n(&node.metadata.failure_modes, 2),
            related_nodes: self.related_nodes(&node.id, 5),
            why_match,
            metadata: node.metadata.clone(),
        }
    }

    /// Direct in+out neighbors, deduplicated in insertion order.
    fn related_nodes(&self, node_id: &str, limit: usize) -> Vec<String> {
        let mut related: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            if related.len() < limit && id != node_id && !related.iter().any(|r| r == id) {
                related.push(id.to_string());
            }
        };

        match self.store.get_edges_from_node(node_id) {
            Ok(edges) => edges.iter().for_each(|e| push(&e.target_id)),
            Err(e) => tracing::warn!("related-node lookup failed for {}: {}", node_id, e),
        }
        match self.store.get_edges_to_node(node_id) {
            Ok(edges) => edges.iter().for_each(|e| push(&e.source_id)),
            Err(e) => tracing::warn!("related-node lookup failed for {}: {}", node_id, e),
        }

        related
    }

    /// Fetch a node's embedding through the LRU cache. Unscorable candidates
    /// yield `None` and are skipped by the caller.
    fn node_embedding(&self, node_id: &str) -> Option<Arc<Vec<f32>>> {
        if let Ok(mut cache) = self.embedding_cache.lock()
            && let Some(vector) = cache.get(node_id)
        {
            return Some(Arc::clone(vector));
        }

        match self.store.get_embedding(node_id) {
            Ok(Some(embedding)) => {
                let vector = Arc::new(embedding.vector);
                if let Ok(mut cache) = self.embedding_cache.lock() {
                    cache.put(node_id.to_string(), Arc::clone(&vector));
                }
                Some(vector)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("skipping {}: embedding unreadable ({})", node_id, e);
                None
            }
        }
    }

    /// Drop a node's cached vector, e.g. after an update replaced it.
    pub fn invalidate_embedding(&self, node_id: &str) {
        if let Ok(mut cache) = self.embedding_cache.lock() {
            cache.pop(node_id);
        }
    }

    fn record(&self, mode: SearchMode, started: Instant) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_searches += 1;
            match mode {
                SearchMode::Semantic => stats.semantic_searches += 1,
                SearchMode::Keyword => stats.keyword_searches += 1,
                SearchMode::Hybrid => stats.hybrid_searches += 1,
            }
            let total = stats.total_searches as f64;
            stats.avg_query_time_ms =
                (stats.avg_query_time_ms * (total - 1.0) + elapsed_ms) / total;
            stats.last_search_time = Some(chrono::Utc::now().to_rfc3339());
        }
    }
}

// ============================================================================
// SCORING
// ============================================================================

/// Raw cosine similarity with an epsilon guard on the denominator.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt() + COSINE_EPSILON)
}

/// Cosine remapped from [-1, 1] to [0, 1] and clamped.
pub fn remapped_cosine(a: &[f32], b: &[f32]) -> f64 {
    ((cosine_similarity(a, b) + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Deterministic keyword relevance in [0, 1].
///
/// The lower-cased query is split into whitespace tokens; a field matches
/// when it contains any token. Weights: label 0.5, description 0.2, keywords
/// 0.1 each (capped 0.2), use cases 0.05 each (capped 0.1), total clamped
/// to 1.0.
pub fn keyword_relevance(query_lower: &str, node: &Node) -> f64 {
    let tokens: Vec<&str> = query_lower.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let matches = |field: &str| {
        let field = field.to_lowercase();
        tokens.iter().any(|t| field.contains(t))
    };

    let mut score = 0.0;

    if matches(&node.label) {
        score += 0.5;
    }

    if let Some(description) = &node.description
        && matches(description)
    {
        score += 0.2;
    }

    let keyword_matches = node
        .keywords
        .iter()
        .chain(node.metadata.keywords.iter())
        .filter(|k| matches(k))
        .count();
    score += (keyword_matches as f64 * 0.1).min(0.2);

    let use_case_matches = node
        .metadata
        .use_cases
        .iter()
        .filter(|u| matches(u))
        .count();
    score += (use_case_matches as f64 * 0.05).min(0.1);

    score.min(1.0)
}

fn matches_category(node: &Node, filter: Option<&str>) -> bool {
    match filter {
        Some(wanted) => node.effective_category() == Some(wanted),
        None => true,
    }
}

fn sort_by_confidence(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.node_label.cmp(&b.node_label))
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
}

fn assign_ranks(results: &mut [SearchResult]) {
    for (idx, result) in results.iter_mut().enumerate() {
        result.rank = idx + 1;
    }
}

fn top_n(items: &[String], n: usize) -> Vec<String> {
    items.iter().take(n).cloned().collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Embedding, RelationshipType};

    fn open_engine() -> (tempfile::TempDir, Arc<GraphStore>, SemanticSearchEngine) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(GraphStore::open(dir.path().join("graph.db")).unwrap());
        let engine = SemanticSearchEngine::new(Arc::clone(&store));
        (dir, store, engine)
    }

    fn add_node_with_vector(store: &GraphStore, id: &str, label: &str, vector: Vec<f32>) {
        store.add_node(&Node::new(id, label)).unwrap();
        store
            .add_embedding(&Embedding::new(id, vector, "all-MiniLM-L6-v2"))
            .unwrap();
    }

    #[test]
    fn cosine_is_symmetric_and_self_similar() {
        let a = vec![0.3_f32, -0.2, 0.9, 0.05];
        let b = vec![0.1_f32, 0.4, -0.3, 0.8];

        let ab = cosine_similarity(&a, &b);
        let ba = cosine_similarity(&b, &a);
        assert!((ab - ba).abs() < 1e-6);

        let aa = cosine_similarity(&a, &a);
        assert!((aa - 1.0).abs() < 1e-6);
    }

    #[test]
    fn remap_covers_opposite_vectors() {
        let a = vec![1.0_f32, 0.0];
        let opposite = vec![-1.0_f32, 0.0];
        assert!(remapped_cosine(&a, &opposite) < 1e-6);
        assert!((remapped_cosine(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn semantic_search_ranks_by_similarity() {
        let (_dir, store, engine) = open_engine();
        add_node_with_vector(&store, "close", "Close", vec![1.0, 0.0, 0.0]);
        add_node_with_vector(&store, "near", "Near", vec![0.8, 0.6, 0.0]);
        add_node_with_vector(&store, "far", "Far", vec![-1.0, 0.0, 0.0]);

        let results = engine
            .semantic_search(&[1.0, 0.0, 0.0], 10, None, None, 0.3)
            .unwrap();

        assert_eq!(results[0].node_id, "close");
        assert_eq!(results[1].node_id, "near");
        // "far" remaps to 0.0, below min_confidence
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
        assert!(results[0].confidence >= results[1].confidence);
        assert!(results[0].why_match.contains("semantic similarity"));
    }

    #[test]
    fn semantic_search_skips_nodes_without_embeddings() {
        let (_dir, store, engine) = open_engine();
        add_node_with_vector(&store, "a", "A", vec![1.0, 0.0]);
        store.add_node(&Node::new("bare", "Bare")).unwrap();

        let results = engine
            .semantic_search(&[1.0, 0.0], 10, None, None, 0.0)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node_id, "a");
    }

    #[test]
    fn semantic_search_applies_filters() {
        let (_dir, store, engine) = open_engine();

        let mut slack = Node::new("slack", "Slack");
        slack.category = Some("Communication".to_string());
        slack.metadata.node_type = Some("action".to_string());
        store.add_node(&slack).unwrap();
        store
            .add_embedding(&Embedding::new("slack", vec![1.0, 0.0], "m"))
            .unwrap();

        add_node_with_vector(&store, "http", "HTTP Request", vec![1.0, 0.0]);

        let by_category = engine
            .semantic_search(&[1.0, 0.0], 10, Some("Communication"), None, 0.0)
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].node_id, "slack");

        let by_type = engine
            .semantic_search(&[1.0, 0.0], 10, None, Some("action"), 0.0)
            .unwrap();
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type[0].node_id, "slack");
    }

    #[test]
    fn keyword_weights_follow_field_priorities() {
        let (_dir, store, engine) = open_engine();

        let mut slack = Node::new("slack", "Slack");
        slack.keywords = vec!["message".to_string(), "channel".to_string()];
        store.add_node(&slack).unwrap();

        let mut email = Node::new("email", "Email");
        email.metadata.use_cases = vec!["send notifications".to_string()];
        store.add_node(&email).unwrap();

        store.add_node(&Node::new("http", "HTTP Request")).unwrap();

        let results = engine.keyword_search("send message", 5, None).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();

        // slack matches on a keyword (0.1); email's lone use-case match
        // (0.05) falls below the relevance floor; http matches nothing
        assert!(ids.contains(&"slack"));
        assert!(!ids.contains(&"http"));
        match ids.iter().position(|id| *id == "email") {
            Some(email_pos) => {
                let slack_pos = ids.iter().position(|id| *id == "slack").unwrap();
                assert!(slack_pos <= email_pos);
            }
            None => {} // dropped below the 0.1 floor
        }
    }

    #[test]
    fn keyword_use_cases_and_description_stack() {
        let (_dir, store, engine) = open_engine();

        let mut email = Node::new("email", "Email");
        email.description = Some("Send transactional mail".to_string());
        email.metadata.use_cases = vec!["send notifications".to_string()];
        store.add_node(&email).unwrap();

        let results = engine.keyword_search("send", 5, None).unwrap();
        assert_eq!(results.len(), 1);
        // description 0.2 + one use case 0.05
        assert!((results[0].relevance_score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn keyword_label_match_dominates() {
        let (_dir, store, engine) = open_engine();
        store.add_node(&Node::new("slack", "Slack")).unwrap();

        let results = engine.keyword_search("slack", 5, None).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].relevance_score - 0.5).abs() < 1e-9);
        assert!((results[0].confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn keyword_confidence_has_floor() {
        let (_dir, store, engine) = open_engine();

        let mut node = Node::new("a", "A");
        node.keywords = vec!["send alerts".to_string()];
        store.add_node(&node).unwrap();

        let results = engine.keyword_search("send", 5, None).unwrap();
        assert_eq!(results.len(), 1);
        // relevance 0.1 -> raw 0.08, floored at 0.2
        assert!((results[0].confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn keyword_relevance_is_capped() {
        let mut node = Node::new("msg", "message hub");
        node.description = Some("message routing".to_string());
        node.keywords = vec!["message".to_string(); 5];
        node.metadata.use_cases = vec!["message fanout".to_string(); 5];

        let relevance = keyword_relevance("message", &node);
        // 0.5 + 0.2 + cap(0.2) + cap(0.1)
        assert!((relevance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ties_break_on_label_then_id() {
        let (_dir, store, engine) = open_engine();
        add_node_with_vector(&store, "b-node", "Zeta", vec![1.0, 0.0]);
        add_node_with_vector(&store, "a-node", "Alpha", vec![1.0, 0.0]);

        let results = engine
            .semantic_search(&[1.0, 0.0], 10, None, None, 0.0)
            .unwrap();
        assert_eq!(results[0].node_label, "Alpha");
        assert_eq!(results[1].node_label, "Zeta");
    }

    #[test]
    fn hybrid_combines_both_signals() {
        let (_dir, store, engine) = open_engine();

        let mut slack = Node::new("slack", "Slack");
        slack.keywords = vec!["message".to_string()];
        store.add_node(&slack).unwrap();
        store
            .add_embedding(&Embedding::new("slack", vec![1.0, 0.0], "m"))
            .unwrap();

        add_node_with_vector(&store, "vector-only", "Vector Only", vec![0.9, 0.43]);

        let results = engine
            .hybrid_search("message", Some(&[1.0, 0.0]), 10, None, 0.7)
            .unwrap();

        let slack_hit = results.iter().find(|r| r.node_id == "slack").unwrap();
        // Both sides contribute: 0.7 * 1.0 + 0.3 * 0.2
        assert!((slack_hit.confidence - 0.76).abs() < 1e-6);
        assert!(slack_hit.relevance_score > 0.0);

        let vector_hit = results.iter().find(|r| r.node_id == "vector-only").unwrap();
        assert!(vector_hit.confidence < slack_hit.confidence);
        assert_eq!(results[0].node_id, "slack");
        assert_eq!(results[0].rank, 1);
    }

    #[test]
    fn hybrid_without_vector_degrades_to_keyword() {
        let (_dir, store, engine) = open_engine();
        let mut slack = Node::new("slack", "Slack");
        slack.keywords = vec!["message".to_string()];
        store.add_node(&slack).unwrap();

        let results = engine.hybrid_search("message", None, 10, None, 0.7).unwrap();
        assert_eq!(results.len(), 1);
        // Keyword-only contribution: 0.2 * (1 - 0.7)
        assert!((results[0].confidence - 0.06).abs() < 1e-9);
    }

    #[test]
    fn enrichment_truncates_and_collects_neighbors() {
        let (_dir, store, engine) = open_engine();

        let mut node = Node::new("hub", "Hub");
        node.metadata.use_cases = (0..5).map(|i| format!("case {i}")).collect();
        node.metadata.agent_tips = (0..4).map(|i| format!("tip {i}")).collect();
        node.metadata.prerequisites = (0..3).map(|i| format!("pre {i}")).collect();
        node.metadata.failure_modes = (0..3).map(|i| format!("fail {i}")).collect();
        store.add_node(&node).unwrap();
        store
            .add_embedding(&Embedding::new("hub", vec![1.0, 0.0], "m"))
            .unwrap();

        for i in 0..7 {
            let id = format!("n{i}");
            store.add_node(&Node::new(&id, &id)).unwrap();
            let edge = if i % 2 == 0 {
                Edge::new("hub", &id, RelationshipType::CompatibleWith, 0.9)
            } else {
                Edge::new(&id, "hub", RelationshipType::Requires, 0.9)
            };
            store.add_edge(&edge).unwrap();
        }

        let results = engine
            .semantic_search(&[1.0, 0.0], 10, None, None, 0.0)
            .unwrap();
        let hit = &results[0];
        assert_eq!(hit.use_cases.len(), 3);
        assert_eq!(hit.agent_tips.len(), 2);
        assert_eq!(hit.prerequisites.len(), 2);
        assert_eq!(hit.failure_modes.len(), 2);
        assert_eq!(hit.related_nodes.len(), 5);
    }

    #[test]
    fn stats_track_modes_and_mean() {
        let (_dir, store, engine) = open_engine();
        store.add_node(&Node::new("slack", "Slack")).unwrap();

        engine.keyword_search("slack", 5, None).unwrap();
        engine.keyword_search("slack", 5, None).unwrap();
        engine
            .hybrid_search("slack", None, 5, None, 0.7)
            .unwrap();

        let stats = engine.stats();
        // Hybrid runs keyword internally, which also counts
        assert_eq!(stats.keyword_searches, 3);
        assert_eq!(stats.hybrid_searches, 1);
        assert_eq!(stats.total_searches, 4);
        assert!(stats.avg_query_time_ms >= 0.0);
        assert!(stats.last_search_time.is_some());
    }
}
