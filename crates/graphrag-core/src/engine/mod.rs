//! Query Engine
//!
//! Front door for the four query kinds. Dispatches to search or traversal,
//! attaches explanations, and hands everything to the formatter. Failures
//! come back as formatted error responses, never as panics.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::explain::{Explanation, ExplanationGenerator};
use crate::format::{ResponseFormat, ResponseFormatter};
use crate::model::{Node, QueryLog, QueryType};
use crate::search::{SearchResult, SemanticSearchEngine};
use crate::storage::{GraphStore, Result, StoreError};
use crate::traversal::GraphTraversalEngine;

/// Default minimum confidence applied to semantic dispatch.
const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

// ============================================================================
// REQUEST TYPES
// ============================================================================

/// The four supported query kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Find nodes by meaning (semantic when an embedding is supplied,
    /// keyword otherwise).
    Search,
    /// Find integration paths between two labeled nodes (`"A to B"`).
    Integrate,
    /// Suggest alternatives to one labeled node.
    Suggest,
    /// Workflow validation placeholder.
    Validate,
}

/// Per-query options; the defaults match the service's behavior.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub embedding: Option<Vec<f32>>,
    pub limit: usize,
    pub category_filter: Option<String>,
    pub include_explanations: bool,
    pub format: ResponseFormat,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            embedding: None,
            limit: 10,
            category_filter: None,
            include_explanations: true,
            format: ResponseFormat::Json,
        }
    }
}

// ============================================================================
// STATS
// ============================================================================

/// Engine-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub avg_query_time_ms: f64,
    pub last_query_time: Option<String>,
}

impl EngineStats {
    pub fn success_rate(&self) -> f64 {
        self.successful_queries as f64 / (self.total_queries.max(1)) as f64
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Orchestrates search, traversal, explanation, and formatting.
pub struct QueryEngine {
    store: Arc<GraphStore>,
    search: SemanticSearchEngine,
    traversal: GraphTraversalEngine,
    explainer: ExplanationGenerator,
    formatter: ResponseFormatter,
    stats: Mutex<EngineStats>,
}

impl QueryEngine {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            search: SemanticSearchEngine::new(Arc::clone(&store)),
            traversal: GraphTraversalEngine::new(Arc::clone(&store)),
            explainer: ExplanationGenerator::new(Arc::clone(&store)),
            formatter: ResponseFormatter::new(),
            stats: Mutex::new(EngineStats::default()),
            store,
        }
    }

    /// Execute one query and return the formatted response string. Every
    /// failure surfaces as a formatted error response.
    pub fn query(&self, query_text: &str, kind: QueryKind, opts: &QueryOptions) -> String {
        let query_id = short_query_id();
        let started = Instant::now();
        let preview: String = query_text.chars().take(50).collect();
        tracing::info!("query {}: {:?} - {}", query_id, kind, preview);

        let outcome = match kind {
            QueryKind::Search => self.handle_search(&query_id, query_text, opts),
            QueryKind::Integrate => self.handle_integrate(&query_id, query_text, opts),
            QueryKind::Suggest => self.handle_suggest(&query_id, query_text, opts),
            QueryKind::Validate => self.handle_validate(&query_id, query_text, opts),
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let (response, result_count) = match outcome {
            Ok((response, count)) => {
                self.record(elapsed_ms, true);
                (response, count)
            }
            Err(e) => {
                tracing::error!("query {} failed: {}", query_id, e);
                self.record(elapsed_ms, false);
                let response = self.formatter.format_error_response(
                    &query_id,
                    query_text,
                    &e.to_string(),
                    opts.format,
                );
                (response, 0)
            }
        };

        self.log_query(query_text, kind, opts, elapsed_ms, result_count);
        tracing::info!("query {} completed in {:.2}ms", query_id, elapsed_ms);
        response
    }

    /// Ranked hits for the service's `query_graph` method: semantic when a
    /// vector is supplied, keyword otherwise.
    pub fn subgraph_query(
        &self,
        text: &str,
        embedding: Option<&[f32]>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        match embedding {
            Some(vector) => {
                self.search
                    .semantic_search(vector, top_k, None, None, DEFAULT_MIN_CONFIDENCE)
            }
            None => self.search.keyword_search(text, top_k, None),
        }
    }

    /// Engine counter snapshot.
    pub fn stats(&self) -> EngineStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Search-engine counter snapshot.
    pub fn search_stats(&self) -> crate::search::SearchStats {
        self.search.stats()
    }

    /// Traversal counter snapshot.
    pub fn traversal_stats(&self) -> crate::traversal::TraversalStats {
        self.traversal.stats()
    }

    // ========================================================================
    // HANDLERS
    // ========================================================================

    fn handle_search(
        &self,
        query_id: &str,
        query_text: &str,
        opts: &QueryOptions,
    ) -> Result<(String, usize)> {
        let search_started = Instant::now();
        let results = match &opts.embedding {
            Some(vector) => self.search.semantic_search(
                vector,
                opts.limit,
                opts.category_filter.as_deref(),
                None,
                DEFAULT_MIN_CONFIDENCE,
            )?,
            None => self.search.keyword_search(
                query_text,
                opts.limit,
                opts.category_filter.as_deref(),
            )?,
        };
        let search_time = elapsed_ms(search_started);

        let explain_started = Instant::now();
        let explanations: Vec<Explanation> = if opts.include_explanations {
            results
                .iter()
                .take(3)
                .map(|r| self.explainer.explain_search_result(r))
                .collect()
        } else {
            Vec::new()
        };
        let explain_time = elapsed_ms(explain_started);

        let stats = json!({
            "search_time_ms": round2(search_time),
            "explanation_time_ms": round2(explain_time),
            "results_count": results.len(),
        });

        let response = self.formatter.format_search_response(
            query_id,
            query_text,
            &results,
            &explanations,
            stats,
            opts.format,
        );
        Ok((response, results.len()))
    }

    fn handle_integrate(
        &self,
        query_id: &str,
        query_text: &str,
        opts: &QueryOptions,
    ) -> Result<(String, usize)> {
        let (source_label, target_label) =
            query_text.split_once(" to ").ok_or_else(|| {
                StoreError::InvalidInput(
                    "integration query must be in format: 'Node1 to Node2'".to_string(),
                )
            })?;
        let source_label = source_label.trim();
        let target_label = target_label.trim();

        let source = self.find_node_by_label(source_label)?;
        let target = self.find_node_by_label(target_label)?;
        let (source, target) = match (source, target) {
            (Some(source), Some(target)) => (source, target),
            _ => {
                return Err(StoreError::NotFound(format!(
                    "could not find nodes matching '{source_label}' or '{target_label}'"
                )));
            }
        };

        let traverse_started = Instant::now();
        let paths = self.traversal.find_all_paths(&source.id, &target.id, 4, 3)?;
        let traverse_time = elapsed_ms(traverse_started);

        let explain_started = Instant::now();
        let explanations: Vec<Explanation> = if opts.include_explanations {
            paths
                .iter()
                .take(2)
                .map(|p| self.explainer.explain_path(p, &source, &target))
                .collect()
        } else {
            Vec::new()
        };
        let explain_time = elapsed_ms(explain_started);

        let stats = json!({
            "traversal_time_ms": round2(traverse_time),
            "explanation_time_ms": round2(explain_time),
            "paths_count": paths.len(),
        });

        let response = self.formatter.format_traverse_response(
            query_id,
            query_text,
            &paths,
            &explanations,
            stats,
            opts.format,
        );
        Ok((response, paths.len()))
    }

    fn handle_suggest(
        &self,
        query_id: &str,
        query_text: &str,
        opts: &QueryOptions,
    ) -> Result<(String, usize)> {
        let target = self
            .find_node_by_label(query_text.trim())?
            .ok_or_else(|| {
                StoreError::NotFound(format!("could not find node matching '{query_text}'"))
            })?;

        // Direct in+out neighbors are the alternatives, in insertion order
        let mut alternatives: Vec<String> = Vec::new();
        for edge in self.store.get_edges_from_node(&target.id)? {
            if !alternatives.contains(&edge.target_id) {
                alternatives.push(edge.target_id);
            }
        }
        for edge in self.store.get_edges_to_node(&target.id)? {
            if !alternatives.contains(&edge.source_id) {
                alternatives.push(edge.source_id);
            }
        }

        let mut results = Vec::new();
        for alt_id in alternatives.iter().take(opts.limit) {
            let Some(node) = self.store.get_node(alt_id)? else {
                continue;
            };
            results.push(SearchResult {
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
                confidence: 0.7,
                similarity_score: 0.0,
                relevance_score: 0.0,
                rank: results.len() + 1,
                use_cases: node.metadata.use_cases.iter().take(3).cloned().collect(),
                agent_tips: node.metadata.agent_tips.iter().take(2).cloned().collect(),
                prerequisites: node.metadata.prerequisites.iter().take(2).cloned().collect(),
                failure_modes: node.metadata.failure_modes.iter().take(2).cloned().collect(),
                related_nodes: Vec::new(),
                why_match: format!("Alternative to {}", target.label),
                metadata: node.metadata.clone(),
            });
        }

        let explanations: Vec<Explanation> = if opts.include_explanations && !results.is_empty() {
            let top_ids: Vec<String> =
                results.iter().take(3).map(|r| r.node_id.clone()).collect();
            vec![self.explainer.explain_alternatives(&target.id, &top_ids)]
        } else {
            Vec::new()
        };

        let stats = json!({"alternatives_count": results.len()});
        let response = self.formatter.format_search_response(
            query_id,
            query_text,
            &results,
            &explanations,
            stats,
            opts.format,
        );
        Ok((response, results.len()))
    }

    fn handle_validate(
        &self,
        query_id: &str,
        query_text: &str,
        opts: &QueryOptions,
    ) -> Result<(String, usize)> {
        // Placeholder until workflow validation lands
        let response = self.formatter.format_search_response(
            query_id,
            query_text,
            &[],
            &[],
            json!({"status": "valid"}),
            opts.format,
        );
        Ok((response, 0))
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Case-insensitive substring match over node labels; first match wins.
    fn find_node_by_label(&self, label: &str) -> Result<Option<Node>> {
        let needle = label.to_lowercase();
        let nodes = self.store.get_nodes(-1, 0)?;
        Ok(nodes
            .into_iter()
            .find(|n| n.label.to_lowercase().contains(&needle)))
    }

    fn log_query(
        &self,
        query_text: &str,
        kind: QueryKind,
        opts: &QueryOptions,
        elapsed_ms: f64,
        result_count: usize,
    ) {
        let query_type = match kind {
            QueryKind::Search if opts.embedding.is_some() => QueryType::SemanticSearch,
            QueryKind::Search => QueryType::KeywordSearch,
            QueryKind::Integrate => QueryType::RelationshipTraversal,
            QueryKind::Suggest => QueryType::PatternMatch,
            QueryKind::Validate => return,
        };

        let mut log = QueryLog::new(query_text, query_type);
        log.latency_ms = Some(elapsed_ms as i64);
        log.result_count = Some(result_count as i64);
        if let Err(e) = self.store.log_query(&log) {
            tracing::warn!("query log write failed: {}", e);
        }
    }

    fn record(&self, elapsed_ms: f64, success: bool) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_queries += 1;
            if success {
                stats.successful_queries += 1;
            } else {
                stats.failed_queries += 1;
            }
            let total = stats.total_queries as f64;
            stats.avg_query_time_ms =
                (stats.avg_query_time_ms * (total - 1.0) + elapsed_ms) / total;
            stats.last_query_time = Some(chrono::Utc::now().to_rfc3339());
        }
    }
}

fn short_query_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================
