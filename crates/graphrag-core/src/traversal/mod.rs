//! Graph Traversal Engine
//!
//! Multi-hop reasoning over the store: BFS shortest paths, bounded DFS
//! enumeration of alternatives, frontier neighborhoods, and cycle detection.
//! Traversal works on string ids only; nodes are never materialized.
//!
//! Edge strengths compose by multiplication along a path. Exploration treats
//! edges as undirected (both directions expanded), preserving the edge that
//! produced each step; cycle detection follows outgoing edges only.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::model::RelationshipType;
use crate::storage::{GraphStore, Result};

/// Strength assumed per hop when only edge ids are known on the path.
const CONSERVATIVE_HOP_STRENGTH: f64 = 0.95;

// ============================================================================
// PATH
// ============================================================================

/// An ordered walk through the graph, start node first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    /// Node ids in path order; `nodes[0]` is the start, the last the end.
    pub nodes: Vec<String>,
    /// Edge ids connecting consecutive nodes; always `nodes.len() - 1` long.
    pub edges: Vec<String>,
    /// Number of hops.
    pub length: usize,
    /// Product of edge strengths along the path.
    pub total_strength: f64,
    /// `min(1, total_strength)`.
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// BFS frontier entry carrying the walk that reached it.
struct Visit {
    node_id: String,
    depth: usize,
    path: Vec<String>,
    edges: Vec<String>,
    strength: f64,
}

// ============================================================================
// STATS
// ============================================================================

/// Best-effort traversal counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalStats {
    pub total_traversals: u64,
    pub bfs_traversals: u64,
    pub dfs_traversals: u64,
    pub paths_found: u64,
    pub avg_traversal_time_ms: f64,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Path finding and neighborhood expansion over the graph store.
pub struct GraphTraversalEngine {
    store: Arc<GraphStore>,
    stats: Mutex<TraversalStats>,
}

impl GraphTraversalEngine {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self {
            store,
            stats: Mutex::new(TraversalStats::default()),
        }
    }

    /// Breadth-first shortest path between two nodes, bounded by `max_hops`.
    ///
    /// Returns a zero-length path when `start == end` and `None` when no
    /// path exists within the bound.
    pub fn find_shortest_path(
        &self,
        start: &str,
        end: &str,
        max_hops: usize,
    ) -> Result<Option<Path>> {
        let started = Instant::now();

        if start == end {
            self.record(false, started, true);
            return Ok(Some(Path {
                nodes: vec![start.to_string()],
                edges: Vec::new(),
                length: 0,
                total_strength: 1.0,
                confidence: 1.0,
                reasoning: "Source and target are the same node".to_string(),
                pattern: None,
            }));
        }

        let mut queue = VecDeque::new();
        queue.push_back(Visit {
            node_id: start.to_string(),
            depth: 0,
            path: vec![start.to_string()],
            edges: Vec::new(),
            strength: 1.0,
        });
        let mut visited: HashSet<String> = HashSet::from([start.to_string()]);

        while let Some(current) = queue.pop_front() {
            if current.depth >= max_hops {
                continue;
            }

            let out_edges = self.store.get_edges_from_node(&current.node_id)?;
            let in_edges = self.store.get_edges_to_node(&current.node_id)?;

            let steps = out_edges
                .iter()
                .map(|e| (e, e.target_id.as_str()))
                .chain(in_edges.iter().map(|e| (e, e.source_id.as_str())));

            for (edge, neighbor) in steps {
                if neighbor == end {
                    let mut nodes = current.path.clone();
                    nodes.push(end.to_string());
                    let mut edges = current.edges.clone();
                    edges.push(edge.id.clone());
                    let total_strength = current.strength * edge.strength;
                    let length = current.depth + 1;

                    self.record(false, started, true);
                    return Ok(Some(Path {
                        reasoning: format!(
                            "Path through {} connections: {}",
                            length,
                            nodes.join(" -> ")
                        ),
                        nodes,
                        edges,
                        length,
                        total_strength,
                        confidence: total_strength.min(1.0),
                        pattern: None,
                    }));
                }

                if visited.insert(neighbor.to_string()) {
                    let mut path = current.path.clone();
                    path.push(neighbor.to_string());
                    let mut edges = current.edges.clone();
                    edges.push(edge.id.clone());
                    queue.push_back(Visit {
                        node_id: neighbor.to_string(),
                        depth: current.depth + 1,
                        path,
                        edges,
                        strength: current.strength * edge.strength,
                    });
                }
            }
        }

        self.record(false, started, false);
        tracing::debug!("no path found from {} to {}", start, end);
        Ok(None)
    }

    /// Depth-first enumeration of alternative paths, sorted by confidence
    /// descending. Each branch carries its own visited set, so different
    /// paths may revisit shared intermediate nodes; no single path contains
    /// a node twice.
    pub fn find_all_paths(
        &self,
        start: &str,
        end: &str,
        max_hops: usize,
        max_paths: usize,
    ) -> Result<Vec<Path>> {
        let started = Instant::now();

        let mut paths = Vec::new();
        let visited: HashSet<String> = HashSet::from([start.to_string()]);
        self.dfs_paths(
            start,
            end,
            vec![start.to_string()],
            Vec::new(),
            visited,
            0,
            max_hops,
            max_paths,
            &mut paths,
        )?;

        paths.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.record(true, started, !paths.is_empty());
        tracing::debug!("found {} paths from {} to {}", paths.len(), start, end);
        Ok(paths)
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs_paths(
        &self,
        current: &str,
        target: &str,
        path: Vec<String>,
        edges: Vec<String>,
        visited: HashSet<String>,
        depth: usize,
        max_hops: usize,
        max_paths: usize,
        paths: &mut Vec<Path>,
    ) -> Result<()> {
        if paths.len() >= max_paths || depth > max_hops {
            return Ok(());
        }

        if current == target {
            let total_strength = CONSERVATIVE_HOP_STRENGTH.powi(edges.len() as i32);
            let length = path.len() - 1;
            paths.push(Path {
                nodes: path,
                edges,
                length,
                total_strength,
                confidence: total_strength.min(1.0),
                reasoning: format!("Alternative path through {length} connections"),
                pattern: None,
            });
            return Ok(());
        }

        let out_edges = self.store.get_edges_from_node(current)?;
        let in_edges = self.store.get_edges_to_node(current)?;

        let steps = out_edges
            .iter()
            .map(|e| (e, e.target_id.as_str()))
            .chain(in_edges.iter().map(|e| (e, e.source_id.as_str())));

        for (edge, neighbor) in steps {
            if paths.len() >= max_paths {
                break;
            }
            if visited.contains(neighbor) {
                continue;
            }

            let mut next_visited = visited.clone();
            next_visited.insert(neighbor.to_string());
            let mut next_path = path.clone();
            next_path.push(neighbor.to_string());
            let mut next_edges = edges.clone();
            next_edges.push(edge.id.clone());

            self.dfs_paths(
                neighbor,
                target,
                next_path,
                next_edges,
                next_visited,
                depth + 1,
                max_hops,
                max_paths,
                paths,
            )?;
        }

        Ok(())
    }

    /// Frontier expansion: level 0 is the root, level `k` holds the ids
    /// first reached after exactly `k` hops. An optional relationship-kind
    /// filter restricts which edges may be traversed.
    pub fn get_neighbors(
        &self,
        node_id: &str,
        depth: usize,
        kinds: Option<&[RelationshipType]>,
    ) -> Result<BTreeMap<usize, Vec<String>>> {
        let allowed = |kind: RelationshipType| match kinds {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        };

        let mut result = BTreeMap::new();
        result.insert(0, vec![node_id.to_string()]);

        let mut seen: HashSet<String> = HashSet::from([node_id.to_string()]);
        let mut frontier: Vec<String> = vec![node_id.to_string()];

        for level in 1..=depth {
            let mut next: BTreeSet<String> = BTreeSet::new();

            for current in &frontier {
                for edge in self.store.get_edges_from_node(current)? {
                    if allowed(edge.kind) && !seen.contains(&edge.target_id) {
                        next.insert(edge.target_id);
                    }
                }
                for edge in self.store.get_edges_to_node(current)? {
                    if allowed(edge.kind) && !seen.contains(&edge.source_id) {
                        next.insert(edge.source_id);
                    }
                }
            }

            if next.is_empty() {
                break;
            }
            seen.extend(next.iter().cloned());
            frontier = next.iter().cloned().collect();
            result.insert(level, frontier.clone());
        }

        Ok(result)
    }

    /// True iff a cycle is reachable from `node_id` over outgoing edges.
    /// Guards agents against building infinite workflows.
    pub fn detect_circular_dependencies(&self, node_id: &str) -> Result<bool> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        self.has_cycle(node_id, &mut visited, &mut on_stack)
    }

    fn has_cycle(
        &self,
        current: &str,
        visited: &mut HashSet<String>,
        on_stack: &mut HashSet<String>,
    ) -> Result<bool> {
        visited.insert(current.to_string());
        on_stack.insert(current.to_string());

        for edge in self.store.get_edges_from_node(current)? {
            if !visited.contains(&edge.target_id) {
                if self.has_cycle(&edge.target_id, visited, on_stack)? {
                    return Ok(true);
                }
            } else if on_stack.contains(&edge.target_id) {
                return Ok(true);
            }
        }

        on_stack.remove(current);
        Ok(false)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> TraversalStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn record(&self, dfs: bool, started: Instant, found: bool) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_traversals += 1;
            if dfs {
                stats.dfs_traversals += 1;
            } else {
                stats.bfs_traversals += 1;
            }
            if found {
                stats.paths_found += 1;
            }
            let total = stats.total_traversals as f64;
            stats.avg_traversal_time_ms =
                (stats.avg_traversal_time_ms * (total - 1.0) + elapsed_ms) / total;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
