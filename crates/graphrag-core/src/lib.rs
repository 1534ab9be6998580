//! # GraphRAG Core
//!
//! Embedded knowledge-graph index for workflow-node recommendations.
//!
//! The crate stores reusable integration primitives ("nodes"), their typed
//! relationships, and per-node embedding vectors in a single SQLite file, and
//! answers semantically ranked queries over them:
//!
//! - **Storage**: connection-pooled SQLite with WAL journaling, schema
//!   migrations, and an append-only update-history audit trail written in the
//!   same transaction as each mutation
//! - **Semantic search**: cosine similarity over caller-supplied embeddings,
//!   weighted keyword relevance, and a hybrid merge of the two
//! - **Traversal**: BFS shortest paths, bounded DFS path enumeration,
//!   neighborhood expansion, and cycle detection
//! - **Explanations**: plain-text rationales for matches, paths, and
//!   alternatives
//! - **Query engine**: dispatch over `search` / `integrate` / `suggest` /
//!   `validate` with per-phase timings and formatted responses
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graphrag_core::{GraphStore, Node, QueryEngine, QueryKind, QueryOptions};
//! use std::sync::Arc;
//!
//! let store = Arc::new(GraphStore::open("graph.db")?);
//!
//! let mut node = Node::new("nodes-base.slack", "Slack");
//! node.category = Some("Communication".to_string());
//! store.add_node(&node)?;
//!
//! let engine = QueryEngine::new(Arc::clone(&store));
//! let response = engine.query("slack", QueryKind::Search, &QueryOptions::default());
//! ```

pub mod engine;
pub mod explain;
pub mod format;
pub mod model;
pub mod search;
pub mod storage;
pub mod traversal;

pub use engine::{EngineStats, QueryEngine, QueryKind, QueryOptions};
pub use explain::{Explanation, ExplanationGenerator, ExplanationKind};
pub use format::{ResponseFormat, ResponseFormatter};
pub use model::{
    Edge, EdgeMetadata, Embedding, EntityType, Node, NodeMetadata, QueryLog, QueryType,
    RelationshipType, UpdateHistoryEntry,
};
pub use search::{SearchResult, SearchStats, SemanticSearchEngine};
pub use storage::{GraphStore, StoreError, StoreStats};
pub use traversal::{GraphTraversalEngine, Path, TraversalStats};
