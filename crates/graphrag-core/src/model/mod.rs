//! Data Model
//!
//! Typed entities stored in the knowledge graph:
//! - [`Node`] - a workflow primitive with label, keywords, and a metadata bag
//! - [`Edge`] - a directed, typed relationship with a strength in [0, 1]
//! - [`Embedding`] - a fixed-dimension dense vector tied to one node
//! - [`QueryLog`], [`UpdateHistoryEntry`] - bookkeeping rows
//!
//! All cross-entity references are string ids resolved through storage; the
//! graph may contain cycles, so entities never own each other.

mod edge;
mod embedding;
mod node;

pub use edge::{Edge, EdgeMetadata, RelationshipType};
pub use embedding::Embedding;
pub use node::{Node, NodeMetadata};

use serde::{Deserialize, Serialize};

/// Current unix timestamp in whole seconds, the storage clock for all rows.
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// ENTITY TYPES
// ============================================================================

/// Kinds of entities tracked in the update history.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    #[default]
    Node,
    Pattern,
    UseCase,
    Category,
    Trigger,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Node => "node",
            EntityType::Pattern => "pattern",
            EntityType::UseCase => "use_case",
            EntityType::Category => "category",
            EntityType::Trigger => "trigger",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s {
            "pattern" => EntityType::Pattern,
            "use_case" => EntityType::UseCase,
            "category" => EntityType::Category,
            "trigger" => EntityType::Trigger,
            _ => EntityType::Node,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// QUERY LOG
// ============================================================================

/// Kinds of queries recorded in the query log.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    SemanticSearch,
    PatternMatch,
    RelationshipTraversal,
    KeywordSearch,
    CategorySearch,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::SemanticSearch => "semantic_search",
            QueryType::PatternMatch => "pattern_match",
            QueryType::RelationshipTraversal => "relationship_traversal",
            QueryType::KeywordSearch => "keyword_search",
            QueryType::CategorySearch => "category_search",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "semantic_search" => Some(QueryType::SemanticSearch),
            "pattern_match" => Some(QueryType::PatternMatch),
            "relationship_traversal" => Some(QueryType::RelationshipTraversal),
            "keyword_search" => Some(QueryType::KeywordSearch),
            "category_search" => Some(QueryType::CategorySearch),
            _ => None,
        }
    }
}

/// Append-only record of one query execution, kept for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub query: String,
    pub query_type: Option<QueryType>,
    pub latency_ms: Option<i64>,
    pub result_count: Option<i64>,
    /// Wall-clock unix seconds; filled on insert when absent.
    pub timestamp: Option<i64>,
    pub user_id: Option<String>,
}

impl QueryLog {
    pub fn new(query: impl Into<String>, query_type: QueryType) -> Self {
        Self {
            id: None,
            query: query.into(),
            query_type: Some(query_type),
            latency_ms: None,
            result_count: None,
            timestamp: None,
            user_id: None,
        }
    }
}

// ============================================================================
// UPDATE HISTORY
// ============================================================================

/// Append-only audit trail entry, written inside the same transaction as the
/// mutation it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHistoryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub entity_id: String,
    pub entity_type: EntityType,
    /// One of `add`, `delete`, `add_edge`, `delete_edge`.
    pub operation: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub timestamp: Option<i64>,
    pub source: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_roundtrip() {
        for entity in [
            EntityType::Node,
            EntityType::Pattern,
            EntityType::UseCase,
            EntityType::Category,
            EntityType::Trigger,
        ] {
            assert_eq!(EntityType::parse_name(entity.as_str()), entity);
        }
    }

    #[test]
    fn entity_type_unknown_defaults_to_node() {
        assert_eq!(EntityType::parse_name("mystery"), EntityType::Node);
    }

    #[test]
    fn query_type_roundtrip() {
        for query_type in [
            QueryType::SemanticSearch,
            QueryType::PatternMatch,
            QueryType::RelationshipTraversal,
            QueryType::KeywordSearch,
            QueryType::CategorySearch,
        ] {
            assert_eq!(QueryType::parse_name(query_type.as_str()), Some(query_type));
        }
        assert_eq!(QueryType::parse_name("unknown"), None);
    }
}
