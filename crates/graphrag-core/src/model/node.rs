//! Graph Node - a reusable workflow primitive
//!
//! Each node carries a stable string id, a human label, free-form keywords,
//! and a metadata bag of agent-oriented hints. The bag has a set of
//! recognized fields the search and explanation stages rely on; anything
//! else is preserved verbatim across a storage round-trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// METADATA BAG
// ============================================================================

/// Agent-oriented metadata carried on a node.
///
/// Recognized fields are typed; unknown fields land in `extra` and are
/// returned unchanged. Nothing is inferred on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Ordered; top 3 surfaced in search results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_cases: Vec<String>,
    /// Ordered; short advisory strings, top 2 surfaced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_tips: Vec<String>,
    /// Gating knowledge required before using the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    /// Surfaced as caveats in explanations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_modes: Vec<String>,
    /// Contributes to keyword relevance alongside the node's own keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Advisory fields (`complexity`, `learning_curve`, `success_rate`, ...)
    /// and anything unrecognized, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl NodeMetadata {
    pub fn is_empty(&self) -> bool {
        self.use_cases.is_empty()
            && self.agent_tips.is_empty()
            && self.prerequisites.is_empty()
            && self.failure_modes.is_empty()
            && self.keywords.is_empty()
            && self.category.is_none()
            && self.node_type.is_none()
            && self.extra.is_empty()
    }
}

// ============================================================================
// NODE
// ============================================================================

/// An entity in the knowledge graph.
///
/// The id is the primary key; timestamps are integer unix seconds, filled in
/// by storage when absent. A node has at most one [`crate::Embedding`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Order-insignificant keyword set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "NodeMetadata::is_empty")]
    pub metadata: NodeMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Node {
    /// Create a new node with the given id and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            category: None,
            keywords: Vec::new(),
            metadata: NodeMetadata::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Category for filtering: the node's own column, falling back to the
    /// metadata bag.
    pub fn effective_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .or(self.metadata.category.as_deref())
    }
}

// ============================================================================
// TESTS
// ============================================================================
