//! Graph Edge - a directed, typed relationship between two nodes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// RELATIONSHIP TYPES
// ============================================================================

/// The closed set of relationship kinds between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    CompatibleWith,
    BelongsToCategory,
    UsedInPattern,
    Solves,
    Requires,
    TriggeredBy,
    SimilarTo,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::CompatibleWith => "compatible_with",
            RelationshipType::BelongsToCategory => "belongs_to_category",
            RelationshipType::UsedInPattern => "used_in_pattern",
            RelationshipType::Solves => "solves",
            RelationshipType::Requires => "requires",
            RelationshipType::TriggeredBy => "triggered_by",
            RelationshipType::SimilarTo => "similar_to",
        }
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compatible_with" => Ok(RelationshipType::CompatibleWith),
            "belongs_to_category" => Ok(RelationshipType::BelongsToCategory),
            "used_in_pattern" => Ok(RelationshipType::UsedInPattern),
            "solves" => Ok(RelationshipType::Solves),
            "requires" => Ok(RelationshipType::Requires),
            "triggered_by" => Ok(RelationshipType::TriggeredBy),
            "similar_to" => Ok(RelationshipType::SimilarTo),
            other => Err(format!("unknown relationship type: {other}")),
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// EDGE
// ============================================================================

/// Metadata bag carried on an edge.
///
/// Recognized fields (`reasoning`, `success_rate`, `common_pattern`,
/// `common_config_mapping`, `gotchas`, `agent_guidance`) are all optional and
/// advisory; the whole bag is preserved verbatim across storage.
pub type EdgeMetadata = serde_json::Map<String, Value>;

/// A directed relationship between two nodes.
///
/// `(source_id, target_id, kind)` is unique in storage. Self-loops are
/// permitted but discouraged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    /// Connection strength in [0, 1]; composes by multiplication along paths.
    pub strength: f64,
    #[serde(default, skip_serializing_if = "EdgeMetadata::is_empty")]
    pub metadata: EdgeMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Edge {
    /// Create a new edge with a generated id.
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: RelationshipType,
        strength: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            strength,
            metadata: EdgeMetadata::new(),
            created_at: None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
