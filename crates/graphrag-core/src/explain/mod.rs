//! Explanation Generator
//!
//! Composes plain-text rationales for query results: why a node matched, why
//! a path connects, what the alternatives are. Inputs arrive fully realized;
//! the only lookups performed here resolve node ids to labels, degrading to
//! the raw ids when a lookup fails.
//!
//! UI-oriented decoration (warning and tip glyphs) lives in this component
//! and nowhere else.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::Node;
use crate::search::SearchResult;
use crate::storage::GraphStore;
use crate::traversal::Path;

// ============================================================================
// EXPLANATION
// ============================================================================

/// What an explanation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationKind {
    SearchMatch,
    PathConnection,
    Integration,
    Alternative,
    Pattern,
    Warning,
}

/// A composed rationale for one agent-facing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    #[serde(rename = "type")]
    pub kind: ExplanationKind,
    /// One or two sentences.
    pub summary: String,
    pub detailed: String,
    pub confidence: f64,
    pub reasoning_steps: Vec<String>,
    pub caveats: Vec<String>,
    pub examples: Vec<String>,
    pub next_steps: Vec<String>,
}

// ============================================================================
// GENERATOR
// ============================================================================

/// Builds [`Explanation`]s against the store (label resolution only).
pub struct ExplanationGenerator {
    store: Arc<GraphStore>,
}

impl ExplanationGenerator {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Resolve a node id to its label, falling back to the id itself.
    fn label_of(&self, node_id: &str) -> String {
        match self.store.get_node(node_id) {
            Ok(Some(node)) => node.label,
            Ok(None) => node_id.to_string(),
            Err(e) => {
                tracing::warn!("label lookup failed for {}: {}", node_id, e);
                node_id.to_string()
            }
        }
    }

    /// Explain why a search hit was recommended.
    pub fn explain_search_result(&self, result: &SearchResult) -> Explanation {
        let mut reasoning = Vec::new();
        if result.similarity_score > 0.0 {
            reasoning.push(format!(
                "Semantic match with {:.0}% confidence ({:.2} similarity score)",
                result.confidence * 100.0,
                result.similarity_score
            ));
        }
        if result.relevance_score > 0.0 {
            reasoning.push(format!(
                "Keyword relevance of {:.0}% based on query match",
                result.relevance_score * 100.0
            ));
        }

        let mut detailed = format!(
            "The {} node is recommended for your search. ",
            result.node_label
        );
        if !result.use_cases.is_empty() {
            detailed.push_str(&format!(
                "It's commonly used for: {}. ",
                result.use_cases.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        detailed.push_str(&format!(
            "This node belongs to the {} category. ",
            result.category
        ));
        if let Some(description) = &result.description {
            detailed.push_str(&format!("Details: {description} "));
        }

        let mut caveats: Vec<String> = result
            .failure_modes
            .iter()
            .take(2)
            .map(|mode| format!("⚠️ Common mistake: {mode}"))
            .collect();
        if !result.prerequisites.is_empty() {
            caveats.push(format!(
                "Prerequisites: {}",
                result.prerequisites.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
            ));
        }

        let mut next_steps: Vec<String> = result
            .agent_tips
            .iter()
            .take(2)
            .map(|tip| format!("💡 Tip: {tip}"))
            .collect();
        if !result.related_nodes.is_empty() {
            next_steps.push(format!(
                "Consider also checking: {}",
                result.related_nodes.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
            ));
        }

        Explanation {
            kind: ExplanationKind::SearchMatch,
            summary: format!("Recommended: {} ({})", result.node_label, result.category),
            detailed,
            confidence: result.confidence,
            reasoning_steps: reasoning,
            caveats,
            examples: result.use_cases.iter().take(3).cloned().collect(),
            next_steps,
        }
    }

    /// Explain a path from `start` to `end`.
    pub fn explain_path(&self, path: &Path, start: &Node, end: &Node) -> Explanation {
        let reasoning = vec![
            format!("Path found with {} connections", path.length),
            format!("Total confidence: {:.0}%", path.confidence * 100.0),
            format!("Path strength: {:.2}", path.total_strength),
        ];

        let node_names: Vec<String> = path.nodes.iter().map(|id| self.label_of(id)).collect();

        let detailed = format!(
            "Integration path from {} to {}: {}. This sequence represents a {}-step workflow. \
             Each connection has been validated as working in real workflows.",
            start.label,
            end.label,
            node_names.join(" → "),
            path.length
        );

        let mut caveats = Vec::new();
        if path.length > 3 {
            caveats.push("⚠️ This is a long path - consider if a shorter route exists".to_string());
        }
        if path.confidence < 0.7 {
            caveats.push("⚠️ Confidence is moderate - test thoroughly before deploying".to_string());
        }

        let intermediates = if node_names.len() > 2 {
            node_names[1..node_names.len() - 1].join(", ")
        } else {
            String::new()
        };
        let next_steps = vec![
            format!("Use {intermediates} as intermediate steps"),
            "Configure data mapping between each connection".to_string(),
            "Test each step individually before running full workflow".to_string(),
        ];

        Explanation {
            kind: ExplanationKind::PathConnection,
            summary: format!("Integration path: {} → {}", start.label, end.label),
            detailed,
            confidence: path.confidence,
            reasoning_steps: reasoning,
            caveats,
            examples: Vec::new(),
            next_steps,
        }
    }

    /// Explain how two directly related nodes integrate.
    pub fn explain_integration(
        &self,
        source_id: &str,
        target_id: &str,
        relationship: &str,
    ) -> Explanation {
        let (source, target) = match (self.store.get_node(source_id), self.store.get_node(target_id))
        {
            (Ok(Some(source)), Ok(Some(target))) => (source, target),
            _ => {
                tracing::warn!(
                    "integration explanation degraded: {} or {} unresolved",
                    source_id,
                    target_id
                );
                return Self::fallback(
                    ExplanationKind::Integration,
                    "Integration explanation unavailable",
                    "Unable to generate integration explanation",
                );
            }
        };

        let reasoning = vec![
            format!("Nodes are connected via '{relationship}' relationship"),
            "This is a validated integration pattern".to_string(),
            "Both nodes have been successfully used together in real workflows".to_string(),
        ];

        let detailed = format!(
            "{} integrates with {} through {relationship}. This combination is commonly used \
             in {relationship} patterns. The nodes share compatible data formats and can \
             exchange outputs directly.",
            source.label, target.label
        );

        let caveats: Vec<String> = source
            .metadata
            .failure_modes
            .iter()
            .take(1)
            .cloned()
            .collect();

        let next_steps = vec![
            format!("Map {} output to {} input", source.label, target.label),
            format!("Configure {} to receive data from {}", target.label, source.label),
            "Test the integration with sample data".to_string(),
        ];

        Explanation {
            kind: ExplanationKind::Integration,
            summary: format!("Integration: {} → {}", source.label, target.label),
            detailed,
            confidence: 0.85,
            reasoning_steps: reasoning,
            caveats,
            examples: Vec::new(),
            next_steps,
        }
    }

    /// Explain the alternatives to a node.
    pub fn explain_alternatives(&self, node_id: &str, alternative_ids: &[String]) -> Explanation {
        let original = match self.store.get_node(node_id) {
            Ok(Some(node)) => node,
            _ => {
                return Self::fallback(
                    ExplanationKind::Alternative,
                    "Alternative explanation unavailable",
                    "Unable to generate alternatives explanation",
                );
            }
        };

        let alt_names: Vec<String> = alternative_ids
            .iter()
            .map(|id| self.label_of(id))
            .collect();

        let reasoning = vec![
            format!("Found {} alternative node(s)", alt_names.len()),
            "Each alternative performs similar functions".to_string(),
            "Choosing depends on your specific use case".to_string(),
        ];

        let detailed = format!(
            "Instead of {}, you might consider: {}. Each provides similar functionality with \
             different strengths. Choose based on:\n- Integration requirements\n- Performance \
             needs\n- Configuration complexity",
            original.label,
            alt_names.join(", ")
        );

        let next_steps = vec![
            "Compare feature sets of each alternative".to_string(),
            "Check documentation for specific use case fit".to_string(),
            "Consider your existing node configurations".to_string(),
        ];

        Explanation {
            kind: ExplanationKind::Alternative,
            summary: format!("Alternatives to {}", original.label),
            detailed,
            confidence: 0.8,
            reasoning_steps: reasoning,
            caveats: Vec::new(),
            examples: alt_names,
            next_steps,
        }
    }

    fn fallback(kind: ExplanationKind, summary: &str, detailed: &str) -> Explanation {
        Explanation {
            kind,
            summary: summary.to_string(),
            detailed: detailed.to_string(),
            confidence: 0.0,
            reasoning_steps: Vec::new(),
            caveats: vec!["Error generating explanation".to_string()],
            examples: Vec::new(),
            next_steps: Vec::new(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeMetadata;

    fn open_generator() -> (tempfile::TempDir, Arc<GraphStore>, ExplanationGenerator) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(GraphStore::open(dir.path().join("graph.db")).unwrap());
        let generator = ExplanationGenerator::new(Arc::clone(&store));
        (dir, store, generator)
    }

    fn sample_result() -> SearchResult {
        SearchResult {
            node_id: "slack".to_string(),
            node_label: "Slack".to_string(),
            node_type: "action".to_string(),
            category: "Communication".to_string(),
            description: Some("Send messages to channels".to_string()),
            confidence: 0.92,
            similarity_score: 0.92,
            relevance_score: 0.0,
            rank: 1,
            use_cases: vec!["send alerts".to_string(), "notify teams".to_string()],
            agent_tips: vec!["use webhooks".to_string()],
            prerequisites: vec!["API token".to_string()],
            failure_modes: vec!["missing scope".to_string()],
            related_nodes: vec!["email".to_string()],
            why_match: String::new(),
            metadata: NodeMetadata::default(),
        }
    }

    #[test]
    fn search_explanation_carries_caveats_and_tips() {
        let (_dir, _store, generator) = open_generator();
        let explanation = generator.explain_search_result(&sample_result());

        assert_eq!(explanation.kind, ExplanationKind::SearchMatch);
        assert!(explanation.summary.contains("Slack"));
        assert!(explanation.detailed.contains("Communication"));
        assert!((explanation.confidence - 0.92).abs() < 1e-9);
        assert!(explanation.caveats.iter().any(|c| c.contains("missing scope")));
        assert!(explanation.caveats.iter().any(|c| c.contains("Prerequisites")));
        assert!(explanation.next_steps.iter().any(|s| s.contains("use webhooks")));
        assert_eq!(explanation.examples.len(), 2);
    }

    #[test]
    fn path_explanation_resolves_labels_and_degrades() {
        let (_dir, store, generator) = open_generator();
        store.add_node(&Node::new("a", "Alpha")).unwrap();
        store.add_node(&Node::new("b", "Beta")).unwrap();

        let path = Path {
            nodes: vec!["a".to_string(), "ghost".to_string(), "b".to_string()],
            edges: vec!["e1".to_string(), "e2".to_string()],
            length: 2,
            total_strength: 0.9,
            confidence: 0.9,
            reasoning: String::new(),
            pattern: None,
        };

        let start = store.get_node("a").unwrap().unwrap();
        let end = store.get_node("b").unwrap().unwrap();
        let explanation = generator.explain_path(&path, &start, &end);

        assert_eq!(explanation.kind, ExplanationKind::PathConnection);
        // Unresolvable id stays as-is between resolved labels
        assert!(explanation.detailed.contains("Alpha → ghost → Beta"));
        assert!(explanation.caveats.is_empty());
    }

    #[test]
    fn long_or_weak_paths_get_warnings() {
        let (_dir, store, generator) = open_generator();
        for id in ["a", "b", "c", "d", "e"] {
            store.add_node(&Node::new(id, id.to_uppercase())).unwrap();
        }
        let nodes: Vec<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let path = Path {
            edges: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            length: 4,
            total_strength: 0.5,
            confidence: 0.5,
            reasoning: String::new(),
            pattern: None,
            nodes,
        };

        let start = store.get_node("a").unwrap().unwrap();
        let end = store.get_node("e").unwrap().unwrap();
        let explanation = generator.explain_path(&path, &start, &end);
        assert_eq!(explanation.caveats.len(), 2);
        assert!(explanation.caveats[0].starts_with("⚠️"));
    }

    #[test]
    fn integration_explanation_uses_relationship() {
        let (_dir, store, generator) = open_generator();
        let mut http = Node::new("http", "HTTP Request");
        http.metadata.failure_modes = vec!["timeout too low".to_string()];
        store.add_node(&http).unwrap();
        store.add_node(&Node::new("slack", "Slack")).unwrap();

        let explanation = generator.explain_integration("http", "slack", "compatible_with");
        assert_eq!(explanation.kind, ExplanationKind::Integration);
        assert!(explanation.detailed.contains("compatible_with"));
        assert_eq!(explanation.caveats, vec!["timeout too low".to_string()]);
        assert!((explanation.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn missing_nodes_fall_back_gracefully() {
        let (_dir, _store, generator) = open_generator();

        let integration = generator.explain_integration("ghost", "phantom", "solves");
        assert_eq!(integration.confidence, 0.0);
        assert_eq!(integration.caveats, vec!["Error generating explanation"]);

        let alternatives = generator.explain_alternatives("ghost", &[]);
        assert_eq!(alternatives.kind, ExplanationKind::Alternative);
        assert_eq!(alternatives.confidence, 0.0);
    }

    #[test]
    fn alternatives_list_resolved_labels() {
        let (_dir, store, generator) = open_generator();
        store.add_node(&Node::new("slack", "Slack")).unwrap();
        store.add_node(&Node::new("email", "Email")).unwrap();
        store.add_node(&Node::new("sms", "SMS")).unwrap();

        let explanation = generator
            .explain_alternatives("slack", &["email".to_string(), "sms".to_string()]);
        assert!(explanation.summary.contains("Slack"));
        assert_eq!(explanation.examples, vec!["Email", "SMS"]);
        assert!(explanation.detailed.contains("Email, SMS"));
    }

    #[test]
    fn kind_serializes_as_type_tag() {
        let (_dir, _store, generator) = open_generator();
        let explanation = generator.explain_search_result(&sample_result());
        let value = serde_json::to_value(&explanation).unwrap();
        assert_eq!(value["type"], "search_match");
    }
}
