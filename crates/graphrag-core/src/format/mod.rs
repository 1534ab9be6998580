//! Response Formatter
//!
//! Serializes query results into one of four forms: full JSON (indent 2),
//! compact, human-readable markdown, or a detailed structure with nothing
//! elided. Status and overall confidence are derived here.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::explain::Explanation;
use crate::search::SearchResult;
use crate::traversal::Path;

// ============================================================================
// FORMAT TYPES
// ============================================================================

/// Output forms supported by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Canonical structured serialization, indent 2.
    #[default]
    Json,
    /// Minimal summary: id, status, confidence, counts, top result.
    Compact,
    /// Human-readable markdown.
    Markdown,
    /// Structured object with nothing elided.
    Detailed,
}

/// Unified response envelope shared by every query kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query_id: String,
    pub query_type: String,
    pub query_text: String,
    pub timestamp: String,
    pub status: String,
    pub results: Vec<Value>,
    pub explanations: Vec<Value>,
    pub paths: Vec<Value>,
    pub stats: Value,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ============================================================================
// FORMATTER
// ============================================================================

/// Formats engine output for agent consumption. Stateless; one instance per
/// query engine.
#[derive(Debug, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format search results. Status: `no_results` when empty, `partial`
    /// below five hits, `success` otherwise.
    pub fn format_search_response(
        &self,
        query_id: &str,
        query_text: &str,
        results: &[SearchResult],
        explanations: &[Explanation],
        stats: Value,
        format: ResponseFormat,
    ) -> String {
        let status = match results.len() {
            0 => "no_results",
            1..=4 => "partial",
            _ => "success",
        };

        let confidence = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
        };

        let response = QueryResponse {
            query_id: query_id.to_string(),
            query_type: "search".to_string(),
            query_text: query_text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.to_string(),
            results: results
                .iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect(),
            explanations: explanations.iter().map(full_explanation).collect(),
            paths: Vec::new(),
            stats,
            confidence,
            error: None,
        };

        match format {
            ResponseFormat::Json => pretty_json(&response),
            ResponseFormat::Compact => self.format_compact(&response),
            ResponseFormat::Markdown => self.format_markdown_search(&response),
            ResponseFormat::Detailed => detailed_json(&response),
        }
    }

    /// Format traversal results. Status: `no_paths` when empty, `partial`
    /// for exactly one path, `success` otherwise.
    pub fn format_traverse_response(
        &self,
        query_id: &str,
        query_text: &str,
        paths: &[Path],
        explanations: &[Explanation],
        stats: Value,
        format: ResponseFormat,
    ) -> String {
        let status = match paths.len() {
            0 => "no_paths",
            1 => "partial",
            _ => "success",
        };

        let confidence = if paths.is_empty() {
            0.0
        } else {
            paths.iter().map(|p| p.confidence).sum::<f64>() / paths.len() as f64
        };

        let response = QueryResponse {
            query_id: query_id.to_string(),
            query_type: "traverse".to_string(),
            query_text: query_text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.to_string(),
            results: Vec::new(),
            explanations: explanations.iter().map(brief_explanation).collect(),
            paths: paths
                .iter()
                .filter_map(|p| serde_json::to_value(p).ok())
                .collect(),
            stats,
            confidence,
            error: None,
        };

        match format {
            ResponseFormat::Json => pretty_json(&response),
            ResponseFormat::Compact => self.format_compact(&response),
            ResponseFormat::Markdown => self.format_markdown_traverse(&response),
            ResponseFormat::Detailed => detailed_json(&response),
        }
    }

    /// Format an error envelope in the requested form.
    pub fn format_error_response(
        &self,
        query_id: &str,
        query_text: &str,
        error: &str,
        format: ResponseFormat,
    ) -> String {
        let response = QueryResponse {
            query_id: query_id.to_string(),
            query_type: "error".to_string(),
            query_text: query_text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: "error".to_string(),
            results: Vec::new(),
            explanations: Vec::new(),
            paths: Vec::new(),
            stats: json!({}),
            confidence: 0.0,
            error: Some(error.to_string()),
        };

        match format {
            ResponseFormat::Markdown => format!(
                "# Error\n\n**Query:** {}\n**Error:** {}\n",
                response.query_text, error
            ),
            _ => pretty_json(&response),
        }
    }

    fn format_compact(&self, response: &QueryResponse) -> String {
        let mut compact = json!({
            "query_id": response.query_id,
            "status": response.status,
            "confidence": round3(response.confidence),
            "result_count": response.results.len(),
            "path_count": response.paths.len(),
        });

        if let Some(top) = response.results.first() {
            compact["top_result"] = json!({
                "label": top.get("node_label"),
                "confidence": top.get("confidence"),
            });
        }

        if let Some(shortest) = response
            .paths
            .iter()
            .filter_map(|p| p.get("length").and_then(Value::as_u64))
            .min()
        {
            compact["shortest_path_length"] = json!(shortest);
        }

        serde_json::to_string(&compact).unwrap_or_else(error_fallback)
    }

    fn format_markdown_search(&self, response: &QueryResponse) -> String {
        let mut markdown = String::from("# Search Results\n\n");
        markdown.push_str(&format!("**Query:** {}\n", response.query_text));
        markdown.push_str(&format!("**Status:** {}\n", response.status));
        markdown.push_str(&format!("**Confidence:** {:.0}%\n\n", response.confidence * 100.0));

        if !response.results.is_empty() {
            markdown.push_str("## Results\n\n");
            for (i, result) in response.results.iter().enumerate() {
                let label = result["node_label"].as_str().unwrap_or("?");
                markdown.push_str(&format!("### {}. {}\n\n", i + 1, label));
                markdown.push_str(&format!(
                    "- **Type:** {}\n",
                    result["node_type"].as_str().unwrap_or("unknown")
                ));
                markdown.push_str(&format!(
                    "- **Category:** {}\n",
                    result["category"].as_str().unwrap_or("uncategorized")
                ));
                markdown.push_str(&format!(
                    "- **Confidence:** {:.0}%\n",
                    result["confidence"].as_f64().unwrap_or(0.0) * 100.0
                ));

                if let Some(description) = result["description"].as_str() {
                    markdown.push_str(&format!("- **Description:** {description}\n"));
                }
                if let Some(use_cases) = result["use_cases"].as_array()
                    && !use_cases.is_empty()
                {
                    let joined: Vec<&str> =
                        use_cases.iter().filter_map(Value::as_str).collect();
                    markdown.push_str(&format!("- **Use Cases:** {}\n", joined.join(", ")));
                }
                if let Some(tips) = result["agent_tips"].as_array()
                    && !tips.is_empty()
                {
                    let joined: Vec<&str> = tips.iter().filter_map(Value::as_str).collect();
                    markdown.push_str(&format!("- **Tips:** {}\n", joined.join(", ")));
                }
                markdown.push('\n');
            }
        }

        if !response.explanations.is_empty() {
            markdown.push_str("## Explanations\n\n");
            for exp in &response.explanations {
                markdown.push_str(&format!(
                    "### {}\n\n{}\n\n",
                    exp["summary"].as_str().unwrap_or(""),
                    exp["detailed"].as_str().unwrap_or("")
                ));
                if let Some(caveats) = exp["caveats"].as_array()
                    && !caveats.is_empty()
                {
                    markdown.push_str("**Important:**\n");
                    for caveat in caveats.iter().filter_map(Value::as_str) {
                        markdown.push_str(&format!("- {caveat}\n"));
                    }
                    markdown.push('\n');
                }
            }
        }

        markdown
    }

    fn format_markdown_traverse(&self, response: &QueryResponse) -> String {
        let mut markdown = String::from("# Integration Paths\n\n");
        markdown.push_str(&format!("**Query:** {}\n", response.query_text));
        markdown.push_str(&format!("**Status:** {}\n", response.status));
        markdown.push_str(&format!("**Confidence:** {:.0}%\n\n", response.confidence * 100.0));

        if !response.paths.is_empty() {
            markdown.push_str("## Paths Found\n\n");
            for (i, path) in response.paths.iter().enumerate() {
                let length = path["length"].as_u64().unwrap_or(0);
                markdown.push_str(&format!("### Path {} ({} hops)\n\n", i + 1, length));
                if let Some(nodes) = path["nodes"].as_array() {
                    let joined: Vec<&str> = nodes.iter().filter_map(Value::as_str).collect();
                    markdown.push_str(&format!("- **Nodes:** {}\n", joined.join(" → ")));
                }
                markdown.push_str(&format!(
                    "- **Confidence:** {:.0}%\n",
                    path["confidence"].as_f64().unwrap_or(0.0) * 100.0
                ));
                markdown.push_str(&format!(
                    "- **Strength:** {:.2}\n",
                    path["total_strength"].as_f64().unwrap_or(0.0)
                ));
                markdown.push_str(&format!(
                    "- **Reasoning:** {}\n\n",
                    path["reasoning"].as_str().unwrap_or("")
                ));
            }
        }

        if !response.explanations.is_empty() {
            markdown.push_str("## Guidance\n\n");
            for exp in &response.explanations {
                markdown.push_str(&format!(
                    "### {}\n\n{}\n\n",
                    exp["summary"].as_str().unwrap_or(""),
                    exp["detailed"].as_str().unwrap_or("")
                ));
            }
        }

        markdown
    }
}

/// Full explanation projection used in search responses.
fn full_explanation(exp: &Explanation) -> Value {
    serde_json::to_value(exp).unwrap_or_else(|_| json!({}))
}

/// Traverse-side projection: reasoning through caveats only.
fn brief_explanation(exp: &Explanation) -> Value {
    json!({
        "type": exp.kind,
        "summary": exp.summary,
        "detailed": exp.detailed,
        "confidence": exp.confidence,
        "reasoning_steps": exp.reasoning_steps,
        "caveats": exp.caveats,
    })
}

fn pretty_json(response: &QueryResponse) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(error_fallback)
}

fn detailed_json(response: &QueryResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(error_fallback)
}

fn error_fallback(e: serde_json::Error) -> String {
    format!("{{\"status\": \"error\", \"error\": \"{e}\"}}")
}

// ============================================================================
// TESTS
// ============================================================================
