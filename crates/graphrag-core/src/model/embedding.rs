//! Embedding vectors
//!
//! Dense vectors are supplied by the caller (the index never runs a model)
//! and stored as packed little-endian f32 buffers. The stored byte length is
//! always `dimension * 4`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A dense vector associated with exactly one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub id: String,
    pub node_id: String,
    pub vector: Vec<f32>,
    pub dimension: usize,
    /// Model-name tag, e.g. `all-MiniLM-L6-v2`.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Embedding {
    /// Create an embedding for a node; the dimension is taken from the vector.
    pub fn new(node_id: impl Into<String>, vector: Vec<f32>, model: impl Into<String>) -> Self {
        let dimension = vector.len();
        Self {
            id: Uuid::new_v4().to_string(),
            node_id: node_id.into(),
            vector,
            dimension,
            model: model.into(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Pack the vector as little-endian f32 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Unpack a little-endian f32 buffer. Returns `None` when the byte length
    /// is not a multiple of 4.
    pub fn vector_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        Some(
            bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip_is_bitwise_exact() {
        let vector = vec![0.0_f32, -1.5, f32::MIN_POSITIVE, 3.1415927, -0.0];
        let embedding = Embedding::new("nodes-base.slack", vector.clone(), "all-MiniLM-L6-v2");

        let bytes = embedding.to_bytes();
        assert_eq!(bytes.len(), embedding.dimension * 4);

        let restored = Embedding::vector_from_bytes(&bytes).unwrap();
        assert_eq!(restored.len(), vector.len());
        for (a, b) in restored.iter().zip(vector.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        assert!(Embedding::vector_from_bytes(&[0u8, 1, 2]).is_none());
        assert_eq!(Embedding::vector_from_bytes(&[]), Some(vec![]));
    }

    #[test]
    fn dimension_tracks_vector_length() {
        let embedding = Embedding::new("n", vec![0.5; 384], "all-MiniLM-L6-v2");
        assert_eq!(embedding.dimension, 384);
        assert_eq!(embedding.to_bytes().len(), 384 * 4);
    }
}
