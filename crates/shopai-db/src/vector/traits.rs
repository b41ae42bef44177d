//! Neighbor index traits and core types.
//!
//! This module defines the abstraction the retrieval stage searches through.

use crate::error::DbResult;
use serde::{Deserialize, Serialize};

// ============================================================================
// VectorMetric
// ============================================================================

/// Distance metric for nearest-neighbor search.
///
/// Every metric reports a *distance*: lower is more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// Squared Euclidean distance (default).
    #[default]
    L2,
    /// Cosine distance, `1 - cosine similarity`.
    Cosine,
}

impl VectorMetric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::L2 => "l2",
            VectorMetric::Cosine => "cosine",
        }
    }

    /// Compute the distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            VectorMetric::L2 => squared_l2(a, b),
            VectorMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

impl std::fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VectorMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(VectorMetric::L2),
            "cosine" => Ok(VectorMetric::Cosine),
            other => Err(format!("Unknown metric '{}'. Valid options: l2, cosine", other)),
        }
    }
}

// ============================================================================
// Neighbor
// ============================================================================

/// A single hit from a nearest-neighbor search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Distance to the query vector (lower is better).
    pub distance: f32,

    /// Position of the matched vector in the index.
    pub position: usize,
}

impl Neighbor {
    pub fn new(distance: f32, position: usize) -> Self {
        Self { distance, position }
    }
}

// ============================================================================
// IndexEntry
// ============================================================================

/// A vector to write into a new index, paired with the product it encodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Product id the vector belongs to.
    pub product_id: String,

    /// The embedding vector.
    pub vector: Vec<f32>,
}

impl IndexEntry {
    pub fn new(product_id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            product_id: product_id.into(),
            vector,
        }
    }
}

// ============================================================================
// NeighborIndex Trait
// ============================================================================

/// Read-only nearest-neighbor index over product embeddings.
///
/// ## Implementation Notes
///
/// - Implementations are immutable once opened and need no locking.
/// - `search` returns hits ordered by ascending distance.
/// - A position returned by `search` is resolved with `product_id_at`;
///   callers must tolerate `None` for positions outside the id list.
pub trait NeighborIndex: Send + Sync {
    /// Return up to `k` nearest vectors to `query`.
    fn search(&self, query: &[f32], k: usize) -> DbResult<Vec<Neighbor>>;

    /// Resolve a position to its product id.
    fn product_id_at(&self, position: usize) -> Option<&str>;

    /// Number of vectors in the index.
    fn len(&self) -> usize;

    /// Check if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of vectors in this index.
    fn dimension(&self) -> usize;

    /// Distance metric used by this index.
    fn metric(&self) -> VectorMetric;
}

// ============================================================================
// Distance Functions
// ============================================================================

/// Squared Euclidean distance, matching the flat-L2 convention of reporting
/// distances without the final square root.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Cosine similarity between two vectors. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
