//! Nearest-neighbor capability over product embeddings.
//!
//! [`ProductIndex`] is what the retriever searches. The persisted flat index
//! from `shopai-db` is adapted behind it in
//! [`db_adapter`](crate::db_adapter).

use serde::Serialize;

use crate::errors::ShopResult;

/// A single search hit: distance to the query and the index position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexHit {
    /// Lower is better.
    pub distance: f32,
    pub position: usize,
}

impl IndexHit {
    pub fn new(distance: f32, position: usize) -> Self {
        Self { distance, position }
    }
}

/// Read-only nearest-neighbor index with a positional id mapping.
pub trait ProductIndex: Send + Sync {
    /// Up to `k` hits ordered by ascending distance.
    fn search(&self, query: &[f32], k: usize) -> ShopResult<Vec<IndexHit>>;

    /// Product id stored at `position`, `None` when out of range.
    fn product_id_at(&self, position: usize) -> Option<&str>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of indexed vectors.
    fn dimension(&self) -> usize;

    /// Embedding model the index was built with, if recorded.
    fn model_id(&self) -> Option<&str> {
        None
    }
}
