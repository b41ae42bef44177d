//! Embedding capability used by retrieval and index building.
//!
//! The pipeline only needs "text in, fixed-size vector out". The Candle
//! implementation lives in `shopai-model` and is adapted in
//! [`model_adapter`](crate::model_adapter); tests plug in deterministic
//! backends.
//!
//! There is **no silent fallback** to a fake backend at runtime. If the
//! embedding model is missing, the engine installs an
//! [`UnavailableEmbedding`] whose every call fails with the load error, so
//! the pipeline answers from keyword matches alone or reports that error.

use crate::errors::{ShopError, ShopResult};

// ============================================================================
// EmbeddingBackend Trait
// ============================================================================

/// Trait for embedding backends (bi-encoders).
///
/// Products and queries must be embedded by the same backend, otherwise
/// distances in the index are meaningless. The index records the model id
/// for that reason.
pub trait EmbeddingBackend: Send + Sync {
    /// Get the model ID this backend uses.
    fn model_id(&self) -> &str;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, inputs: &[String]) -> ShopResult<Vec<Vec<f32>>>;

    /// Embed a single query.
    fn embed_query(&self, query: &str) -> ShopResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[query.to_string()])?;
        vectors.pop().ok_or_else(|| ShopError::EmbeddingFailed {
            model_id: self.model_id().to_string(),
            reason: "backend returned no vector".to_string(),
        })
    }

    /// Warm up the backend by running a dummy inference.
    fn warm_up(&self) -> ShopResult<()> {
        let _ = self.embed_batch(&["warmup".to_string()])?;
        Ok(())
    }
}

/// Check that a batch result has one vector of the expected dimension per input.
pub fn check_embeddings(
    backend: &dyn EmbeddingBackend,
    inputs: usize,
    vectors: &[Vec<f32>],
) -> ShopResult<()> {
    if vectors.len() != inputs {
        return Err(ShopError::EmbeddingFailed {
            model_id: backend.model_id().to_string(),
            reason: format!("expected {} vectors, got {}", inputs, vectors.len()),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != backend.dimension()) {
        return Err(ShopError::EmbeddingFailed {
            model_id: backend.model_id().to_string(),
            reason: format!(
                "expected dimension {}, got {}",
                backend.dimension(),
                bad.len()
            ),
        });
    }
    Ok(())
}

// ============================================================================
// UnavailableEmbedding
// ============================================================================

/// Stand-in for an embedding model that failed to load.
///
/// Reports the configured model id and a dimension of 0 (unknown), and fails
/// every embedding call with the original load failure.
#[derive(Debug, Clone)]
pub struct UnavailableEmbedding {
    model_id: String,
    reason: String,
}

impl UnavailableEmbedding {
    pub fn new(model_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            reason: reason.into(),
        }
    }
}

impl EmbeddingBackend for UnavailableEmbedding {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        0
    }

    fn embed_batch(&self, _inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
        Err(ShopError::EmbeddingProviderUnavailable {
            provider: self.model_id.clone(),
            reason: self.reason.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend {
        vectors: Vec<Vec<f32>>,
    }

    impl EmbeddingBackend for FixedBackend {
        fn model_id(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn embed_batch(&self, _inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
            Ok(self.vectors.clone())
        }
    }

    #[test]
    fn test_embed_query_takes_single_vector() {
        let backend = FixedBackend {
            vectors: vec![vec![1.0, 0.0]],
        };
        assert_eq!(backend.embed_query("耳机").unwrap(), vec![1.0, 0.0]);
        assert!(backend.warm_up().is_ok());
    }

    #[test]
    fn test_embed_query_empty_result_is_error() {
        let backend = FixedBackend { vectors: vec![] };
        let err = backend.embed_query("耳机").unwrap_err();
        assert!(matches!(err, ShopError::EmbeddingFailed { .. }));
    }

    #[test]
    fn test_check_embeddings_rejects_wrong_shape() {
        let backend = FixedBackend { vectors: vec![] };
        assert!(check_embeddings(&backend, 1, &[vec![0.0, 1.0]]).is_ok());
        assert!(check_embeddings(&backend, 2, &[vec![0.0, 1.0]]).is_err());
        assert!(check_embeddings(&backend, 1, &[vec![0.0]]).is_err());
    }

    #[test]
    fn test_unavailable_embedding_fails_as_capability() {
        let backend = UnavailableEmbedding::new("bge-small", "Model not found");
        assert_eq!(backend.model_id(), "bge-small");
        let err = backend.embed_query("耳机").unwrap_err();
        assert!(err.is_capability_failure());
        assert!(err.to_string().contains("Model not found"));
    }
}
