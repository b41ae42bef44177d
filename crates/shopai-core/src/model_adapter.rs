//! Adapter layer for shopai-model infrastructure.
//!
//! This module bridges shopai-model implementations with shopai-core's
//! capability traits. It provides:
//!
//! - Error conversion from `ModelError` to `ShopError`
//! - Wrapper types implementing [`EmbeddingBackend`], [`RelevanceScorer`] and
//!   [`GeneratorBackend`] over the boxed shopai-model models
//! - Factory functions taking the resolved configuration
//!
//! ## Architecture
//!
//! ```text
//! shopai-core pipeline (retrieval, reranker, composer)
//!        ↓
//!   model_adapter (this module) - wrappers + conversions
//!        ↓
//!     shopai-model implementations (Candle embeddings/reranking, Ollama)
//! ```

use crate::composer::GeneratorBackend;
use crate::config::{EmbeddingConfig, GeneratorConfig, RerankerConfig};
use crate::embedding::EmbeddingBackend;
use crate::errors::{ShopError, ShopResult};
use crate::reranker::RelevanceScorer;

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert a shopai-model error to a shopai-core error.
pub fn from_model_error(err: shopai_model::ModelError) -> ShopError {
    use shopai_model::ModelError;

    match err {
        ModelError::ModelsDirectoryNotFound { searched } => {
            let paths = searched
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            ShopError::EmbeddingProviderUnavailable {
                provider: "model-locator".to_string(),
                reason: format!("Models directory not found. Searched: {}", paths),
            }
        }

        ModelError::ModelNotFound { model_id, path } => ShopError::EmbeddingProviderUnavailable {
            provider: model_id,
            reason: format!("Model not found at {:?}", path),
        },

        ModelError::IncompleteModelFiles { path, missing } => {
            ShopError::EmbeddingProviderUnavailable {
                provider: path.display().to_string(),
                reason: format!("Missing model files: {}", missing.join(", ")),
            }
        }

        ModelError::ModelLoad { model_id, message } => ShopError::EmbeddingProviderUnavailable {
            provider: model_id,
            reason: message,
        },

        ModelError::Tokenization { message } => ShopError::EmbeddingFailed {
            model_id: "tokenizer".to_string(),
            reason: message,
        },

        ModelError::EmbeddingFailed { model_id, message } => ShopError::EmbeddingFailed {
            model_id,
            reason: message,
        },

        ModelError::RerankingFailed { model_id, message } => ShopError::RerankerInferenceFailed {
            model_id,
            reason: message,
        },

        ModelError::GenerationFailed { model, message } => ShopError::GeneratorFailed {
            model,
            reason: message,
        },

        ModelError::ProviderNotAvailable { provider, reason } => {
            ShopError::EmbeddingProviderUnavailable { provider, reason }
        }

        ModelError::DeviceNotAvailable { reason } => ShopError::EmbeddingProviderUnavailable {
            provider: "device".to_string(),
            reason,
        },

        ModelError::Io(io_err) => ShopError::Io(io_err),

        ModelError::Json(json_err) => ShopError::Json(json_err),
    }
}

/// Extension trait to convert shopai-model results to `ShopResult`.
pub trait IntoShopResult<T> {
    fn into_shop_result(self) -> ShopResult<T>;
}

impl<T> IntoShopResult<T> for shopai_model::ModelResult<T> {
    fn into_shop_result(self) -> ShopResult<T> {
        self.map_err(from_model_error)
    }
}

// ============================================================================
// Embedding Backend Wrapper
// ============================================================================

/// Wrapper around a shopai-model embedding model.
pub struct ModelEmbeddingBackend {
    inner: Box<dyn shopai_model::EmbeddingModel>,
    batch_size: usize,
}

impl std::fmt::Debug for ModelEmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEmbeddingBackend")
            .field("model_id", &self.inner.model_id())
            .field("dimension", &self.inner.dimension())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl ModelEmbeddingBackend {
    pub fn new(model: Box<dyn shopai_model::EmbeddingModel>, batch_size: usize) -> Self {
        Self {
            inner: model,
            batch_size: batch_size.max(1),
        }
    }

    /// Load the configured model (device already resolved).
    pub fn from_config(config: &EmbeddingConfig) -> ShopResult<Self> {
        let model = shopai_model::create_embedding_model(config).into_shop_result()?;
        Ok(Self::new(model, config.batch_size))
    }
}

impl EmbeddingBackend for ModelEmbeddingBackend {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn embed_batch(&self, inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(inputs.len());
        for chunk in inputs.chunks(self.batch_size) {
            vectors.extend(self.inner.embed_batch(chunk).into_shop_result()?);
        }
        Ok(vectors)
    }

    fn warm_up(&self) -> ShopResult<()> {
        self.inner.warm_up().into_shop_result()
    }
}

// ============================================================================
// Reranker Wrapper
// ============================================================================

/// Wrapper around a shopai-model cross-encoder.
pub struct ModelRerankerBackend {
    inner: Box<dyn shopai_model::RerankerModel>,
}

impl std::fmt::Debug for ModelRerankerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRerankerBackend")
            .field("model_id", &self.inner.model_id())
            .finish()
    }
}

impl ModelRerankerBackend {
    pub fn new(model: Box<dyn shopai_model::RerankerModel>) -> Self {
        Self { inner: model }
    }

    pub fn from_config(config: &RerankerConfig) -> ShopResult<Self> {
        let model = shopai_model::create_reranker_model(config).into_shop_result()?;
        Ok(Self::new(model))
    }
}

impl RelevanceScorer for ModelRerankerBackend {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn score_batch(&self, query: &str, documents: &[String]) -> ShopResult<Vec<f32>> {
        self.inner.score_batch(query, documents).into_shop_result()
    }

    fn warm_up(&self) -> ShopResult<()> {
        self.inner.warm_up().into_shop_result()
    }
}

// ============================================================================
// Generator Wrapper
// ============================================================================

/// Wrapper around a shopai-model text generator.
pub struct ModelGenerator {
    inner: Box<dyn shopai_model::GeneratorModel>,
}

impl std::fmt::Debug for ModelGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGenerator")
            .field("model_id", &self.inner.model_id())
            .finish()
    }
}

impl ModelGenerator {
    pub fn new(model: Box<dyn shopai_model::GeneratorModel>) -> Self {
        Self { inner: model }
    }

    pub fn from_config(config: &GeneratorConfig) -> ShopResult<Self> {
        let model = shopai_model::create_generator_model(config).into_shop_result()?;
        Ok(Self::new(model))
    }
}

impl GeneratorBackend for ModelGenerator {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn generate(&self, prompt: &str) -> ShopResult<String> {
        self.inner.generate(prompt).into_shop_result()
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create the embedding backend. Failure is fatal for the caller.
pub fn create_embedding_backend(config: &EmbeddingConfig) -> ShopResult<Box<dyn EmbeddingBackend>> {
    let backend = ModelEmbeddingBackend::from_config(config)?;
    tracing::info!(
        "Embedding backend initialized: {} (dim {})",
        backend.model_id(),
        backend.dimension()
    );
    Ok(Box::new(backend))
}

/// Create the relevance scorer, or `None` when disabled or unavailable.
///
/// An unavailable reranker degrades fusion to keyword evidence only.
pub fn create_relevance_scorer(config: &RerankerConfig) -> Option<Box<dyn RelevanceScorer>> {
    if !config.enabled {
        tracing::info!("Reranker disabled in configuration");
        return None;
    }

    match ModelRerankerBackend::from_config(config) {
        Ok(backend) => {
            tracing::info!("Reranker backend initialized: {}", backend.model_id());
            Some(Box::new(backend))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize reranker (falling back to keyword evidence only): {}",
                e
            );
            None
        }
    }
}

/// Create the generator, or `None` when disabled or unavailable.
pub fn create_generator(config: &GeneratorConfig) -> Option<Box<dyn GeneratorBackend>> {
    if !config.enabled {
        tracing::debug!("Generator disabled in configuration");
        return None;
    }

    match ModelGenerator::from_config(config) {
        Ok(generator) => {
            tracing::info!("Generator initialized: {}", generator.model_id());
            Some(Box::new(generator))
        }
        Err(e) => {
            tracing::warn!("Failed to initialize generator (using template): {}", e);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
