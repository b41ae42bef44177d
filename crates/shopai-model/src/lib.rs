//! # shopai-model
//!
//! ML inference layer for shopai: the three external model capabilities the
//! recommendation pipeline consumes.
//!
//! - **Embedding models**: bi-encoders turning queries and product texts into
//!   vectors for nearest-neighbor retrieval
//! - **Reranker models**: cross-encoders scoring `(query, product)` pairs
//! - **Generator models**: optional LLM that writes the recommendation text
//! - **Model locator**: runtime path resolution for installed weights
//!
//! ## Design Principles
//!
//! 1. **Production-only**: no mock implementations. Test doubles live in
//!    consuming crates.
//! 2. **Local-first**: embedding and reranking run in-process with Candle.
//! 3. **Provider-agnostic**: traits don't leak Candle or HTTP internals.
//!
//! ## Features
//!
//! - `embedded` (default): local Candle inference with disk-based models
//! - `ollama`: text generation via an Ollama server
//! - `metal` / `cuda`: GPU acceleration
//!
//! ## Usage
//!
//! ```ignore
//! use shopai_model::{EmbeddingModel, create_embedding_model, EmbeddingConfig};
//!
//! let model = create_embedding_model(&EmbeddingConfig::default())?;
//! let embeddings = model.embed(&["蓝牙耳机"])?;
//! assert_eq!(embeddings[0].len(), model.dimension());
//! ```

pub mod config;
pub mod error;
pub mod model_locator;

#[cfg(feature = "embedded")]
mod device;

#[cfg(feature = "embedded")]
mod embedding;

#[cfg(feature = "embedded")]
mod reranker;

#[cfg(feature = "ollama")]
mod ollama;

// Re-export error types
pub use error::{ModelError, ModelResult};

// Re-export config types (canonical source of truth)
pub use config::{
    DevicePreference, EmbeddingConfig, GeneratorConfig, GeneratorProviderKind,
    HuggingFaceModelConfig, ModelArchitecture, ModelInfo, RerankerConfig, ScoreActivation,
};

// Re-export model locator
pub use model_locator::{
    ModelLocator, EMBEDDINGS_SUBDIR, REQUIRED_MODEL_FILES, RERANKERS_SUBDIR,
    SHOPAI_MODELS_DIR_ENV,
};

/// Multilingual sentence-transformers checkpoint (BERT, 384 dims).
pub const DEFAULT_EMBEDDING_MODEL_ID: &str =
    "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Multilingual cross-encoder (XLM-RoBERTa).
pub const DEFAULT_RERANKER_MODEL_ID: &str = "BAAI/bge-reranker-base";

pub const DEFAULT_GENERATOR_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_GENERATOR_MODEL: &str = "qwen2.5:1.5b";

// ============================================================================
// Embedding Model Trait
// ============================================================================

/// Trait for embedding models (bi-encoders).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; they may serialize inference
/// internally.
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Generate embeddings for a batch of texts, one vector of length
    /// `dimension()` per input.
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>>;

    /// Generate embeddings for owned strings.
    fn embed_batch(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        self.embed(&refs)
    }

    /// Warm up the model by running a dummy inference.
    fn warm_up(&self) -> ModelResult<()> {
        let _ = self.embed(&["warmup"])?;
        Ok(())
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the maximum sequence length supported.
    fn max_sequence_length(&self) -> usize;

    /// Get model information (ID, dimension, architecture).
    fn model_info(&self) -> &ModelInfo;

    /// Get the model ID.
    fn model_id(&self) -> &str {
        &self.model_info().model_id
    }
}

// ============================================================================
// Reranker Model Trait
// ============================================================================

/// Trait for reranker models (cross-encoders).
///
/// Higher scores indicate more relevant documents.
pub trait RerankerModel: Send + Sync + std::fmt::Debug {
    /// Score documents against a query, in document order.
    fn score_batch(&self, query: &str, documents: &[String]) -> ModelResult<Vec<f32>>;

    /// Warm up the model.
    fn warm_up(&self) -> ModelResult<()> {
        let _ = self.score_batch("warmup", &["warmup doc".to_string()])?;
        Ok(())
    }

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

// ============================================================================
// Generator Model Trait
// ============================================================================

/// Trait for generative text models.
pub trait GeneratorModel: Send + Sync + std::fmt::Debug {
    /// Complete a prompt, returning the trimmed output.
    fn generate(&self, prompt: &str) -> ModelResult<String>;

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create an embedding model from configuration.
#[cfg(feature = "embedded")]
pub fn create_embedding_model(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    let model = embedding::CandleEmbeddingModel::new(config)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "embedded"))]
pub fn create_embedding_model(_config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "candle".to_string(),
        reason: "No embedding providers available. Enable the 'embedded' feature.".to_string(),
    })
}

/// Create a reranker model from configuration.
#[cfg(feature = "embedded")]
pub fn create_reranker_model(config: &RerankerConfig) -> ModelResult<Box<dyn RerankerModel>> {
    let model = reranker::CandleRerankerModel::new(config)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "embedded"))]
pub fn create_reranker_model(_config: &RerankerConfig) -> ModelResult<Box<dyn RerankerModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "candle".to_string(),
        reason: "No reranker providers available. Enable the 'embedded' feature.".to_string(),
    })
}

/// Create a generator from configuration.
#[cfg(feature = "ollama")]
pub fn create_generator_model(config: &GeneratorConfig) -> ModelResult<Box<dyn GeneratorModel>> {
    match config.provider {
        GeneratorProviderKind::Ollama => Ok(Box::new(ollama::OllamaGenerator::new(config)?)),
    }
}

#[cfg(not(feature = "ollama"))]
pub fn create_generator_model(config: &GeneratorConfig) -> ModelResult<Box<dyn GeneratorModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: config.provider.to_string(),
        reason: "Text generation is not compiled in. Enable the 'ollama' feature.".to_string(),
    })
}

// ============================================================================
// Re-export implementations (feature-gated)
// ============================================================================

#[cfg(feature = "embedded")]
pub use embedding::CandleEmbeddingModel;

#[cfg(feature = "embedded")]
pub use reranker::CandleRerankerModel;

#[cfg(feature = "ollama")]
pub use ollama::OllamaGenerator;
