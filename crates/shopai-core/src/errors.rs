//! Error types for shopai-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across shopai-core.
pub type ShopResult<T> = Result<T, ShopError>;

/// Domain-specific errors for shopai operations.
///
/// An empty recommendation is not an error; see
/// [`Recommendation::is_no_match`](crate::pipeline::Recommendation::is_no_match).
#[derive(Error, Debug)]
pub enum ShopError {
    /// Global configuration file is invalid.
    #[error("Global config invalid: {0}")]
    InvalidGlobalConfig(String),

    /// A configuration value is invalid.
    ///
    /// Used for validation errors detected at load time (e.g., neighborK=0).
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// Invalid argument provided to an operation.
    #[error("{0}")]
    InvalidArgument(String),

    // =========================================================================
    // Catalog Errors
    // =========================================================================
    /// The product catalog file does not exist.
    #[error("Product catalog not found at `{path}`")]
    CatalogNotFound {
        /// Expected location of the catalog.
        path: PathBuf,
    },

    /// The product catalog could not be parsed or is inconsistent.
    #[error("Product catalog at `{path}` is invalid: {message}")]
    CatalogInvalid {
        /// Location of the catalog.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// A product id was not found in the catalog.
    #[error("Product `{0}` not found in catalog")]
    ProductNotFound(String),

    // =========================================================================
    // Dictionary Errors
    // =========================================================================
    /// The match dictionary override could not be loaded.
    #[error("Match dictionary at `{path}` is invalid: {message}")]
    DictionaryInvalid {
        /// Location of the dictionary file.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    // =========================================================================
    // Model Errors
    // =========================================================================
    /// Embedding provider is unavailable or failed to load.
    #[error("Embedding provider `{provider}` is unavailable: {reason}")]
    EmbeddingProviderUnavailable {
        /// The provider or model that is unavailable.
        provider: String,
        /// Reason why the provider is unavailable.
        reason: String,
    },

    /// Encoding a query or product failed.
    #[error("Embedding failed for model `{model_id}`: {reason}")]
    EmbeddingFailed {
        /// The model identifier.
        model_id: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Reranker inference failed.
    #[error("Reranker inference failed for model `{model_id}`: {reason}")]
    RerankerInferenceFailed {
        /// The model identifier.
        model_id: String,
        /// Reason for the inference failure.
        reason: String,
    },

    /// Text generation failed or is unavailable.
    #[error("Generator `{model}` failed: {reason}")]
    GeneratorFailed {
        /// The generator model name.
        model: String,
        /// Reason for the failure.
        reason: String,
    },

    // =========================================================================
    // Index Errors
    // =========================================================================
    /// No embedding index exists at the configured location.
    #[error("Embedding index not found at `{path}`. Run `shopai build-index` first.")]
    IndexNotFound {
        /// The configured index directory.
        path: PathBuf,
    },

    /// The embedding index cannot serve the current configuration.
    #[error("Embedding index at `{path}` is incompatible: {reason}. Run `shopai build-index` to rebuild it.")]
    IndexIncompatible {
        /// The index directory.
        path: PathBuf,
        /// Reason for incompatibility.
        reason: String,
    },

    /// The embedding index files are unreadable or disagree with each other.
    #[error("Embedding index at `{path}` is corrupted: {message}")]
    IndexCorrupted {
        /// The index directory or file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Searching the embedding index failed.
    #[error("Index search failed: {0}")]
    IndexSearch(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A YAML serialization error occurred.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// An internal or unexpected error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShopError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create a catalog invalid error.
    pub fn catalog_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CatalogInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a dictionary invalid error.
    pub fn dictionary_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DictionaryInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error comes from a model capability call rather than
    /// from configuration or persisted state.
    ///
    /// The orchestrator degrades around these instead of aborting.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingProviderUnavailable { .. }
                | Self::EmbeddingFailed { .. }
                | Self::RerankerInferenceFailed { .. }
                | Self::GeneratorFailed { .. }
                | Self::IndexSearch(_)
        )
    }

    /// Short actionable hint for CLI error output, if one applies.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::InvalidConfiguration { hint, .. } => Some(hint.as_str()),
            Self::CatalogNotFound { .. } => {
                Some("Set data.catalogPath in ~/.shopai/config.yaml or pass --config")
            }
            Self::IndexNotFound { .. } | Self::IndexIncompatible { .. } => {
                Some("Run `shopai build-index` to (re)build the embedding index")
            }
            Self::IndexCorrupted { .. } => {
                Some("Delete the index directory and run `shopai build-index`")
            }
            Self::EmbeddingProviderUnavailable { .. } => {
                Some("Install the model under ~/.shopai/models or set $SHOPAI_MODELS_DIR")
            }
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_message_includes_hint() {
        let err = ShopError::invalid_configuration(
            "pipeline.neighborK cannot be 0",
            "Set neighborK to at least 1",
        );
        let msg = err.to_string();
        assert!(msg.contains("neighborK cannot be 0"));
        assert!(msg.contains("at least 1"));
        assert_eq!(err.hint(), Some("Set neighborK to at least 1"));
    }

    #[test]
    fn test_capability_failures_are_classified() {
        let embed = ShopError::EmbeddingFailed {
            model_id: "m".to_string(),
            reason: "boom".to_string(),
        };
        assert!(embed.is_capability_failure());

        let catalog = ShopError::CatalogNotFound {
            path: PathBuf::from("/missing.json"),
        };
        assert!(!catalog.is_capability_failure());
        assert!(catalog.hint().is_some());
    }
}
