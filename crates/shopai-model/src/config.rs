//! Configuration types for shopai-model.
//!
//! These are the canonical model settings. `shopai-core` embeds them directly
//! in its global configuration instead of defining duplicates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model_locator::{extract_model_name, ModelLocator, EMBEDDINGS_SUBDIR, RERANKERS_SUBDIR};
use crate::{
    DEFAULT_EMBEDDING_MODEL_ID, DEFAULT_GENERATOR_ENDPOINT, DEFAULT_GENERATOR_MODEL,
    DEFAULT_RERANKER_MODEL_ID,
};

// ============================================================================
// DevicePreference
// ============================================================================

/// Preference for compute device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Auto-select best device (GPU if available, else CPU).
    #[default]
    Auto,
    /// Force GPU (Metal on macOS, CUDA on Linux).
    Gpu,
    /// Force CPU only.
    Cpu,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu" | "metal" | "cuda" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            _ => Err(format!(
                "Unknown device: '{}'. Use 'auto', 'gpu', or 'cpu'.",
                s
            )),
        }
    }
}

// ============================================================================
// ModelArchitecture
// ============================================================================

/// Transformer family of a checkpoint, read from its `config.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelArchitecture {
    #[default]
    Bert,
    /// XLM-RoBERTa (and RoBERTa-shaped checkpoints such as bge-reranker).
    Roberta,
    Unknown,
}

impl std::fmt::Display for ModelArchitecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bert => write!(f, "bert"),
            Self::Roberta => write!(f, "roberta"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// ModelInfo
// ============================================================================

/// Information about a loaded model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub model_id: String,
    /// Embedding dimension.
    pub dimension: usize,
    /// Maximum sequence length.
    pub max_seq_len: usize,
    /// Model architecture.
    #[serde(default)]
    pub architecture: ModelArchitecture,
}

impl ModelInfo {
    /// Create new model info.
    pub fn new(model_id: impl Into<String>, dimension: usize, max_seq_len: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            max_seq_len,
            architecture: ModelArchitecture::default(),
        }
    }

    /// Set architecture.
    pub fn with_architecture(mut self, arch: ModelArchitecture) -> Self {
        self.architecture = arch;
        self
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Configuration for the bi-encoder that embeds queries and products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Model ID (Hugging Face id or short name).
    #[serde(default = "default_embedding_model_id")]
    pub model_id: String,

    /// Device preference. Overridden by the global `device` setting.
    #[serde(default, skip_serializing)]
    pub device: DevicePreference,

    /// Local path to model files. If None, the model locator is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,

    /// Maximum sequence length.
    #[serde(default = "default_max_seq_len")]
    pub max_sequence_length: usize,

    /// Batch size used when embedding the catalog.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL_ID.to_string()
}

fn default_max_seq_len() -> usize {
    512
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_embedding_model_id(),
            device: DevicePreference::default(),
            local_path: None,
            max_sequence_length: default_max_seq_len(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the effective model path.
    ///
    /// An explicit `local_path` wins; otherwise the locator search order is
    /// used. Returns the path even if it doesn't exist (caller validates).
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.local_path {
            return path.clone();
        }

        ModelLocator::new()
            .embedding_model_path(&self.model_id)
            .unwrap_or_else(|_| fallback_model_path(EMBEDDINGS_SUBDIR, &self.model_id))
    }

    /// Create a config with a specific local path.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Create a config with a specific model ID.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

// ============================================================================
// RerankerConfig
// ============================================================================

/// Transform applied to raw cross-encoder logits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreActivation {
    /// Squash logits into (0, 1), as single-label cross-encoders are trained.
    #[default]
    Sigmoid,
    /// Report raw logits.
    Identity,
}

impl ScoreActivation {
    pub fn apply(&self, logit: f32) -> f32 {
        match self {
            ScoreActivation::Sigmoid => 1.0 / (1.0 + (-logit).exp()),
            ScoreActivation::Identity => logit,
        }
    }
}

/// Configuration for the cross-encoder used by the fusion reranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankerConfig {
    /// Whether pairwise relevance scoring is enabled. When disabled every
    /// candidate's cross score is 0 and ranking rests on keyword evidence.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model ID (Hugging Face id or short name).
    #[serde(default = "default_reranker_model_id")]
    pub model_id: String,

    /// Device preference. Overridden by the global `device` setting.
    #[serde(default, skip_serializing)]
    pub device: DevicePreference,

    /// Local path to model files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,

    /// Activation applied to logits.
    #[serde(default)]
    pub activation: ScoreActivation,

    /// Maximum tokens per query/document pair.
    #[serde(default = "default_max_seq_len")]
    pub max_sequence_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_reranker_model_id() -> String {
    DEFAULT_RERANKER_MODEL_ID.to_string()
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_id: default_reranker_model_id(),
            device: DevicePreference::default(),
            local_path: None,
            activation: ScoreActivation::default(),
            max_sequence_length: default_max_seq_len(),
        }
    }
}

impl RerankerConfig {
    /// Resolve the effective model path, see [`EmbeddingConfig::effective_model_path`].
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.local_path {
            return path.clone();
        }

        ModelLocator::new()
            .reranker_model_path(&self.model_id)
            .unwrap_or_else(|_| fallback_model_path(RERANKERS_SUBDIR, &self.model_id))
    }

    /// Create a config with a specific local path.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Create a config with a specific model ID.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

fn fallback_model_path(subdir: &str, model_id: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shopai")
        .join("models")
        .join(subdir)
        .join(extract_model_name(model_id))
}

// ============================================================================
// GeneratorConfig
// ============================================================================

/// Text generation provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorProviderKind {
    /// Ollama HTTP API.
    #[default]
    Ollama,
}

impl std::fmt::Display for GeneratorProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Configuration for the optional generative response path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Whether responses are generated. When false, the templated composer
    /// is used.
    #[serde(default)]
    pub enabled: bool,

    /// Provider type.
    #[serde(default)]
    pub provider: GeneratorProviderKind,

    /// Provider base URL.
    #[serde(default = "default_generator_endpoint")]
    pub endpoint: String,

    /// Model name as known to the provider.
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generator_endpoint() -> String {
    DEFAULT_GENERATOR_ENDPOINT.to_string()
}

fn default_generator_model() -> String {
    DEFAULT_GENERATOR_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    256
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: GeneratorProviderKind::default(),
            endpoint: default_generator_endpoint(),
            model: default_generator_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// HuggingFaceModelConfig
// ============================================================================

/// Subset of a Hugging Face `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceModelConfig {
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub hidden_size: usize,
    #[serde(default = "default_max_position")]
    pub max_position_embeddings: usize,
    #[serde(default)]
    pub model_type: String,
}

fn default_max_position() -> usize {
    512
}

impl HuggingFaceModelConfig {
    /// Infer architecture from config.
    pub fn infer_architecture(&self) -> ModelArchitecture {
        for arch in &self.architectures {
            let lower = arch.to_lowercase();
            if lower.contains("roberta") {
                return ModelArchitecture::Roberta;
            }
            if lower.contains("bert") {
                return ModelArchitecture::Bert;
            }
        }

        match self.model_type.to_lowercase().as_str() {
            "bert" => ModelArchitecture::Bert,
            "roberta" | "xlm-roberta" => ModelArchitecture::Roberta,
            _ => ModelArchitecture::Unknown,
        }
    }

    /// Position embeddings usable for input tokens. RoBERTa-family models
    /// reserve two positions for the padding offset.
    pub fn usable_positions(&self) -> usize {
        match self.infer_architecture() {
            ModelArchitecture::Roberta => self.max_position_embeddings.saturating_sub(2),
            _ => self.max_position_embeddings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_preference_parsing() {
        assert_eq!(
            "auto".parse::<DevicePreference>().unwrap(),
            DevicePreference::Auto
        );
        assert_eq!(
            "metal".parse::<DevicePreference>().unwrap(),
            DevicePreference::Gpu
        );
        assert_eq!(
            "CPU".parse::<DevicePreference>().unwrap(),
            DevicePreference::Cpu
        );
        assert!("tpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_embedding_config_default() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.model_id, DEFAULT_EMBEDDING_MODEL_ID);
        assert_eq!(config.batch_size, 32);
    }

    #[test]
    fn test_reranker_config_camel_case_yaml_keys() {
        let config: RerankerConfig =
            serde_json::from_str(r#"{"modelId":"x/y","activation":"identity"}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.model_id, "x/y");
        assert_eq!(config.activation, ScoreActivation::Identity);
    }

    #[test]
    fn test_generator_config_default() {
        let config = GeneratorConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.max_tokens, 256);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sigmoid_activation() {
        assert!((ScoreActivation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-6);
        assert!(ScoreActivation::Sigmoid.apply(-20.0) < 0.005);
        assert_eq!(ScoreActivation::Identity.apply(-3.0), -3.0);
    }

    #[test]
    fn test_hf_config_infer_architecture() {
        let config = HuggingFaceModelConfig {
            architectures: vec!["BertModel".to_string()],
            hidden_size: 384,
            max_position_embeddings: 512,
            model_type: "bert".to_string(),
        };
        assert_eq!(config.infer_architecture(), ModelArchitecture::Bert);
        assert_eq!(config.usable_positions(), 512);

        let xlmr = HuggingFaceModelConfig {
            architectures: vec!["XLMRobertaForSequenceClassification".to_string()],
            max_position_embeddings: 514,
            model_type: "xlm-roberta".to_string(),
            ..config.clone()
        };
        assert_eq!(xlmr.infer_architecture(), ModelArchitecture::Roberta);
        assert_eq!(xlmr.usable_positions(), 512);
    }
}
