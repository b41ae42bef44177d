//! Configuration types for shopai.
//!
//! This module provides the configuration structures used by the engine:
//! - [`GlobalConfig`]: user-level configuration stored in `~/.shopai/config.yaml`
//! - [`DataConfig`]: where the catalog, the embedding index and the optional
//!   dictionary override live
//! - [`PipelineConfig`] / [`FusionConfig`]: every tunable constant of the
//!   recommendation pipeline
//! - [`CartConfig`]: the non-personalized fallback for empty carts
//!
//! Model settings (`embedding`, `reranker`, `generator`) reuse the canonical
//! types from `shopai-model`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    CATALOG_FILENAME, DEFAULT_POPULAR_IDS, GLOBAL_CONFIG_FILENAME, INDEX_DIR, SHOPAI_HOME_DIR,
};
use crate::errors::ShopError;

pub use shopai_model::{DevicePreference, EmbeddingConfig, GeneratorConfig, RerankerConfig};

// ============================================================================
// GlobalConfig
// ============================================================================

/// Global (user-level) configuration for shopai.
///
/// Every field has a default, so a missing file yields a working setup.
///
/// # Example YAML
///
/// ```yaml
/// device: cpu
/// data:
///   catalogPath: ~/.shopai/products.json
/// reranker:
///   modelId: BAAI/bge-reranker-base
/// generator:
///   enabled: true
///   model: qwen2.5:1.5b
/// pipeline:
///   neighborK: 20
///   fusion:
///     weakThreshold: 0.7
/// cart:
///   popularIds: [ELEC001, SPORTS001, BOOK001]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Device preference for model inference (auto/gpu/cpu).
    #[serde(default)]
    pub device: DevicePreference,

    /// Data file locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Bi-encoder used for retrieval and index building.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Cross-encoder used by the fusion reranker.
    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Optional generative response path.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Pipeline tunables.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Cart recommendation settings.
    #[serde(default)]
    pub cart: CartConfig,
}

impl GlobalConfig {
    /// Load the global configuration from the default location (`~/.shopai/config.yaml`).
    ///
    /// If the file does not exist, returns a default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, ShopError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load the global configuration from a specific path.
    ///
    /// If the file does not exist, returns a default configuration. Relative
    /// data paths in the file are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    /// Returns [`ShopError::InvalidConfiguration`] if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, ShopError> {
        if !path.exists() {
            tracing::debug!(
                "Global config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ShopError::InvalidGlobalConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config: Self = serde_yaml::from_str(&content).map_err(|e| {
            ShopError::InvalidGlobalConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        if let Some(base) = path.parent() {
            config.data.resolve_relative_to(base);
        }

        let warnings = config.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Get the default global config directory (`~/.shopai`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(SHOPAI_HOME_DIR))
    }

    /// Get the default global config file path (`~/.shopai/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(GLOBAL_CONFIG_FILENAME))
    }

    /// Create a default configuration suitable for testing.
    ///
    /// Models are disabled so nothing touches the filesystem or a server.
    pub fn default_for_testing() -> Self {
        let mut config = Self::default();
        config.reranker.enabled = false;
        config.generator.enabled = false;
        config
    }

    /// Override the device preference for every model section.
    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    /// Embedding config with the global device applied.
    pub fn resolved_embedding_config(&self) -> EmbeddingConfig {
        let mut config = self.embedding.clone();
        config.device = self.device;
        config
    }

    /// Reranker config with the global device applied.
    pub fn resolved_reranker_config(&self) -> RerankerConfig {
        let mut config = self.reranker.clone();
        config.device = self.device;
        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first critical error encountered as
    /// `ShopError::InvalidConfiguration`.
    ///
    /// # Warnings
    ///
    /// Non-fatal issues are collected and returned as a list of warning strings.
    /// Callers should log these warnings but can proceed with the configuration.
    pub fn validate(&self) -> Result<Vec<String>, ShopError> {
        let mut all_warnings = Vec::new();

        all_warnings.extend(validate_embedding(&self.embedding)?);
        all_warnings.extend(validate_generator(&self.generator)?);
        all_warnings.extend(self.pipeline.validate()?);
        all_warnings.extend(self.cart.validate()?);

        Ok(all_warnings)
    }
}

// ============================================================================
// DataConfig
// ============================================================================

/// Locations of the catalog, the embedding index and the dictionary override.
///
/// Unset paths fall back to `~/.shopai/products.json` and `~/.shopai/index`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    /// Product catalog (JSON array).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Embedding index directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_dir: Option<PathBuf>,

    /// YAML replacement for the built-in match dictionary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_path: Option<PathBuf>,
}

impl DataConfig {
    /// Effective catalog path.
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| home_relative(CATALOG_FILENAME))
    }

    /// Effective index directory.
    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| home_relative(INDEX_DIR))
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.catalog_path,
            &mut self.index_dir,
            &mut self.dictionary_path,
        ]
        .into_iter()
        .flatten()
        {
            if let Some(expanded) = expand_tilde(path.as_path()) {
                *path = expanded;
            } else if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

fn home_relative(name: &str) -> PathBuf {
    GlobalConfig::default_dir()
        .unwrap_or_else(|| PathBuf::from(SHOPAI_HOME_DIR))
        .join(name)
}

fn expand_tilde(path: &Path) -> Option<PathBuf> {
    let rest = path.strip_prefix("~").ok()?;
    dirs::home_dir().map(|home| home.join(rest))
}

// ============================================================================
// PipelineConfig
// ============================================================================

/// Tunable constants of the recommendation pipeline.
///
/// The defaults are the empirically tuned values the shop was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Fixed score of keyword matches, also their distance when merged
    /// with vector candidates.
    #[serde(default = "default_keyword_score")]
    pub keyword_score: f32,

    /// Nearest neighbors fetched per expanded query (capped by index size).
    #[serde(default = "default_neighbor_k")]
    pub neighbor_k: usize,

    /// Maximum number of expanded queries, original included.
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,

    /// Distance subtracted from candidates of the detected category.
    #[serde(default = "default_category_boost")]
    pub category_boost: f32,

    /// Other-category candidates are kept only below this raw distance.
    #[serde(default = "default_cross_category_threshold")]
    pub cross_category_threshold: f32,

    /// Lexical bonus per query token found in name or description.
    #[serde(default = "default_lexical_token_weight")]
    pub lexical_token_weight: f32,

    /// Lexical bonus when any query token is in the name.
    #[serde(default = "default_lexical_name_bonus")]
    pub lexical_name_bonus: f32,

    /// Candidates kept after lexical re-scoring.
    #[serde(default = "default_lexical_top_k")]
    pub lexical_top_k: usize,

    /// Fusion reranker settings.
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Size of the last-matched fallback list.
    #[serde(default = "default_last_matched_k")]
    pub last_matched_k: usize,

    /// Answer "no match" when the keyword matcher finds nothing.
    #[serde(default)]
    pub require_keyword_match: bool,

    /// Skip vector retrieval when at least this many keyword matches exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_skip_threshold: Option<usize>,
}

fn default_keyword_score() -> f32 {
    0.5
}
fn default_neighbor_k() -> usize {
    20
}
fn default_max_expansions() -> usize {
    5
}
fn default_category_boost() -> f32 {
    0.2
}
fn default_cross_category_threshold() -> f32 {
    0.3
}
fn default_lexical_token_weight() -> f32 {
    0.1
}
fn default_lexical_name_bonus() -> f32 {
    0.2
}
fn default_lexical_top_k() -> usize {
    10
}
fn default_last_matched_k() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keyword_score: default_keyword_score(),
            neighbor_k: default_neighbor_k(),
            max_expansions: default_max_expansions(),
            category_boost: default_category_boost(),
            cross_category_threshold: default_cross_category_threshold(),
            lexical_token_weight: default_lexical_token_weight(),
            lexical_name_bonus: default_lexical_name_bonus(),
            lexical_top_k: default_lexical_top_k(),
            fusion: FusionConfig::default(),
            last_matched_k: default_last_matched_k(),
            require_keyword_match: false,
            retrieval_skip_threshold: None,
        }
    }
}

impl PipelineConfig {
    /// Validate the pipeline configuration.
    ///
    /// Returns a list of warnings for non-fatal issues.
    pub fn validate(&self) -> Result<Vec<String>, ShopError> {
        let mut warnings = Vec::new();

        if self.neighbor_k == 0 {
            return Err(ShopError::invalid_configuration(
                "pipeline.neighborK cannot be 0",
                "Set neighborK to at least 1 (default: 20)",
            ));
        }

        if self.max_expansions == 0 {
            return Err(ShopError::invalid_configuration(
                "pipeline.maxExpansions cannot be 0",
                "The original query always counts as one expansion; use at least 1 (default: 5)",
            ));
        }

        if self.lexical_top_k == 0 {
            return Err(ShopError::invalid_configuration(
                "pipeline.lexicalTopK cannot be 0",
                "Set lexicalTopK to at least 1 (default: 10)",
            ));
        }

        if !self.cross_category_threshold.is_finite() || !self.category_boost.is_finite() {
            return Err(ShopError::invalid_configuration(
                "pipeline.categoryBoost and pipeline.crossCategoryThreshold must be finite",
                "Use the defaults 0.2 and 0.3",
            ));
        }

        warnings.extend(self.fusion.validate()?);

        if self.lexical_top_k < self.fusion.final_k {
            warnings.push(format!(
                "pipeline.lexicalTopK ({}) < fusion.finalK ({}); at most {} products can be recommended",
                self.lexical_top_k, self.fusion.final_k, self.lexical_top_k
            ));
        }

        if self.neighbor_k > 1000 {
            warnings.push(format!(
                "pipeline.neighborK ({}) is very large; this may impact performance",
                self.neighbor_k
            ));
        }

        if self.category_boost < 0.0 {
            warnings.push(format!(
                "pipeline.categoryBoost ({}) is negative; same-category products will be pushed down",
                self.category_boost
            ));
        }

        if self.last_matched_k == 0 {
            warnings.push("pipeline.lastMatchedK is 0; no fallback products will be reported".to_string());
        }

        if self.retrieval_skip_threshold == Some(0) {
            warnings.push(
                "pipeline.retrievalSkipThreshold is 0; vector retrieval will never run".to_string(),
            );
        }

        Ok(warnings)
    }
}

// ============================================================================
// FusionConfig
// ============================================================================

/// Fusion reranker weights and acceptance thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionConfig {
    /// Keyword weight when a query token is in the product name.
    #[serde(default = "default_name_weight")]
    pub name_weight: f32,

    /// Keyword weight when a query token is only in the description.
    #[serde(default = "default_description_weight")]
    pub description_weight: f32,

    /// Keyword weight per token mapping to the product's category.
    #[serde(default = "default_category_weight")]
    pub category_weight: f32,

    /// Reject everything when the top candidate has no keyword evidence and
    /// scores below this.
    #[serde(default = "default_reject_epsilon")]
    pub reject_epsilon: f32,

    /// Keyword weight above which a candidate counts as strongly evidenced.
    #[serde(default = "default_strong_evidence_weight")]
    pub strong_evidence_weight: f32,

    /// Minimum score ratio to the top for strongly evidenced candidates.
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f32,

    /// Minimum score ratio to the top for the rest.
    #[serde(default = "default_weak_threshold")]
    pub weak_threshold: f32,

    /// Products returned at most.
    #[serde(default = "default_final_k")]
    pub final_k: usize,

    /// Drop off-intent candidates lacking strong keyword evidence.
    #[serde(default)]
    pub relevance_gate: bool,
}

fn default_name_weight() -> f32 {
    0.3
}
fn default_description_weight() -> f32 {
    0.2
}
fn default_category_weight() -> f32 {
    0.1
}
fn default_reject_epsilon() -> f32 {
    0.005
}
fn default_strong_evidence_weight() -> f32 {
    0.1
}
fn default_strong_threshold() -> f32 {
    0.3
}
fn default_weak_threshold() -> f32 {
    0.7
}
fn default_final_k() -> usize {
    3
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            name_weight: default_name_weight(),
            description_weight: default_description_weight(),
            category_weight: default_category_weight(),
            reject_epsilon: default_reject_epsilon(),
            strong_evidence_weight: default_strong_evidence_weight(),
            strong_threshold: default_strong_threshold(),
            weak_threshold: default_weak_threshold(),
            final_k: default_final_k(),
            relevance_gate: false,
        }
    }
}

impl FusionConfig {
    /// Validate the fusion configuration.
    pub fn validate(&self) -> Result<Vec<String>, ShopError> {
        let mut warnings = Vec::new();

        if self.final_k == 0 {
            return Err(ShopError::invalid_configuration(
                "pipeline.fusion.finalK cannot be 0",
                "Set finalK to at least 1 (default: 3)",
            ));
        }

        for (name, value) in [
            ("strongThreshold", self.strong_threshold),
            ("weakThreshold", self.weak_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ShopError::invalid_configuration(
                    format!("pipeline.fusion.{} ({}) must be within [0, 1]", name, value),
                    "Thresholds are ratios to the top score",
                ));
            }
        }

        if self.weak_threshold < self.strong_threshold {
            return Err(ShopError::invalid_configuration(
                format!(
                    "pipeline.fusion.weakThreshold ({}) is below strongThreshold ({})",
                    self.weak_threshold, self.strong_threshold
                ),
                "Candidates without keyword evidence must clear the higher bar; swap the values",
            ));
        }

        if self.reject_epsilon < 0.0 {
            warnings.push(format!(
                "pipeline.fusion.rejectEpsilon ({}) is negative; the reject-all rule is disabled",
                self.reject_epsilon
            ));
        }

        if self.name_weight < self.description_weight {
            warnings.push(format!(
                "pipeline.fusion.nameWeight ({}) < descriptionWeight ({}); name matches rank below description matches",
                self.name_weight, self.description_weight
            ));
        }

        if self.final_k > 10 {
            warnings.push(format!(
                "pipeline.fusion.finalK ({}) is large for a chat answer",
                self.final_k
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// CartConfig
// ============================================================================

/// Cart recommendation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartConfig {
    /// Ids recommended when the cart has no known products.
    #[serde(default = "default_popular_ids")]
    pub popular_ids: Vec<String>,
}

fn default_popular_ids() -> Vec<String> {
    DEFAULT_POPULAR_IDS.iter().map(|s| s.to_string()).collect()
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            popular_ids: default_popular_ids(),
        }
    }
}

impl CartConfig {
    /// Validate the cart configuration.
    pub fn validate(&self) -> Result<Vec<String>, ShopError> {
        let mut warnings = Vec::new();
        if self.popular_ids.is_empty() {
            warnings.push("cart.popularIds is empty; empty carts get no recommendation".to_string());
        }
        Ok(warnings)
    }
}

// ============================================================================
// Model section validation
// ============================================================================

/// Validate the embedding section.
pub fn validate_embedding(config: &EmbeddingConfig) -> Result<Vec<String>, ShopError> {
    let mut warnings = Vec::new();

    if config.batch_size == 0 {
        return Err(ShopError::invalid_configuration(
            "embedding.batchSize cannot be 0",
            "Set batchSize to at least 1 (recommended: 16-64)",
        ));
    }

    if config.model_id.trim().is_empty() {
        return Err(ShopError::invalid_configuration(
            "embedding.modelId cannot be empty",
            format!("Use the default: {}", shopai_model::DEFAULT_EMBEDDING_MODEL_ID),
        ));
    }

    if config.batch_size > 512 {
        warnings.push(format!(
            "embedding.batchSize ({}) is very large; this may cause memory issues",
            config.batch_size
        ));
    }

    Ok(warnings)
}

/// Validate the generator section.
pub fn validate_generator(config: &GeneratorConfig) -> Result<Vec<String>, ShopError> {
    let mut warnings = Vec::new();

    if !config.enabled {
        return Ok(warnings);
    }

    if config.timeout_secs == 0 {
        return Err(ShopError::invalid_configuration(
            "generator.timeoutSecs cannot be 0",
            "Set timeoutSecs to at least 1 (default: 60)",
        ));
    }

    if config.endpoint.trim().is_empty() {
        return Err(ShopError::invalid_configuration(
            "generator.endpoint cannot be empty",
            format!("Use the default: {}", shopai_model::DEFAULT_GENERATOR_ENDPOINT),
        ));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        warnings.push(format!(
            "generator.temperature ({}) is outside the usual range [0, 2]",
            config.temperature
        ));
    }

    Ok(warnings)
}

// ============================================================================
// Tests
// ============================================================================
