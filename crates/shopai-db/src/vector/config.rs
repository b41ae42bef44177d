//! Index configuration and on-disk metadata.

use super::traits::VectorMetric;
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Default backend name.
pub const DEFAULT_BACKEND: &str = "flat";

/// Filename for index metadata.
pub const INDEX_META_FILENAME: &str = "index.meta.json";

/// Filename for the JSONL vector rows.
pub const VECTORS_FILENAME: &str = "vectors.jsonl";

/// Filename for the positional product id list.
pub const ID_MAP_FILENAME: &str = "index_to_id.json";

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;

// ============================================================================
// IndexConfig
// ============================================================================

/// Configuration for building or opening an embedding index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexConfig {
    /// Dimension of vectors in the index.
    pub dimension: usize,

    /// Path to the index directory.
    pub path: PathBuf,

    /// Backend to use.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Distance metric for search.
    #[serde(default)]
    pub metric: VectorMetric,

    /// Embedding model the vectors were produced with. When set, opening an
    /// index built by a different model fails.
    #[serde(default)]
    pub model_id: Option<String>,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

impl IndexConfig {
    /// Create a new config with required fields.
    pub fn new(dimension: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            path: path.into(),
            backend: DEFAULT_BACKEND.to_string(),
            metric: VectorMetric::L2,
            model_id: None,
        }
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: VectorMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Pin the embedding model id.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

// ============================================================================
// IndexMeta
// ============================================================================

/// Metadata for a persisted index, stored in `index.meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMeta {
    /// Backend used for this index.
    pub backend: String,

    /// Dimension of vectors.
    pub dimension: usize,

    /// Distance metric.
    pub metric: VectorMetric,

    /// Number of vectors.
    #[serde(default)]
    pub count: usize,

    /// Embedding model that produced the vectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Schema version for future migrations.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update timestamp (RFC 3339).
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl IndexMeta {
    /// Create new metadata.
    pub fn new(backend: impl Into<String>, dimension: usize, metric: VectorMetric) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            backend: backend.into(),
            dimension,
            metric,
            count: 0,
            model_id: None,
            schema_version: SCHEMA_VERSION,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }
    }

    /// Create metadata matching a config.
    pub fn for_config(config: &IndexConfig) -> Self {
        let mut meta = Self::new(&config.backend, config.dimension, config.metric);
        meta.model_id = config.model_id.clone();
        meta
    }

    /// Update the count and timestamp.
    pub fn update_count(&mut self, count: usize) {
        self.count = count;
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

// ============================================================================
// IndexCompatibility
// ============================================================================

/// Result of checking an existing index against a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCompatibility {
    /// Index is compatible and can be opened.
    Compatible,

    /// No index at the configured path.
    NotFound,

    /// Index exists but has a different dimension.
    IncompatibleDimension { expected: usize, actual: usize },

    /// Index exists but uses a different backend.
    IncompatibleBackend { expected: String, actual: String },

    /// Index exists but uses a different metric.
    IncompatibleMetric {
        expected: VectorMetric,
        actual: VectorMetric,
    },

    /// Index was built with a different embedding model.
    IncompatibleModel {
        expected: String,
        actual: Option<String>,
    },

    /// Index metadata is unreadable or from a newer schema.
    Corrupted(String),
}

impl IndexCompatibility {
    /// Check if the index is compatible.
    pub fn is_compatible(&self) -> bool {
        matches!(self, IndexCompatibility::Compatible)
    }

    /// Check if the index doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexCompatibility::NotFound)
    }

    /// Human-readable reason, `None` when compatible.
    pub fn reason(&self) -> Option<String> {
        match self {
            IndexCompatibility::Compatible => None,
            IndexCompatibility::NotFound => Some("index not found".to_string()),
            IndexCompatibility::IncompatibleDimension { expected, actual } => Some(format!(
                "dimension mismatch: expected {}, found {}",
                expected, actual
            )),
            IndexCompatibility::IncompatibleBackend { expected, actual } => Some(format!(
                "backend mismatch: expected '{}', found '{}'",
                expected, actual
            )),
            IndexCompatibility::IncompatibleMetric { expected, actual } => Some(format!(
                "metric mismatch: expected '{}', found '{}'",
                expected, actual
            )),
            IndexCompatibility::IncompatibleModel { expected, actual } => Some(format!(
                "embedding model mismatch: expected '{}', found '{}'",
                expected,
                actual.as_deref().unwrap_or("<unknown>")
            )),
            IndexCompatibility::Corrupted(msg) => Some(format!("index corrupted: {}", msg)),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Check if an existing index is compatible with the given config.
///
/// The dimension is only checked when the config carries a non-zero one, so
/// callers that do not know the model dimension yet can pass 0.
pub fn check_index_compatibility(config: &IndexConfig) -> IndexCompatibility {
    let meta_path = config.path.join(INDEX_META_FILENAME);

    if !meta_path.exists() {
        if config.path.join(VECTORS_FILENAME).exists() {
            return IndexCompatibility::Corrupted(
                "Index directory has vectors but no metadata".to_string(),
            );
        }
        return IndexCompatibility::NotFound;
    }

    let meta = match load_index_meta(&config.path) {
        Ok(meta) => meta,
        Err(e) => return IndexCompatibility::Corrupted(e.to_string()),
    };

    if meta.schema_version > SCHEMA_VERSION {
        return IndexCompatibility::Corrupted(format!(
            "schema version {} is newer than supported version {}",
            meta.schema_version, SCHEMA_VERSION
        ));
    }

    if config.dimension != 0 && meta.dimension != config.dimension {
        return IndexCompatibility::IncompatibleDimension {
            expected: config.dimension,
            actual: meta.dimension,
        };
    }

    if meta.backend != config.backend {
        return IndexCompatibility::IncompatibleBackend {
            expected: config.backend.clone(),
            actual: meta.backend,
        };
    }

    if meta.metric != config.metric {
        return IndexCompatibility::IncompatibleMetric {
            expected: config.metric,
            actual: meta.metric,
        };
    }

    if let Some(expected) = &config.model_id {
        if meta.model_id.as_deref() != Some(expected.as_str()) {
            return IndexCompatibility::IncompatibleModel {
                expected: expected.clone(),
                actual: meta.model_id,
            };
        }
    }

    IndexCompatibility::Compatible
}

/// Load index metadata from a directory.
pub fn load_index_meta(path: &Path) -> DbResult<IndexMeta> {
    let meta_path = path.join(INDEX_META_FILENAME);
    debug!("Loading index metadata from {:?}", meta_path);

    let content = fs::read_to_string(&meta_path).map_err(|e| {
        DbError::vector_io(&meta_path, format!("Failed to read index metadata: {}", e))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        DbError::vector_parse(&meta_path, format!("Failed to parse index metadata: {}", e))
    })
}

/// Write index metadata to a directory.
pub fn write_index_meta(path: &Path, meta: &IndexMeta) -> DbResult<()> {
    let meta_path = path.join(INDEX_META_FILENAME);
    debug!("Writing index metadata to {:?}", meta_path);

    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let content = serde_json::to_string_pretty(meta)?;
    fs::write(&meta_path, content)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_builder() {
        let config = IndexConfig::new(384, "/tmp/test")
            .with_metric(VectorMetric::Cosine)
            .with_model_id("mini");

        assert_eq!(config.dimension, 384);
        assert_eq!(config.backend, "flat");
        assert_eq!(config.metric, VectorMetric::Cosine);
        assert_eq!(config.model_id.as_deref(), Some("mini"));
    }

    #[test]
    fn test_meta_serialization() {
        let mut meta = IndexMeta::new("flat", 384, VectorMetric::L2);
        meta.model_id = Some("mini".to_string());

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"backend\":\"flat\""));
        assert!(json.contains("\"dimension\":384"));
        assert!(json.contains("\"metric\":\"l2\""));
        assert!(json.contains("\"modelId\":\"mini\""));

        let parsed: IndexMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.dimension, 384);
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_compatibility_check_not_found() {
        let config = IndexConfig::new(384, "/nonexistent/path/xyz123");
        assert!(check_index_compatibility(&config).is_not_found());
    }

    #[test]
    fn test_compatibility_detects_model_and_dimension() {
        let dir = TempDir::new().unwrap();
        let mut meta = IndexMeta::new("flat", 4, VectorMetric::L2);
        meta.model_id = Some("model-a".to_string());
        write_index_meta(dir.path(), &meta).unwrap();

        let ok = IndexConfig::new(4, dir.path()).with_model_id("model-a");
        assert!(check_index_compatibility(&ok).is_compatible());

        let unknown_dim = IndexConfig::new(0, dir.path());
        assert!(check_index_compatibility(&unknown_dim).is_compatible());

        let wrong_model = IndexConfig::new(4, dir.path()).with_model_id("model-b");
        assert!(matches!(
            check_index_compatibility(&wrong_model),
            IndexCompatibility::IncompatibleModel { .. }
        ));

        let wrong_dim = IndexConfig::new(8, dir.path());
        let compat = check_index_compatibility(&wrong_dim);
        assert_eq!(
            compat,
            IndexCompatibility::IncompatibleDimension {
                expected: 8,
                actual: 4
            }
        );
        assert!(compat.reason().unwrap().contains("dimension"));
    }

    #[test]
    fn test_compatibility_garbled_meta_is_corrupted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(INDEX_META_FILENAME), "{not json").unwrap();

        let config = IndexConfig::new(4, dir.path());
        assert!(matches!(
            check_index_compatibility(&config),
            IndexCompatibility::Corrupted(_)
        ));
    }
}
