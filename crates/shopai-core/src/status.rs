//! Health reporting for `shopai status`.
//!
//! Status collection never loads model weights or index vectors. It checks
//! that the catalog parses, reads the index metadata, and asks the model
//! locator whether the configured models are present on disk.
//!
//! ## Key Types
//!
//! - [`StatusReport`] - complete report, see [`StatusReport::collect`]
//! - [`ModelStatus`] - availability of one local model

use std::path::{Path, PathBuf};

use serde::Serialize;
use shopai_model::ModelLocator;

use crate::catalog::Catalog;
use crate::config::GlobalConfig;
use crate::db_adapter::{inspect_index, IndexStatus};
use crate::dictionary::MatchDictionary;

// ============================================================================
// Component status
// ============================================================================

/// Catalog load result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatus {
    pub path: PathBuf,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Match dictionary source and validity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryStatus {
    /// `None` for the built-in tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Availability of a local model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub model_id: String,
    pub enabled: bool,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ModelStatus {
    fn locate(model_id: &str, local_path: Option<&Path>, enabled: bool, is_reranker: bool) -> Self {
        let locator = ModelLocator::new();
        let resolved = match local_path {
            Some(path) => locator.validate_model_dir(path).map(|_| path.to_path_buf()),
            None if is_reranker => locator.reranker_model_path(model_id),
            None => locator.embedding_model_path(model_id),
        };

        match resolved {
            Ok(path) => Self {
                model_id: model_id.to_string(),
                enabled,
                available: true,
                path: Some(path),
                reason: None,
            },
            Err(e) => Self {
                model_id: model_id.to_string(),
                enabled,
                available: false,
                path: local_path.map(Path::to_path_buf),
                reason: Some(e.to_string()),
            },
        }
    }
}

/// Generator settings; reachability is only checked at request time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorStatus {
    pub enabled: bool,
    pub provider: String,
    pub endpoint: String,
    pub model: String,
}

// ============================================================================
// StatusReport
// ============================================================================

/// Complete health report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub catalog: CatalogStatus,
    pub dictionary: DictionaryStatus,
    pub index: IndexStatus,
    pub embedding: ModelStatus,
    pub reranker: ModelStatus,
    pub generator: GeneratorStatus,
}

impl StatusReport {
    /// Collect the status of every component named by `config`.
    pub fn collect(config: &GlobalConfig) -> Self {
        let catalog_path = config.data.catalog_path();
        let catalog = match Catalog::load(&catalog_path) {
            Ok(catalog) => CatalogStatus {
                path: catalog_path,
                loaded: true,
                count: Some(catalog.len()),
                error: None,
            },
            Err(e) => CatalogStatus {
                path: catalog_path,
                loaded: false,
                count: None,
                error: Some(e.to_string()),
            },
        };

        let dictionary = match &config.data.dictionary_path {
            Some(path) => {
                let error = MatchDictionary::from_path(path).err().map(|e| e.to_string());
                DictionaryStatus {
                    path: Some(path.clone()),
                    valid: error.is_none(),
                    error,
                }
            }
            None => DictionaryStatus {
                path: None,
                valid: true,
                error: None,
            },
        };

        let index = inspect_index(&config.data.index_dir(), &config.embedding.model_id);

        let embedding = ModelStatus::locate(
            &config.embedding.model_id,
            config.embedding.local_path.as_deref(),
            true,
            false,
        );
        let reranker = ModelStatus::locate(
            &config.reranker.model_id,
            config.reranker.local_path.as_deref(),
            config.reranker.enabled,
            true,
        );

        let generator = GeneratorStatus {
            enabled: config.generator.enabled,
            provider: config.generator.provider.to_string(),
            endpoint: config.generator.endpoint.clone(),
            model: config.generator.model.clone(),
        };

        Self {
            catalog,
            dictionary,
            index,
            embedding,
            reranker,
            generator,
        }
    }

    /// Whether `shopai ask` can serve requests with this setup.
    ///
    /// A missing reranker only degrades ranking and does not count.
    pub fn is_ready(&self) -> bool {
        self.catalog.loaded && self.dictionary.valid && self.index.compatible && self.embedding.available
    }

    /// Human-readable problems, in severity order.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(err) = &self.catalog.error {
            problems.push(err.clone());
        }
        if let Some(err) = &self.dictionary.error {
            problems.push(err.clone());
        }
        if !self.index.exists {
            problems.push(format!(
                "No embedding index at {}. Run `shopai build-index`.",
                self.index.path.display()
            ));
        } else if let Some(reason) = &self.index.reason {
            problems.push(format!("Index is stale: {}. Run `shopai build-index`.", reason));
        }
        if let Some(reason) = &self.embedding.reason {
            problems.push(reason.clone());
        }
        if self.reranker.enabled {
            if let Some(reason) = &self.reranker.reason {
                problems.push(format!("Reranker unavailable, ranking degrades: {}", reason));
            }
        }
        problems
    }
}
