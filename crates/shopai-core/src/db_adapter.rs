//! Adapter layer for shopai-db infrastructure.
//!
//! This module bridges the persisted embedding index with shopai-core:
//!
//! - Error conversion from `DbError` to `ShopError`
//! - [`DbProductIndex`], a [`ProductIndex`] over `shopai_db::vector::NeighborIndex`
//! - [`build_index`] / [`open_index`] / [`inspect_index`] for the offline
//!   build, the engine startup and `shopai status`
//!
//! ## Architecture
//!
//! ```text
//! shopai-core (engine, retrieval, status)
//!        ↓
//!   db_adapter (this module) - wrappers + conversions
//!        ↓
//!     shopai-db flat index (vectors.jsonl, index_to_id.json, index.meta.json)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use shopai_db::vector::{
    build_neighbor_index, check_index_compatibility, load_index_meta, open_neighbor_index,
    IndexCompatibility, IndexConfig, IndexEntry, NeighborIndex,
};

use crate::catalog::Catalog;
use crate::embedding::{check_embeddings, EmbeddingBackend};
use crate::errors::{ShopError, ShopResult};
use crate::index::{IndexHit, ProductIndex};

// ============================================================================
// Error Conversion
// ============================================================================

/// Convert a shopai-db error to a shopai-core error.
pub fn from_db_error(err: shopai_db::DbError) -> ShopError {
    use shopai_db::DbError;

    match err {
        DbError::Io(io_err) => ShopError::Io(io_err),

        DbError::VectorIo { path, message } | DbError::VectorParse { path, message } => {
            ShopError::IndexCorrupted { path, message }
        }

        DbError::DimensionMismatch { expected, actual } => ShopError::IndexIncompatible {
            path: PathBuf::new(),
            reason: format!("dimension mismatch: expected {}, found {}", expected, actual),
        },

        DbError::IndexNotFound { path } => ShopError::IndexNotFound { path },

        DbError::IndexIncompatible { path, reason } => ShopError::IndexIncompatible { path, reason },

        DbError::IndexCorrupted { path, message } => ShopError::IndexCorrupted { path, message },

        DbError::Json(json_err) => ShopError::Json(json_err),

        DbError::Internal { message } => ShopError::Other(anyhow::anyhow!(message)),
    }
}

/// Extension trait to convert `DbResult` to `ShopResult`.
pub trait IntoShopResult<T> {
    fn into_shop_result(self) -> ShopResult<T>;
}

impl<T> IntoShopResult<T> for shopai_db::DbResult<T> {
    fn into_shop_result(self) -> ShopResult<T> {
        self.map_err(from_db_error)
    }
}

// ============================================================================
// DbProductIndex
// ============================================================================

/// The persisted index behind the core [`ProductIndex`] trait.
#[derive(Clone)]
pub struct DbProductIndex {
    inner: Arc<dyn NeighborIndex>,
    model_id: Option<String>,
}

impl std::fmt::Debug for DbProductIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbProductIndex")
            .field("len", &self.inner.len())
            .field("dimension", &self.inner.dimension())
            .field("model_id", &self.model_id)
            .finish()
    }
}

impl DbProductIndex {
    pub fn new(inner: Arc<dyn NeighborIndex>, model_id: Option<String>) -> Self {
        Self { inner, model_id }
    }
}

impl ProductIndex for DbProductIndex {
    fn search(&self, query: &[f32], k: usize) -> ShopResult<Vec<IndexHit>> {
        let neighbors = self
            .inner
            .search(query, k)
            .map_err(|e| ShopError::IndexSearch(e.to_string()))?;
        Ok(neighbors
            .into_iter()
            .map(|n| IndexHit::new(n.distance, n.position))
            .collect())
    }

    fn product_id_at(&self, position: usize) -> Option<&str> {
        self.inner.product_id_at(position)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }
}

// ============================================================================
// Build / Open
// ============================================================================

/// Summary of an offline index build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexBuildReport {
    pub path: PathBuf,
    pub count: usize,
    pub dimension: usize,
    pub model_id: String,
    pub duration_ms: u64,
}

fn index_config(dir: &Path, dimension: usize, model_id: &str) -> IndexConfig {
    IndexConfig::new(dimension, dir).with_model_id(model_id)
}

/// Embed every product (`index_text`, catalog order) and write a fresh index
/// to `dir`, replacing any previous one.
pub fn build_index(
    catalog: &Catalog,
    embedder: &dyn EmbeddingBackend,
    dir: &Path,
) -> ShopResult<IndexBuildReport> {
    let started = std::time::Instant::now();
    let texts: Vec<String> = catalog.iter().map(|p| p.index_text()).collect();

    tracing::info!(
        "Embedding {} products with {}",
        texts.len(),
        embedder.model_id()
    );
    let vectors = embedder.embed_batch(&texts)?;
    check_embeddings(embedder, texts.len(), &vectors)?;

    let entries: Vec<IndexEntry> = catalog
        .iter()
        .zip(vectors)
        .map(|(p, v)| IndexEntry::new(p.id.clone(), v))
        .collect();

    let config = index_config(dir, embedder.dimension(), embedder.model_id());
    let index = build_neighbor_index(&config, entries).into_shop_result()?;

    Ok(IndexBuildReport {
        path: dir.to_path_buf(),
        count: index.len(),
        dimension: index.dimension(),
        model_id: embedder.model_id().to_string(),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Open the index at `dir` for queries embedded by `embedder`.
///
/// Missing, incompatible (dimension, model) and inconsistent indexes are
/// fatal, and so is an index whose ids differ from the `catalog` ids.
pub fn open_index(
    dir: &Path,
    embedder: &dyn EmbeddingBackend,
    catalog: &Catalog,
) -> ShopResult<DbProductIndex> {
    let config = index_config(dir, embedder.dimension(), embedder.model_id());

    match check_index_compatibility(&config) {
        IndexCompatibility::Compatible => {}
        IndexCompatibility::NotFound => {
            return Err(ShopError::IndexNotFound {
                path: dir.to_path_buf(),
            })
        }
        IndexCompatibility::Corrupted(message) => {
            return Err(ShopError::IndexCorrupted {
                path: dir.to_path_buf(),
                message,
            })
        }
        other => {
            return Err(ShopError::IndexIncompatible {
                path: dir.to_path_buf(),
                reason: other.reason().unwrap_or_default(),
            })
        }
    }

    let inner = open_neighbor_index(&config).into_shop_result()?;
    let index = DbProductIndex::new(inner, Some(embedder.model_id().to_string()));
    check_catalog_ids(dir, &index, catalog)?;
    tracing::debug!("Opened index at {} ({} vectors)", dir.display(), index.len());
    Ok(index)
}

/// The index must hold exactly the catalog's products.
fn check_catalog_ids(dir: &Path, index: &DbProductIndex, catalog: &Catalog) -> ShopResult<()> {
    let indexed: Vec<&str> = (0..index.len())
        .filter_map(|position| index.product_id_at(position))
        .collect();

    let unknown: Vec<&str> = indexed
        .iter()
        .copied()
        .filter(|id| !catalog.contains(id))
        .collect();
    let missing: Vec<&str> = catalog
        .iter()
        .map(|p| p.id.as_str())
        .filter(|id| !indexed.contains(id))
        .collect();

    if unknown.is_empty() && missing.is_empty() {
        return Ok(());
    }

    let mut problems = Vec::new();
    if !unknown.is_empty() {
        problems.push(format!("ids not in the catalog: {}", preview(&unknown)));
    }
    if !missing.is_empty() {
        problems.push(format!("catalog products not indexed: {}", preview(&missing)));
    }
    Err(ShopError::IndexIncompatible {
        path: dir.to_path_buf(),
        reason: format!("index does not match the catalog ({})", problems.join("; ")),
    })
}

fn preview(ids: &[&str]) -> String {
    const SHOWN: usize = 5;
    let mut out = ids.iter().take(SHOWN).copied().collect::<Vec<_>>().join(", ");
    if ids.len() > SHOWN {
        out.push_str(&format!(" and {} more", ids.len() - SHOWN));
    }
    out
}

/// Index health as reported by `shopai status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub count: Option<usize>,
    pub dimension: Option<usize>,
    pub model_id: Option<String>,
    /// Whether the index was built by `expected_model_id`.
    pub compatible: bool,
    /// Reason when not compatible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Inspect the index metadata without loading vectors or models.
pub fn inspect_index(dir: &Path, expected_model_id: &str) -> IndexStatus {
    let config = IndexConfig::new(0, dir).with_model_id(expected_model_id);
    let compatibility = check_index_compatibility(&config);
    let meta = load_index_meta(dir).ok();

    IndexStatus {
        path: dir.to_path_buf(),
        exists: !compatibility.is_not_found(),
        count: meta.as_ref().map(|m| m.count),
        dimension: meta.as_ref().map(|m| m.dimension),
        model_id: meta.and_then(|m| m.model_id),
        compatible: compatibility.is_compatible(),
        reason: compatibility.reason(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, Price, Product};
    use crate::testing::{sample_catalog, MockEmbeddingBackend};
    use tempfile::TempDir;

    fn embedder() -> MockEmbeddingBackend {
        MockEmbeddingBackend::new(vec![5.0, 5.0, 5.0])
            .with_rule("耳机", vec![0.0, 0.0, 1.0])
            .with_rule("充电宝", vec![0.0, 1.0, 0.0])
    }

    #[test]
    fn test_build_then_open_round_trip() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");
        let catalog = sample_catalog();
        let embedder = embedder();

        let report = build_index(&catalog, &embedder, &dir).unwrap();
        assert_eq!(report.count, catalog.len());
        assert_eq!(report.dimension, 3);

        let index = open_index(&dir, &embedder, &catalog).unwrap();
        assert_eq!(index.len(), catalog.len());
        assert_eq!(index.product_id_at(0), Some("ELEC001"));
        assert_eq!(index.product_id_at(catalog.len()), None);

        let hits = index.search(&[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(index.product_id_at(hits[0].position), Some("ELEC001"));
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_open_missing_index() {
        let tmp = TempDir::new().unwrap();
        let err = open_index(&tmp.path().join("nope"), &embedder(), &sample_catalog()).unwrap_err();
        assert!(matches!(err, ShopError::IndexNotFound { .. }));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_open_with_other_model_is_incompatible() {
        struct OtherModel(MockEmbeddingBackend);
        impl EmbeddingBackend for OtherModel {
            fn model_id(&self) -> &str {
                "another-model"
            }
            fn dimension(&self) -> usize {
                self.0.dimension()
            }
            fn embed_batch(&self, inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
                self.0.embed_batch(inputs)
            }
        }

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");
        build_index(&sample_catalog(), &embedder(), &dir).unwrap();

        let err = open_index(&dir, &OtherModel(embedder()), &sample_catalog()).unwrap_err();
        match err {
            ShopError::IndexIncompatible { reason, .. } => assert!(reason.contains("another-model")),
            other => panic!("Expected IndexIncompatible, got {:?}", other),
        }
    }

    #[test]
    fn test_open_rejects_index_that_differs_from_catalog() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");
        let catalog = sample_catalog();
        build_index(&catalog, &embedder(), &dir).unwrap();

        // product removed from the catalog after indexing
        let shrunk = Catalog::from_products(catalog.iter().skip(1).cloned().collect()).unwrap();
        match open_index(&dir, &embedder(), &shrunk).unwrap_err() {
            ShopError::IndexIncompatible { reason, .. } => {
                assert!(reason.contains("ids not in the catalog: ELEC001"), "{}", reason);
            }
            other => panic!("Expected IndexIncompatible, got {:?}", other),
        }

        // product added to the catalog after indexing
        let mut products: Vec<Product> = catalog.iter().cloned().collect();
        products.push(Product::new("BOOK099", "新书", Category::Books, "", Price::from_cents(100)));
        let grown = Catalog::from_products(products).unwrap();
        let err = open_index(&dir, &embedder(), &grown).unwrap_err();
        assert!(err.to_string().contains("catalog products not indexed: BOOK099"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_inspect_index() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");

        let missing = inspect_index(&dir, "mock-embedding");
        assert!(!missing.exists);
        assert!(!missing.compatible);

        build_index(&sample_catalog(), &embedder(), &dir).unwrap();
        let status = inspect_index(&dir, "mock-embedding");
        assert!(status.exists);
        assert!(status.compatible);
        assert_eq!(status.count, Some(7));
        assert_eq!(status.model_id.as_deref(), Some("mock-embedding"));

        let stale = inspect_index(&dir, "other");
        assert!(!stale.compatible);
        assert!(stale.reason.is_some());
    }
}
