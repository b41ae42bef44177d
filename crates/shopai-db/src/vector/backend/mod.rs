//! Index backend implementations.
//!
//! ## Available Backends
//!
//! - `flat` (default): exhaustive JSONL-backed index

#[cfg(feature = "flat")]
mod flat;

#[cfg(feature = "flat")]
pub use flat::FlatIndex;

use super::config::{
    check_index_compatibility, load_index_meta, IndexCompatibility, IndexConfig,
};
use super::traits::{IndexEntry, NeighborIndex};
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Open an existing index with the given configuration.
///
/// An index is never created here: a missing, incompatible, or inconsistent
/// index is an error so the pipeline never runs against partial state.
pub fn open_neighbor_index(config: &IndexConfig) -> DbResult<Arc<dyn NeighborIndex>> {
    debug!("Opening embedding index at {:?}", config.path);

    match check_index_compatibility(config) {
        IndexCompatibility::Compatible => {
            debug!("Index is compatible, opening...");
        }
        IndexCompatibility::NotFound => {
            return Err(DbError::IndexNotFound {
                path: config.path.clone(),
            });
        }
        IndexCompatibility::IncompatibleDimension { expected, actual } => {
            return Err(DbError::DimensionMismatch { expected, actual });
        }
        other => {
            let reason = other
                .reason()
                .unwrap_or_else(|| "unknown incompatibility".to_string());
            return Err(DbError::index_incompatible(&config.path, reason));
        }
    }

    match config.backend.as_str() {
        #[cfg(feature = "flat")]
        "flat" => {
            let meta = load_index_meta(&config.path)?;
            let index = FlatIndex::open(config, &meta)?;
            Ok(Arc::new(index))
        }

        backend => Err(DbError::internal(format!(
            "Unknown backend: '{}'. Available backends: {}",
            backend,
            available_backends().join(", ")
        ))),
    }
}

/// Build a new index from entries, replacing whatever is at `config.path`.
pub fn build_neighbor_index(
    config: &IndexConfig,
    entries: Vec<IndexEntry>,
) -> DbResult<Arc<dyn NeighborIndex>> {
    info!(
        "Building {} index with {} vectors at {:?}",
        config.backend,
        entries.len(),
        config.path
    );

    match config.backend.as_str() {
        #[cfg(feature = "flat")]
        "flat" => Ok(Arc::new(FlatIndex::build(config, entries)?)),

        backend => Err(DbError::internal(format!(
            "Unknown backend: '{}'. Available backends: {}",
            backend,
            available_backends().join(", ")
        ))),
    }
}

/// Get a list of available backend names.
#[allow(clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();

    #[cfg(feature = "flat")]
    backends.push("flat");

    backends
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, feature = "flat"))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_available_backends() {
        assert_eq!(available_backends(), vec!["flat"]);
    }

    #[test]
    fn test_open_missing_index_fails() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::new(2, dir.path().join("missing"));
        let err = open_neighbor_index(&config).err().unwrap();
        assert!(matches!(err, DbError::IndexNotFound { .. }));
    }

    #[test]
    fn test_build_then_open_roundtrip_through_factory() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::new(2, dir.path()).with_model_id("m");
        build_neighbor_index(
            &config,
            vec![
                IndexEntry::new("A", vec![0.0, 1.0]),
                IndexEntry::new("B", vec![1.0, 0.0]),
            ],
        )
        .unwrap();

        let index = open_neighbor_index(&config).unwrap();
        assert_eq!(index.len(), 2);
        let hits = index.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(index.product_id_at(hits[0].position), Some("B"));
    }

    #[test]
    fn test_open_with_other_model_fails() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::new(2, dir.path()).with_model_id("m1");
        build_neighbor_index(&config, vec![IndexEntry::new("A", vec![0.0, 1.0])]).unwrap();

        let other = IndexConfig::new(2, dir.path()).with_model_id("m2");
        let err = open_neighbor_index(&other).err().unwrap();
        assert!(matches!(err, DbError::IndexIncompatible { .. }));
    }
}
