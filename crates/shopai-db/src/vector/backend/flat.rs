//! Flat (exhaustive) embedding index.
//!
//! Vectors are stored one per line in `vectors.jsonl`, in position order, next
//! to the positional id list `index_to_id.json`. Search is a linear scan.
//! The catalog is small enough that an approximate structure buys nothing.

use super::super::config::{
    write_index_meta, IndexConfig, IndexMeta, ID_MAP_FILENAME, VECTORS_FILENAME,
};
use super::super::traits::{IndexEntry, Neighbor, NeighborIndex, VectorMetric};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// One line of `vectors.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredVector {
    position: usize,
    product_id: String,
    vector: Vec<f32>,
}

/// Exhaustive nearest-neighbor index loaded fully into memory.
#[derive(Debug)]
pub struct FlatIndex {
    /// Path to the index directory.
    path: PathBuf,

    /// Dimension of vectors.
    dimension: usize,

    /// Distance metric.
    metric: VectorMetric,

    /// Product id per position.
    ids: Vec<String>,

    /// Vector per position.
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Write a new index to `config.path`, replacing any previous one.
    ///
    /// Entries keep their order: entry `i` is stored at position `i`.
    pub fn build(config: &IndexConfig, entries: Vec<IndexEntry>) -> DbResult<Self> {
        debug!(
            "Building FlatIndex at {:?} with {} entries",
            config.path,
            entries.len()
        );

        if entries.is_empty() {
            return Err(DbError::internal("Refusing to build an empty index"));
        }

        for entry in &entries {
            if entry.vector.len() != config.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: config.dimension,
                    actual: entry.vector.len(),
                });
            }
        }

        fs::create_dir_all(&config.path)
            .map_err(|e| DbError::vector_io(&config.path, e.to_string()))?;

        let data_path = config.path.join(VECTORS_FILENAME);
        let file =
            File::create(&data_path).map_err(|e| DbError::vector_io(&data_path, e.to_string()))?;
        let mut writer = BufWriter::new(file);

        let mut ids = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            let stored = StoredVector {
                position,
                product_id: entry.product_id,
                vector: entry.vector,
            };
            writeln!(writer, "{}", serde_json::to_string(&stored)?)?;
            ids.push(stored.product_id);
            vectors.push(stored.vector);
        }
        writer.flush()?;

        let id_path = config.path.join(ID_MAP_FILENAME);
        fs::write(&id_path, serde_json::to_string(&ids)?)
            .map_err(|e| DbError::vector_io(&id_path, e.to_string()))?;

        let mut meta = IndexMeta::for_config(config);
        meta.update_count(ids.len());
        write_index_meta(&config.path, &meta)?;

        debug!("Wrote {} vectors to {:?}", ids.len(), data_path);

        Ok(Self {
            path: config.path.clone(),
            dimension: config.dimension,
            metric: config.metric,
            ids,
            vectors,
        })
    }

    /// Open an existing index.
    ///
    /// The id list, the vector rows, and the metadata count must all agree.
    /// Any disagreement is a load error, never a partial index.
    pub fn open(config: &IndexConfig, meta: &IndexMeta) -> DbResult<Self> {
        debug!("Opening FlatIndex at {:?}", config.path);

        let ids = load_id_map(&config.path.join(ID_MAP_FILENAME))?;
        let data_path = config.path.join(VECTORS_FILENAME);
        let file =
            File::open(&data_path).map_err(|e| DbError::vector_io(&data_path, e.to_string()))?;

        let mut vectors = Vec::with_capacity(ids.len());
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let stored: StoredVector = serde_json::from_str(&line).map_err(|e| {
                DbError::vector_parse(&data_path, format!("line {}: {}", line_num + 1, e))
            })?;

            let position = vectors.len();
            if stored.position != position {
                return Err(DbError::index_corrupted(
                    &config.path,
                    format!("expected position {}, found {}", position, stored.position),
                ));
            }
            if stored.vector.len() != meta.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: meta.dimension,
                    actual: stored.vector.len(),
                });
            }
            match ids.get(position) {
                Some(id) if *id == stored.product_id => {}
                Some(id) => {
                    return Err(DbError::index_corrupted(
                        &config.path,
                        format!(
                            "position {} maps to '{}' but row holds '{}'",
                            position, id, stored.product_id
                        ),
                    ));
                }
                None => {
                    return Err(DbError::index_corrupted(
                        &config.path,
                        format!("row {} has no entry in {}", position, ID_MAP_FILENAME),
                    ));
                }
            }

            vectors.push(stored.vector);
        }

        if vectors.len() != ids.len() {
            return Err(DbError::index_corrupted(
                &config.path,
                format!(
                    "{} vectors but {} ids in {}",
                    vectors.len(),
                    ids.len(),
                    ID_MAP_FILENAME
                ),
            ));
        }
        if meta.count != ids.len() {
            return Err(DbError::index_corrupted(
                &config.path,
                format!("metadata count {} but {} vectors", meta.count, ids.len()),
            ));
        }
        if ids.is_empty() {
            return Err(DbError::index_corrupted(&config.path, "index is empty"));
        }

        debug!("Loaded {} vectors", vectors.len());

        Ok(Self {
            path: config.path.clone(),
            dimension: meta.dimension,
            metric: meta.metric,
            ids,
            vectors,
        })
    }

    /// Directory the index lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Positional product id list.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl NeighborIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> DbResult<Vec<Neighbor>> {
        trace!("Searching FlatIndex, k={}", k);

        if query.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| Neighbor::new(self.metric.distance(query, v), position))
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        scored.truncate(k);

        trace!("Found {} neighbors", scored.len());
        Ok(scored)
    }

    fn product_id_at(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(String::as_str)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }
}

fn load_id_map(path: &Path) -> DbResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| DbError::vector_io(path, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| DbError::vector_parse(path, e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::super::config::load_index_meta;
    use super::*;
    use tempfile::TempDir;

    fn sample_entries() -> Vec<IndexEntry> {
        vec![
            IndexEntry::new("ELEC001", vec![1.0, 0.0]),
            IndexEntry::new("SPORTS001", vec![0.0, 1.0]),
            IndexEntry::new("BOOK001", vec![0.9, 0.1]),
        ]
    }

    fn build_sample(dir: &TempDir) -> (IndexConfig, FlatIndex) {
        let config = IndexConfig::new(2, dir.path()).with_model_id("test-model");
        let index = FlatIndex::build(&config, sample_entries()).unwrap();
        (config, index)
    }

    #[test]
    fn test_build_then_open_preserves_positions() {
        let dir = TempDir::new().unwrap();
        let (config, built) = build_sample(&dir);
        assert_eq!(built.len(), 3);

        let meta = load_index_meta(dir.path()).unwrap();
        assert_eq!(meta.count, 3);
        assert_eq!(meta.model_id.as_deref(), Some("test-model"));

        let opened = FlatIndex::open(&config, &meta).unwrap();
        assert_eq!(opened.ids(), built.ids());
        assert_eq!(opened.product_id_at(1), Some("SPORTS001"));
        assert_eq!(opened.product_id_at(3), None);
    }

    #[test]
    fn test_search_orders_by_squared_distance() {
        let dir = TempDir::new().unwrap();
        let (_, index) = build_sample(&dir);

        let hits = index.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].position, 2);
        assert!((hits[1].distance - 0.02).abs() < 1e-6);
        assert_eq!(hits[2].position, 1);
        assert!((hits[2].distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let dir = TempDir::new().unwrap();
        let (_, index) = build_sample(&dir);
        assert_eq!(index.search(&[0.0, 1.0], 1).unwrap().len(), 1);
    }

    #[test]
    fn test_search_rejects_wrong_dimension() {
        let dir = TempDir::new().unwrap();
        let (_, index) = build_sample(&dir);
        let err = index.search(&[1.0, 0.0, 0.0], 2).unwrap_err();
        assert!(matches!(err, DbError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::new(2, dir.path());
        let entries = vec![
            IndexEntry::new("A", vec![1.0, 0.0]),
            IndexEntry::new("B", vec![1.0]),
        ];
        assert!(FlatIndex::build(&config, entries).is_err());
    }

    #[test]
    fn test_open_rejects_truncated_id_map() {
        let dir = TempDir::new().unwrap();
        let (config, _) = build_sample(&dir);
        fs::write(dir.path().join(ID_MAP_FILENAME), r#"["ELEC001","SPORTS001"]"#).unwrap();

        let meta = load_index_meta(dir.path()).unwrap();
        let err = FlatIndex::open(&config, &meta).unwrap_err();
        assert!(matches!(err, DbError::IndexCorrupted { .. }));
    }

    #[test]
    fn test_open_rejects_garbled_row() {
        let dir = TempDir::new().unwrap();
        let (config, _) = build_sample(&dir);
        let data = dir.path().join(VECTORS_FILENAME);
        let mut content = fs::read_to_string(&data).unwrap();
        content.push_str("{garbage\n");
        fs::write(&data, content).unwrap();

        let meta = load_index_meta(dir.path()).unwrap();
        let err = FlatIndex::open(&config, &meta).unwrap_err();
        assert!(matches!(err, DbError::VectorParse { .. }));
    }

    #[test]
    fn test_open_rejects_swapped_ids() {
        let dir = TempDir::new().unwrap();
        let (config, _) = build_sample(&dir);
        fs::write(
            dir.path().join(ID_MAP_FILENAME),
            r#"["SPORTS001","ELEC001","BOOK001"]"#,
        )
        .unwrap();

        let meta = load_index_meta(dir.path()).unwrap();
        assert!(FlatIndex::open(&config, &meta).is_err());
    }
}
