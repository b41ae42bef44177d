//! Embedding index module for shopai-db.
//!
//! ## Available Backends
//!
//! - `flat` (default): exhaustive JSONL-backed index
//!
//! ## Usage
//!
//! ```ignore
//! use shopai_db::vector::{IndexConfig, IndexEntry, build_neighbor_index};
//!
//! let config = IndexConfig::new(384, "/path/to/index").with_model_id("model");
//! build_neighbor_index(&config, vec![IndexEntry::new("ELEC001", vector)])?;
//! ```

mod backend;
mod config;
mod traits;

// Re-export main types
pub use config::{
    check_index_compatibility, load_index_meta, write_index_meta, IndexCompatibility,
    IndexConfig, IndexMeta, DEFAULT_BACKEND, ID_MAP_FILENAME, INDEX_META_FILENAME,
    SCHEMA_VERSION, VECTORS_FILENAME,
};
pub use traits::{cosine_similarity, squared_l2, IndexEntry, Neighbor, NeighborIndex, VectorMetric};

// Re-export backend factory functions
pub use backend::{available_backends, build_neighbor_index, open_neighbor_index};

#[cfg(feature = "flat")]
pub use backend::FlatIndex;
