//! # shopai-db
//!
//! Storage layer for shopai - the embedding index used by the retrieval stage.
//!
//! The index is built offline from the product catalog and loaded read-only at
//! startup. Every vector sits at a fixed position, and the positional id list
//! (`index_to_id.json`) maps a search hit back to its product id.
//!
//! ## Architecture
//!
//! ```text
//! shopai-cli → shopai-core → (traits)
//!                  ↑
//!              shopai-db (implements NeighborIndex)
//!              shopai-model (implements embedding/reranker/generator models)
//! ```
//!
//! ## Features
//!
//! - `flat` (default): exhaustive JSONL-backed index, squared L2 distance
//!
//! ## Usage
//!
//! ```ignore
//! use shopai_db::vector::{IndexConfig, open_neighbor_index};
//!
//! let config = IndexConfig::new(384, "/path/to/index");
//! let index = open_neighbor_index(&config)?;
//!
//! for hit in index.search(&query_vector, 20)? {
//!     let id = index.product_id_at(hit.position);
//! }
//! ```

pub mod error;
pub mod vector;

pub use error::{DbError, DbResult};
