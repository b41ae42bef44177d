//! Shared fixtures for shopai-core scenario tests.
//!
//! The fixture shop is the catalog shipped in `data/products.json`, indexed
//! into a temporary directory with [`ConceptEmbedder`], a deterministic
//! embedder that marks which shopping concepts a text mentions.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use shopai_core::{
    build_index, open_index, Catalog, EmbeddingBackend, MatchDictionary, PipelineConfig,
    Recommender, ShopError, ShopResult,
};

/// Concepts, one vector axis each.
const CONCEPTS: &[&str] = &[
    "耳机", "充电", "键盘", "鞋", "帐篷", "水壶", "哑铃", "小说", "历史", "椅", "台灯", "支架",
];

/// Path of the shipped catalog.
pub fn catalog_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/products.json")
}

pub fn shop_catalog() -> Catalog {
    Catalog::load(&catalog_path()).expect("shipped catalog should load")
}

/// Embeds a text as the indicator vector of the concepts it contains.
///
/// A text with no concept lands on a separate bias axis so it is far from
/// every product with one.
pub struct ConceptEmbedder;

impl ConceptEmbedder {
    fn embed(text: &str) -> Vec<f32> {
        let mut v: Vec<f32> = CONCEPTS
            .iter()
            .map(|c| if text.contains(c) { 1.0 } else { 0.0 })
            .collect();
        let bias = if v.iter().all(|x| *x == 0.0) { 1.0 } else { 0.0 };
        v.push(bias);
        v
    }
}

impl EmbeddingBackend for ConceptEmbedder {
    fn model_id(&self) -> &str {
        "concept-embedder"
    }

    fn dimension(&self) -> usize {
        CONCEPTS.len() + 1
    }

    fn embed_batch(&self, inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|t| Self::embed(t)).collect())
    }
}

/// Embedder that is always down.
pub struct OfflineEmbedder;

impl EmbeddingBackend for OfflineEmbedder {
    fn model_id(&self) -> &str {
        "concept-embedder"
    }

    fn dimension(&self) -> usize {
        CONCEPTS.len() + 1
    }

    fn embed_batch(&self, _inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
        Err(ShopError::EmbeddingFailed {
            model_id: "concept-embedder".to_string(),
            reason: "model offline".to_string(),
        })
    }
}

/// A recommender over the shipped catalog plus the temp dir holding its index.
pub struct Shop {
    pub recommender: Recommender,
    _index_dir: TempDir,
}

impl Shop {
    pub fn new() -> Self {
        Self::with(Arc::new(ConceptEmbedder), PipelineConfig::default())
    }

    /// Index with [`ConceptEmbedder`], query with `embedder`.
    pub fn with(embedder: Arc<dyn EmbeddingBackend>, config: PipelineConfig) -> Self {
        let catalog = shop_catalog();
        let tmp = TempDir::new().expect("create temp dir");
        let dir = tmp.path().join("index");
        build_index(&catalog, &ConceptEmbedder, &dir).expect("build index");
        let index = open_index(&dir, embedder.as_ref(), &catalog).expect("open index");

        let recommender = Recommender::new(
            Arc::new(catalog),
            Arc::new(MatchDictionary::builtin()),
            embedder,
            Arc::new(index),
            config,
        );
        Self {
            recommender,
            _index_dir: tmp,
        }
    }
}
