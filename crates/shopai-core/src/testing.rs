//! In-crate test doubles for the capability traits.

use std::collections::HashMap;

use shopai_db::vector::squared_l2;

use crate::candidate::compare_distance;
use crate::catalog::{Catalog, Category, Price, Product};
use crate::composer::GeneratorBackend;
use crate::embedding::EmbeddingBackend;
use crate::errors::{ShopError, ShopResult};
use crate::index::{IndexHit, ProductIndex};
use crate::reranker::RelevanceScorer;

/// Small catalog covering every category.
pub fn sample_catalog() -> Catalog {
    Catalog::from_products(vec![
        Product::new("ELEC001", "蓝牙耳机", Category::Electronics, "降噪无线耳机，续航30小时", Price::from_cents(19900)),
        Product::new("ELEC002", "充电宝", Category::Electronics, "20000毫安大容量移动电源", Price::from_cents(8900)),
        Product::new("ELEC004", "机械键盘", Category::Electronics, "青轴机械键盘，RGB背光", Price::from_cents(39900)),
        Product::new("SPORTS001", "跑步鞋", Category::SportsOutdoor, "轻便透气缓震跑鞋", Price::from_cents(29900)),
        Product::new("SPORTS002", "运动水壶", Category::SportsOutdoor, "不锈钢保温运动水壶", Price::from_cents(6900)),
        Product::new("BOOK001", "三体", Category::Books, "刘慈欣科幻小说三部曲", Price::from_cents(9900)),
        Product::new("OFFICE004", "人体工学椅", Category::Office, "可调节腰托的办公椅", Price::from_cents(99900)),
    ])
    .unwrap()
}

// ============================================================================
// Embedding
// ============================================================================

/// Maps a text to the vector of the first rule whose key it contains.
pub struct MockEmbeddingBackend {
    rules: Vec<(String, Vec<f32>)>,
    fallback: Vec<f32>,
}

impl MockEmbeddingBackend {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn with_rule(mut self, key: &str, vector: Vec<f32>) -> Self {
        self.rules.push((key.to_string(), vector));
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.rules
            .iter()
            .find(|(key, _)| text.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl EmbeddingBackend for MockEmbeddingBackend {
    fn model_id(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.fallback.len()
    }

    fn embed_batch(&self, inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Backend whose every call fails like an unavailable model.
pub struct FailingBackend;

impl EmbeddingBackend for FailingBackend {
    fn model_id(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        2
    }

    fn embed_batch(&self, _inputs: &[String]) -> ShopResult<Vec<Vec<f32>>> {
        Err(ShopError::EmbeddingFailed {
            model_id: "failing".to_string(),
            reason: "model offline".to_string(),
        })
    }
}

impl RelevanceScorer for FailingBackend {
    fn model_id(&self) -> &str {
        "failing"
    }

    fn score_batch(&self, _query: &str, _documents: &[String]) -> ShopResult<Vec<f32>> {
        Err(ShopError::RerankerInferenceFailed {
            model_id: "failing".to_string(),
            reason: "model offline".to_string(),
        })
    }
}

impl GeneratorBackend for FailingBackend {
    fn model_id(&self) -> &str {
        "failing"
    }

    fn generate(&self, _prompt: &str) -> ShopResult<String> {
        Err(ShopError::GeneratorFailed {
            model: "failing".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

// ============================================================================
// Index
// ============================================================================

/// Exhaustive in-memory index.
pub struct MemoryIndex {
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    extra_hits: Vec<IndexHit>,
}

impl MemoryIndex {
    pub fn new(entries: Vec<(&str, Vec<f32>)>) -> Self {
        let (ids, vectors) = entries
            .into_iter()
            .map(|(id, v)| (id.to_string(), v))
            .unzip();
        Self {
            ids,
            vectors,
            extra_hits: Vec::new(),
        }
    }

    /// Embed every catalog product with `embedder`, in catalog order.
    pub fn from_catalog(catalog: &Catalog, embedder: &dyn EmbeddingBackend) -> Self {
        let texts: Vec<String> = catalog.iter().map(|p| p.index_text()).collect();
        let vectors = embedder.embed_batch(&texts).unwrap();
        Self {
            ids: catalog.iter().map(|p| p.id.clone()).collect(),
            vectors,
            extra_hits: Vec::new(),
        }
    }

    /// Append a hit to every search result, e.g. an out-of-range position.
    pub fn with_extra_hit(mut self, hit: IndexHit) -> Self {
        self.extra_hits.push(hit);
        self
    }
}

impl ProductIndex for MemoryIndex {
    fn search(&self, query: &[f32], k: usize) -> ShopResult<Vec<IndexHit>> {
        let mut hits: Vec<IndexHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| IndexHit::new(squared_l2(query, v), pos))
            .collect();
        hits.sort_by(|a, b| compare_distance(a.distance, b.distance));
        hits.truncate(k);
        hits.extend(self.extra_hits.iter().copied());
        Ok(hits)
    }

    fn product_id_at(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(|s| s.as_str())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dimension(&self) -> usize {
        self.vectors.first().map(|v| v.len()).unwrap_or(0)
    }
}

// ============================================================================
// Relevance / generation
// ============================================================================

/// Returns a fixed score per document text, 0.0 for unknown documents.
#[derive(Default)]
pub struct MockScorer {
    scores: HashMap<String, f32>,
}

impl MockScorer {
    pub fn with_score(mut self, product: &Product, score: f32) -> Self {
        self.scores.insert(product.rerank_text(), score);
        self
    }
}

impl RelevanceScorer for MockScorer {
    fn model_id(&self) -> &str {
        "mock-reranker"
    }

    fn score_batch(&self, _query: &str, documents: &[String]) -> ShopResult<Vec<f32>> {
        Ok(documents
            .iter()
            .map(|d| self.scores.get(d).copied().unwrap_or(0.0))
            .collect())
    }
}

/// Generator returning a fixed reply.
pub struct EchoGenerator(pub String);

impl GeneratorBackend for EchoGenerator {
    fn model_id(&self) -> &str {
        "echo"
    }

    fn generate(&self, _prompt: &str) -> ShopResult<String> {
        Ok(self.0.clone())
    }
}
