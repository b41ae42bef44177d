//! ShopEngine, the entry point for every shopai operation.
//!
//! The [`ShopEngine`] owns the global configuration plus the immutable data
//! every request shares (catalog, match dictionary). Model backends and the
//! embedding index are created on demand, so commands like `products` never
//! touch model weights.

use std::path::Path;
use std::sync::Arc;

use crate::cart::{plan_cart, CartPlan, CartRecommendation};
use crate::catalog::{Catalog, Category, Product};
use crate::composer::GeneratorBackend;
use crate::config::{DevicePreference, GlobalConfig};
use crate::db_adapter::{build_index, open_index, IndexBuildReport};
use crate::dictionary::MatchDictionary;
use crate::embedding::{EmbeddingBackend, UnavailableEmbedding};
use crate::errors::{ShopError, ShopResult};
use crate::model_adapter::{create_embedding_backend, create_generator, create_relevance_scorer};
use crate::pipeline::{RecommendOptions, Recommendation, Recommender};
use crate::reranker::RelevanceScorer;
use crate::status::StatusReport;

// ============================================================================
// ShopEngine
// ============================================================================

/// The main engine for shopai operations.
///
/// # Construction
///
/// Use [`ShopEngine::from_config`] for typical usage, or
/// [`ShopEngine::with_defaults`] to load `~/.shopai/config.yaml`.
///
/// # Example
///
/// ```ignore
/// use shopai_core::{GlobalConfig, ShopEngine};
///
/// let engine = ShopEngine::from_config(GlobalConfig::load_default()?)?;
/// let recommendation = engine.ask("推荐一些耳机", &Default::default())?;
/// println!("{}", recommendation.response);
/// ```
#[derive(Debug, Clone)]
pub struct ShopEngine {
    config: GlobalConfig,
    catalog: Arc<Catalog>,
    dictionary: Arc<MatchDictionary>,
}

impl ShopEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create an engine, loading the catalog and the match dictionary.
    ///
    /// # Errors
    ///
    /// A missing or invalid catalog, or an invalid dictionary override.
    pub fn from_config(config: GlobalConfig) -> ShopResult<Self> {
        let catalog = Catalog::load(&config.data.catalog_path())?;
        let dictionary = match &config.data.dictionary_path {
            Some(path) => MatchDictionary::from_path(path)?,
            None => MatchDictionary::builtin(),
        };

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            dictionary: Arc::new(dictionary),
        })
    }

    /// Create an engine from the default configuration file.
    pub fn with_defaults() -> ShopResult<Self> {
        Self::from_config(GlobalConfig::load_default()?)
    }

    /// Create an engine from a configuration file at `path`.
    pub fn with_config(path: &Path) -> ShopResult<Self> {
        Self::from_config(GlobalConfig::from_path(path)?)
    }

    /// Override the device preference for this engine instance.
    pub fn set_device(&mut self, device: DevicePreference) {
        self.config.device = device;
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // -------------------------------------------------------------------------
    // Recommendation
    // -------------------------------------------------------------------------

    /// Load models, open the index and assemble the pipeline.
    ///
    /// The index is required. A missing embedding model leaves the pipeline
    /// answering from keyword matches only. The reranker and the generator
    /// are optional and degrade when unavailable.
    pub fn recommender(&self) -> ShopResult<Recommender> {
        let embedding_config = self.config.resolved_embedding_config();
        let embedder: Arc<dyn EmbeddingBackend> = match create_embedding_backend(&embedding_config)
        {
            Ok(backend) => Arc::from(backend),
            Err(ShopError::EmbeddingProviderUnavailable { reason, .. }) => {
                tracing::warn!(
                    "Embedding model '{}' unavailable, answering from keyword matches only: {}",
                    embedding_config.model_id,
                    reason
                );
                Arc::new(UnavailableEmbedding::new(embedding_config.model_id, reason))
            }
            Err(e) => return Err(e),
        };
        let index = open_index(&self.config.data.index_dir(), embedder.as_ref(), &self.catalog)?;

        let scorer: Option<Arc<dyn RelevanceScorer>> =
            create_relevance_scorer(&self.config.resolved_reranker_config()).map(Arc::from);
        let generator: Option<Arc<dyn GeneratorBackend>> =
            create_generator(&self.config.generator).map(Arc::from);

        Ok(Recommender::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.dictionary),
            embedder,
            Arc::new(index),
            self.config.pipeline.clone(),
        )
        .with_scorer(scorer)
        .with_generator(generator))
    }

    /// Answer a free-text query.
    pub fn ask(&self, query: &str, options: &RecommendOptions) -> ShopResult<Recommendation> {
        self.recommender()?.recommend_with(query, options)
    }

    /// Recommend products to go with a cart.
    ///
    /// Carts without a known product are answered from the popular list
    /// without loading models.
    pub fn cart<S: AsRef<str>>(
        &self,
        ids: &[S],
        options: RecommendOptions,
    ) -> ShopResult<CartRecommendation> {
        match plan_cart(&self.catalog, &self.config.cart, ids) {
            CartPlan::Popular(products) => Ok(CartRecommendation::Popular { products }),
            plan => plan.run(&self.recommender()?, options),
        }
    }

    // -------------------------------------------------------------------------
    // Catalog, index, status
    // -------------------------------------------------------------------------

    /// Catalog products, optionally restricted to one category.
    pub fn products(&self, category: Option<Category>) -> Vec<Product> {
        self.catalog
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .cloned()
            .collect()
    }

    /// Embed the catalog into the configured index directory.
    pub fn build_index(&self) -> ShopResult<IndexBuildReport> {
        let embedder = create_embedding_backend(&self.config.resolved_embedding_config())?;
        let dir = self.config.data.index_dir();
        let report = build_index(&self.catalog, embedder.as_ref(), &dir)?;
        tracing::info!(
            "Built index with {} vectors at {} in {}ms",
            report.count,
            dir.display(),
            report.duration_ms
        );
        Ok(report)
    }

    /// Health report for this engine's configuration.
    pub fn status(&self) -> StatusReport {
        StatusReport::collect(&self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::testing::MockEmbeddingBackend;
    use tempfile::TempDir;

    const PRODUCTS: &str = r#"[
        {"product_id": "ELEC001", "product_name": "蓝牙耳机", "category": "电子产品",
         "description": "降噪无线耳机", "price": 199.0},
        {"product_id": "SPORTS001", "product_name": "跑步鞋", "category": "运动户外",
         "description": "轻便透气缓震跑鞋", "price": 299.0},
        {"product_id": "BOOK001", "product_name": "罗马史", "category": "书籍",
         "description": "古罗马历史通俗读物", "price": 59.0}
    ]"#;

    fn engine_in(dir: &Path) -> ShopEngine {
        std::fs::write(dir.join("products.json"), PRODUCTS).unwrap();
        let mut config = GlobalConfig::default_for_testing();
        config.data = DataConfig {
            catalog_path: Some(dir.join("products.json")),
            index_dir: Some(dir.join("index")),
            dictionary_path: None,
        };
        config.embedding.local_path = Some(dir.join("no-model"));
        ShopEngine::from_config(config).unwrap()
    }

    #[test]
    fn test_missing_catalog_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut config = GlobalConfig::default_for_testing();
        config.data.catalog_path = Some(tmp.path().join("missing.json"));
        let err = ShopEngine::from_config(config).unwrap_err();
        assert!(matches!(err, ShopError::CatalogNotFound { .. }));
    }

    #[test]
    fn test_products_by_category() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(tmp.path());
        assert_eq!(engine.products(None).len(), 3);

        let books = engine.products(Some(Category::Books));
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, "BOOK001");
    }

    #[test]
    fn test_empty_cart_needs_no_models() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(tmp.path());
        let out = engine.cart::<&str>(&[], RecommendOptions::default()).unwrap();
        assert!(out.is_popular());

        let out = engine.cart(&["NOPE"], RecommendOptions::default()).unwrap();
        match out {
            CartRecommendation::Popular { products } => assert_eq!(products.len(), 3),
            other => panic!("Expected Popular, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_embedding_model_answers_from_keywords() {
        let tmp = TempDir::new().unwrap();
        let mut engine = engine_in(tmp.path());
        engine.config.embedding.model_id = "mock-embedding".to_string();
        let embedder = MockEmbeddingBackend::new(vec![1.0, 0.0]);
        build_index(&engine.catalog, &embedder, &engine.config.data.index_dir()).unwrap();

        let rec = engine.ask("推荐一些耳机", &RecommendOptions::default()).unwrap();
        assert!(rec.debug.embedding_degraded);
        assert_eq!(rec.products[0].product.id, "ELEC001");

        // nothing to fall back on
        let err = engine.ask("zzz", &RecommendOptions::default()).unwrap_err();
        assert!(matches!(err, ShopError::EmbeddingProviderUnavailable { .. }));
    }

    #[test]
    fn test_known_cart_without_index_fails() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(tmp.path());
        let err = engine.cart(&["ELEC001"], RecommendOptions::default()).unwrap_err();
        assert!(matches!(err, ShopError::IndexNotFound { .. }));
    }

    #[test]
    fn test_status_without_index() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(tmp.path());
        let report = engine.status();
        assert!(report.catalog.loaded);
        assert_eq!(report.catalog.count, Some(3));
        assert!(!report.index.exists);
        assert!(!report.is_ready());
    }
}
