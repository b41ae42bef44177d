//! # shopai-core
//!
//! **Shopping assistant** – product recommendation pipeline library.
//!
//! This crate turns a free-text shopping query (typed, or synthesized from a
//! cart) into a short ranked product list plus a natural-language reply. It
//! is consumed by the `shopai` CLI and other Rust tools.
//!
//! ## Main Types
//!
//! - [`ShopEngine`] – entry point: configuration, catalog, model wiring
//! - [`Recommender`] – the shared pipeline, one instance for every request
//! - [`Recommendation`] – result of one pipeline run
//! - [`ShopError`] – domain-specific error type
//!
//! ## Pipeline
//!
//! ```text
//! query → intent → keyword matcher ─┐
//!       → query expansion → retriever ─┴→ merge → category filter
//!       → lexical re-scorer → fusion reranker → composer
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] / [`dictionary`] – immutable shop data
//! - [`intent`], [`keyword_matcher`], [`query_expansion`], [`retrieval`],
//!   [`category_filter`], [`lexical`], [`reranker`], [`composer`] – stages
//! - [`pipeline`] – the orchestrator; [`cart`] – cart flow
//! - [`model_adapter`] / [`db_adapter`] – bridges to `shopai-model` and `shopai-db`
//!
//! ## Example
//!
//! ```ignore
//! use shopai_core::{GlobalConfig, RecommendOptions, ShopEngine};
//!
//! let engine = ShopEngine::from_config(GlobalConfig::load_default()?)?;
//! let rec = engine.ask("推荐一些耳机", &RecommendOptions::default())?;
//! for product in rec.recommended_products(engine.catalog()) {
//!     println!("{} ¥{}", product.name, product.price);
//! }
//! ```

// Modules
pub mod candidate;
pub mod cart;
pub mod catalog;
pub mod category_filter;
pub mod composer;
pub mod config;
pub mod constants;
pub mod db_adapter;
pub mod dictionary;
pub mod embedding;
pub mod engine;
pub mod errors;
pub mod index;
pub mod intent;
pub mod keyword_matcher;
pub mod lexical;
pub mod model_adapter;
pub mod pipeline;
pub mod query_expansion;
pub mod reranker;
pub mod retrieval;
pub mod segment;
pub mod status;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use candidate::{sort_by_distance, Candidate, CandidatePool};
pub use cart::{plan_cart, recommend_for_cart, CartPlan, CartRecommendation};
pub use catalog::{Catalog, Category, Price, Product};
pub use category_filter::CategoryFilter;
pub use composer::{compose, ComposedBy, Composition, GeneratorBackend};
pub use config::{
    CartConfig, DataConfig, DevicePreference, EmbeddingConfig, FusionConfig, GeneratorConfig,
    GlobalConfig, PipelineConfig, RerankerConfig,
};
pub use constants::{GLOBAL_CONFIG_FILENAME, SHOPAI_CONFIG_ENV, SHOPAI_DEVICE_ENV, SHOPAI_HOME_DIR};
pub use dictionary::MatchDictionary;
pub use embedding::{EmbeddingBackend, UnavailableEmbedding};
pub use engine::ShopEngine;
pub use errors::{ShopError, ShopResult};
pub use index::{IndexHit, ProductIndex};
pub use intent::{Intent, QueryContext};
pub use keyword_matcher::{KeywordMatcher, KeywordMatches, MatchPass};
pub use lexical::LexicalScorer;
pub use pipeline::{
    PipelineDebugInfo, PipelineStage, RecommendOptions, Recommendation, Recommender, StageTimings,
};
pub use query_expansion::QueryExpander;
pub use reranker::{FusionOutcome, FusionReranker, RankedProduct, RelevanceScorer};
pub use retrieval::EmbeddingRetriever;
pub use segment::Segmenter;
pub use status::{CatalogStatus, DictionaryStatus, GeneratorStatus, ModelStatus, StatusReport};

// shopai-db adapter - persisted embedding index
pub use db_adapter::{
    build_index, from_db_error, inspect_index, open_index, DbProductIndex, IndexBuildReport,
    IndexStatus,
};

// shopai-model adapter - embeddings, relevance scoring, generation
pub use model_adapter::{
    create_embedding_backend, create_generator, create_relevance_scorer, from_model_error,
    ModelEmbeddingBackend, ModelGenerator, ModelRerankerBackend,
};
