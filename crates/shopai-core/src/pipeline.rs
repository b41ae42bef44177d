//! The recommendation pipeline.
//!
//! [`Recommender::recommend`] runs one request through every stage:
//!
//! ```text
//! Start → IntentClassified → GreetingDone
//!                          → Matching → Filtered → Rescored → Reranked → Composed
//! ```
//!
//! Keyword matches and embedding neighbors are merged into one candidate
//! pool (minimum distance per product) before the category filter. Capability
//! failures degrade the request instead of aborting it whenever a partial
//! result is still usable:
//!
//! - embedding/index failure with keyword matches: keyword candidates only
//! - relevance scoring failure: cross scores of 0.0
//! - generation failure: templated response
//!
//! Everything a caller needs comes back in one [`Recommendation`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::candidate::CandidatePool;
use crate::catalog::{Catalog, Category, Product};
use crate::category_filter::CategoryFilter;
use crate::composer::{compose, ComposedBy, GeneratorBackend};
use crate::config::PipelineConfig;
use crate::constants::GREETING_REPLY;
use crate::dictionary::MatchDictionary;
use crate::embedding::EmbeddingBackend;
use crate::errors::ShopResult;
use crate::index::ProductIndex;
use crate::intent::{Intent, QueryContext};
use crate::keyword_matcher::{KeywordMatcher, MatchPass};
use crate::lexical::LexicalScorer;
use crate::query_expansion::QueryExpander;
use crate::reranker::{cross_scores, FusionReranker, RankedProduct, RelevanceScorer};
use crate::retrieval::EmbeddingRetriever;
use crate::segment::Segmenter;

// ============================================================================
// PipelineStage
// ============================================================================

/// Per-request state. No transition re-enters an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    IntentClassified,
    GreetingDone,
    Matching,
    Filtered,
    Rescored,
    Reranked,
    Composed,
}

impl PipelineStage {
    /// Whether a request can end in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GreetingDone | Self::Composed)
    }
}

// ============================================================================
// Debug info
// ============================================================================

/// Stage timings in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub keyword_ms: u64,
    pub retrieval_ms: u64,
    pub filter_ms: u64,
    pub rerank_ms: u64,
    pub compose_ms: u64,
    pub total_ms: u64,
}

/// Technical metadata for debugging one request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDebugInfo {
    /// Keyword pass that produced matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_pass: Option<MatchPass>,
    pub keyword_matches: usize,
    /// Unique products from the embedding index.
    pub retrieved: usize,
    /// Pool size after merging keyword matches and exclusions.
    pub merged: usize,
    pub filtered: usize,
    pub rescored: usize,
    pub reranked: usize,
    pub retrieval_skipped: bool,
    pub rejected_all: bool,
    pub embedding_degraded: bool,
    pub relevance_degraded: bool,
    pub generator_degraded: bool,
    pub timings: StageTimings,
}

// ============================================================================
// RecommendOptions
// ============================================================================

/// Per-request options.
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    /// Product ids that must not appear in any result list.
    pub exclude: HashSet<String>,
    /// Use the generator when one is configured.
    pub generate: bool,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            exclude: HashSet::new(),
            generate: true,
        }
    }
}

impl RecommendOptions {
    pub fn with_exclusions<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn without_generation(mut self) -> Self {
        self.generate = false;
        self
    }

    fn is_excluded(&self, id: &str) -> bool {
        self.exclude.contains(id)
    }
}

// ============================================================================
// Recommendation
// ============================================================================

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// The query as received, trimmed.
    pub query: String,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub expansions: Vec<String>,
    /// Terminal stage reached.
    pub stage: PipelineStage,
    /// Final candidates, best first.
    pub products: Vec<RankedProduct>,
    /// Best pre-fusion candidates, the fallback product set.
    pub last_matched: Vec<Product>,
    pub response: String,
    pub composed_by: ComposedBy,
    pub debug: PipelineDebugInfo,
}

impl Recommendation {
    /// No candidate survived. Not an error.
    pub fn is_no_match(&self) -> bool {
        self.composed_by == ComposedBy::NoMatch
    }

    /// Products to show next to the response.
    ///
    /// Final candidates named in a generated response first, then the final
    /// candidates, then `last_matched`. A generated response may name any
    /// catalog product, including excluded ones, so mentions outside the
    /// final candidates are ignored.
    pub fn recommended_products(&self, catalog: &Catalog) -> Vec<Product> {
        if self.composed_by == ComposedBy::Generator {
            let mentioned: Vec<Product> = catalog
                .mentioned_in(&self.response)
                .filter(|p| self.products.iter().any(|r| r.product.id == p.id))
                .cloned()
                .collect();
            if !mentioned.is_empty() {
                return mentioned;
            }
        }
        if !self.products.is_empty() {
            return self.products.iter().map(|r| r.product.clone()).collect();
        }
        self.last_matched.clone()
    }
}

// ============================================================================
// Recommender
// ============================================================================

/// Shared, immutable pipeline. `Send + Sync`; one instance serves every
/// request.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<Catalog>,
    dictionary: Arc<MatchDictionary>,
    embedder: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn ProductIndex>,
    scorer: Option<Arc<dyn RelevanceScorer>>,
    generator: Option<Arc<dyn GeneratorBackend>>,
    config: PipelineConfig,
    segmenter: Segmenter,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("products", &self.catalog.len())
            .field("index_len", &self.index.len())
            .field("embedder", &self.embedder.model_id())
            .field("scorer", &self.scorer.as_ref().map(|s| s.model_id().to_string()))
            .field("generator", &self.generator.as_ref().map(|g| g.model_id().to_string()))
            .finish()
    }
}

impl Recommender {
    pub fn new(
        catalog: Arc<Catalog>,
        dictionary: Arc<MatchDictionary>,
        embedder: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn ProductIndex>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            catalog,
            dictionary,
            embedder,
            index,
            scorer: None,
            generator: None,
            config,
            segmenter: Segmenter::shared(),
        }
    }

    pub fn with_scorer(mut self, scorer: Option<Arc<dyn RelevanceScorer>>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_generator(mut self, generator: Option<Arc<dyn GeneratorBackend>>) -> Self {
        self.generator = generator;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dictionary(&self) -> &MatchDictionary {
        &self.dictionary
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline with default options.
    pub fn recommend(&self, query: &str) -> ShopResult<Recommendation> {
        self.recommend_with(query, &RecommendOptions::default())
    }

    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// - [`ShopError::InvalidArgument`](crate::errors::ShopError::InvalidArgument)
    ///   for an empty query
    /// - the embedding error when retrieval fails and no keyword match exists
    pub fn recommend_with(
        &self,
        query: &str,
        options: &RecommendOptions,
    ) -> ShopResult<Recommendation> {
        let started = Instant::now();
        let mut stage = PipelineStage::Start;
        let mut debug_info = PipelineDebugInfo::default();

        let mut ctx = QueryContext::new(query, &self.dictionary)?;
        advance(&mut stage, PipelineStage::IntentClassified);
        tracing::debug!(
            "Query '{}' classified as {} (category: {:?})",
            ctx.raw,
            ctx.intent,
            ctx.category
        );

        if ctx.intent == Intent::Greeting {
            advance(&mut stage, PipelineStage::GreetingDone);
            debug_info.timings.total_ms = elapsed_ms(started);
            return Ok(Recommendation {
                request_id: Uuid::new_v4(),
                created_at: Utc::now(),
                query: ctx.raw,
                intent: ctx.intent,
                category: ctx.category,
                expansions: ctx.expansions,
                stage,
                products: Vec::new(),
                last_matched: Vec::new(),
                response: GREETING_REPLY.to_string(),
                composed_by: ComposedBy::Greeting,
                debug: debug_info,
            });
        }

        // Keyword matching
        advance(&mut stage, PipelineStage::Matching);
        let t = Instant::now();
        let matcher = KeywordMatcher::new(
            &self.catalog,
            &self.dictionary,
            self.segmenter,
            self.config.keyword_score,
        );
        let mut keyword = matcher.find(&ctx.normalized);
        keyword.candidates.retain(|c| !options.is_excluded(c.id()));
        debug_info.keyword_pass = keyword.pass;
        debug_info.keyword_matches = keyword.len();
        debug_info.timings.keyword_ms = elapsed_ms(t);

        ctx.expansions = QueryExpander::new(&self.dictionary, self.config.max_expansions)
            .expand(&ctx.raw);

        let mut pool = CandidatePool::new();
        if self.config.require_keyword_match && keyword.is_empty() {
            tracing::debug!("No keyword match and requireKeywordMatch is set");
        } else if self
            .config
            .retrieval_skip_threshold
            .is_some_and(|threshold| keyword.len() >= threshold)
        {
            tracing::debug!("Skipping retrieval: {} keyword matches", keyword.len());
            debug_info.retrieval_skipped = true;
        } else {
            let t = Instant::now();
            let retriever = EmbeddingRetriever::new(
                &self.catalog,
                self.embedder.as_ref(),
                self.index.as_ref(),
                self.config.neighbor_k,
            );
            match retriever.retrieve(&ctx.expansions) {
                Ok(retrieved) => pool = retrieved,
                Err(e) if e.is_capability_failure() && !keyword.is_empty() => {
                    tracing::warn!(
                        "Embedding retrieval failed, continuing with {} keyword matches: {}",
                        keyword.len(),
                        e
                    );
                    debug_info.embedding_degraded = true;
                }
                Err(e) => return Err(e),
            }
            debug_info.retrieved = pool.len();
            debug_info.timings.retrieval_ms = elapsed_ms(t);
        }

        pool.extend(keyword.candidates.iter().copied());
        pool.remove_where(|id| options.is_excluded(id));
        debug_info.merged = pool.len();

        // Category filter and lexical re-scoring
        let t = Instant::now();
        let filtered = CategoryFilter::from_config(&self.config).apply(pool.into_vec(), ctx.category);
        debug_info.filtered = filtered.len();
        advance(&mut stage, PipelineStage::Filtered);

        let rescored = LexicalScorer::from_config(&self.config).rescore(&ctx.raw, filtered);
        debug_info.rescored = rescored.len();
        advance(&mut stage, PipelineStage::Rescored);
        debug_info.timings.filter_ms = elapsed_ms(t);

        let last_matched: Vec<Product> = if rescored.is_empty() {
            keyword.candidates.iter()
        } else {
            rescored.iter()
        }
        .take(self.config.last_matched_k)
        .map(|c| c.product.clone())
        .collect();

        // Fusion
        let t = Instant::now();
        let cross = match cross_scores(self.scorer.as_deref(), &ctx.raw, &rescored) {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!("Relevance scoring failed, using keyword evidence only: {}", e);
                debug_info.relevance_degraded = true;
                vec![0.0; rescored.len()]
            }
        };
        let outcome = FusionReranker::new(&self.config.fusion, &self.dictionary, self.segmenter)
            .rerank(&ctx.normalized, &rescored, &cross);
        debug_info.rejected_all = outcome.rejected_all;
        debug_info.reranked = outcome.ranked.len();
        advance(&mut stage, PipelineStage::Reranked);
        debug_info.timings.rerank_ms = elapsed_ms(t);

        // Composition
        let t = Instant::now();
        let generator = if options.generate {
            self.generator.as_deref()
        } else {
            None
        };
        let composition = compose(&ctx.raw, &outcome.ranked, generator);
        debug_info.generator_degraded = composition.generator_degraded;
        advance(&mut stage, PipelineStage::Composed);
        debug_info.timings.compose_ms = elapsed_ms(t);
        debug_info.timings.total_ms = elapsed_ms(started);

        tracing::debug!(
            "Recommendation for '{}': {} products via {:?} in {}ms",
            ctx.raw,
            outcome.ranked.len(),
            composition.composed_by,
            debug_info.timings.total_ms
        );

        Ok(Recommendation {
            request_id: Uuid::new_v4(),
            created_at: Utc::now(),
            query: ctx.raw,
            intent: ctx.intent,
            category: ctx.category,
            expansions: ctx.expansions,
            stage,
            products: outcome.ranked,
            last_matched,
            response: composition.text,
            composed_by: composition.composed_by,
            debug: debug_info,
        })
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    tracing::trace!("Pipeline stage {:?} -> {:?}", stage, next);
    *stage = next;
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

// ============================================================================
// Tests
// ============================================================================
