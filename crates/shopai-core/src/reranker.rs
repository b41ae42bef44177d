//! Fusion reranking: cross-encoder relevance plus lexical evidence.
//!
//! The cross-encoder alone is not trusted on a small catalog. Every candidate
//! also earns a keyword weight from direct lexical evidence, and the
//! acceptance threshold is relaxed for candidates with strong evidence:
//!
//! 1. `combined = cross + keyword_weight`, sorted descending.
//! 2. Reject-all when the top candidate has no keyword weight and a combined
//!    score below `reject_epsilon`.
//! 3. Optional relevance gate on the detected query intent.
//! 4. Keep candidates whose `combined / top` reaches the strong or weak
//!    threshold, then truncate to `final_k`.
//!
//! The relevance model is a capability behind [`RelevanceScorer`]; the Candle
//! cross-encoder is adapted in [`model_adapter`](crate::model_adapter).

use serde::Serialize;

use crate::candidate::Candidate;
use crate::catalog::Product;
use crate::config::FusionConfig;
use crate::dictionary::MatchDictionary;
use crate::errors::{ShopError, ShopResult};
use crate::intent::detect_category;
use crate::segment::Segmenter;

// ============================================================================
// RelevanceScorer Trait
// ============================================================================

/// Pairwise relevance capability (cross-encoder). Higher is more relevant.
pub trait RelevanceScorer: Send + Sync {
    /// Get the model ID this scorer uses.
    fn model_id(&self) -> &str;

    /// Score a batch of documents against a query, in document order.
    fn score_batch(&self, query: &str, documents: &[String]) -> ShopResult<Vec<f32>>;

    /// Warm up the scorer by running a dummy inference.
    fn warm_up(&self) -> ShopResult<()> {
        let _ = self.score_batch("warmup query", &["warmup document".to_string()])?;
        Ok(())
    }
}

/// Score `candidates` against `query`, checking one score per candidate.
///
/// A missing scorer (reranker disabled) scores every candidate 0.0.
pub fn cross_scores(
    scorer: Option<&dyn RelevanceScorer>,
    query: &str,
    candidates: &[Candidate<'_>],
) -> ShopResult<Vec<f32>> {
    let Some(scorer) = scorer else {
        return Ok(vec![0.0; candidates.len()]);
    };
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let documents: Vec<String> = candidates.iter().map(|c| c.product.rerank_text()).collect();
    let scores = scorer.score_batch(query, &documents)?;
    if scores.len() != documents.len() {
        return Err(ShopError::RerankerInferenceFailed {
            model_id: scorer.model_id().to_string(),
            reason: format!("expected {} scores, got {}", documents.len(), scores.len()),
        });
    }
    Ok(scores)
}

// ============================================================================
// RankedProduct
// ============================================================================

/// A final recommendation with its score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProduct {
    pub product: Product,
    pub cross_score: f32,
    pub keyword_weight: f32,
    pub combined_score: f32,
    /// `-combined_score`, so lower is better like every other stage.
    pub distance: f32,
}

/// Outcome of [`FusionReranker::rerank`].
#[derive(Debug, Clone, Default)]
pub struct FusionOutcome {
    pub ranked: Vec<RankedProduct>,
    /// The reject-all rule fired.
    pub rejected_all: bool,
    /// Candidates removed by the relevance gate.
    pub gated_out: usize,
}

// ============================================================================
// FusionReranker
// ============================================================================

struct Scored<'a> {
    product: &'a Product,
    cross: f32,
    weight: f32,
    combined: f32,
}

pub struct FusionReranker<'a> {
    config: &'a FusionConfig,
    dictionary: &'a MatchDictionary,
    segmenter: Segmenter,
}

impl<'a> FusionReranker<'a> {
    pub fn new(config: &'a FusionConfig, dictionary: &'a MatchDictionary, segmenter: Segmenter) -> Self {
        Self {
            config,
            dictionary,
            segmenter,
        }
    }

    /// Lexical evidence of `product` for the segmented query tokens.
    ///
    /// A token found in the name earns the name weight, otherwise one found in
    /// the description earns the description weight. Each token mapping to the
    /// product's own category adds the category weight.
    pub fn keyword_weight(&self, tokens: &[&str], product: &Product) -> f32 {
        let name = product.name.to_lowercase();
        let description = product.description.to_lowercase();

        let mut weight = 0.0;
        for token in tokens {
            if name.contains(token) {
                weight += self.config.name_weight;
            } else if description.contains(token) {
                weight += self.config.description_weight;
            }
        }
        for token in tokens {
            if self.dictionary.fusion_category(token) == Some(product.category) {
                weight += self.config.category_weight;
            }
        }
        weight
    }

    /// Fuse `cross` scores (one per candidate) with keyword weights and apply
    /// the acceptance rules. `normalized` is the lowercased query.
    pub fn rerank(&self, normalized: &str, candidates: &[Candidate<'a>], cross: &[f32]) -> FusionOutcome {
        if candidates.is_empty() {
            return FusionOutcome::default();
        }

        let tokens = self.segmenter.tokens(normalized, 2);
        let mut scored: Vec<Scored<'a>> = candidates
            .iter()
            .zip(cross.iter().copied().chain(std::iter::repeat(0.0)))
            .map(|(c, cross)| {
                let weight = self.keyword_weight(&tokens, c.product);
                Scored {
                    product: c.product,
                    cross,
                    weight,
                    combined: cross + weight,
                }
            })
            .collect();

        scored.retain(|s| !s.combined.is_nan());
        scored.sort_by(|a, b| b.combined.total_cmp(&a.combined));
        let Some(top) = scored.first() else {
            return FusionOutcome::default();
        };
        let top_score = top.combined;

        if top.weight == 0.0 && top_score < self.config.reject_epsilon {
            tracing::debug!(
                "Reject-all: top '{}' has no keyword evidence and score {:.4}",
                top.product.name,
                top_score
            );
            return FusionOutcome {
                rejected_all: true,
                ..FusionOutcome::default()
            };
        }

        let mut gated_out = 0;
        if self.config.relevance_gate {
            if let Some(intent) = detect_category(normalized, &self.dictionary.relevance_intents) {
                let before = scored.len();
                scored.retain(|s| {
                    s.product.category == intent.category
                        || s.weight > self.config.strong_evidence_weight
                });
                gated_out = before - scored.len();
                tracing::debug!(
                    "Relevance gate '{}' removed {} candidates",
                    intent.name,
                    gated_out
                );
            }
        }

        let ranked: Vec<RankedProduct> = scored
            .into_iter()
            .filter(|s| self.passes_threshold(s, top_score))
            .take(self.config.final_k)
            .map(|s| RankedProduct {
                product: s.product.clone(),
                cross_score: s.cross,
                keyword_weight: s.weight,
                combined_score: s.combined,
                distance: -s.combined,
            })
            .collect();

        tracing::debug!("Fusion kept {} candidates (top {:.4})", ranked.len(), top_score);
        FusionOutcome {
            ranked,
            rejected_all: false,
            gated_out,
        }
    }

    fn passes_threshold(&self, scored: &Scored<'_>, top_score: f32) -> bool {
        let threshold = if scored.weight > self.config.strong_evidence_weight {
            self.config.strong_threshold
        } else {
            self.config.weak_threshold
        };

        let ratio = if top_score > 0.0 {
            scored.combined / top_score
        } else if scored.combined == top_score {
            1.0
        } else {
            0.0
        };

        ratio >= threshold
    }
}

// ============================================================================
// Tests
// ============================================================================
