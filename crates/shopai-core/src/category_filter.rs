//! Intent-driven category filter.
//!
//! With a detected category, candidates of that category are boosted and the
//! rest survive only when they are already very close to the query. Without
//! one, candidates pass through untouched. Input order is preserved.

use crate::candidate::Candidate;
use crate::catalog::Category;
use crate::config::PipelineConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryFilter {
    /// Subtracted from same-category distances.
    pub boost: f32,
    /// Other-category candidates are kept only below this raw distance.
    pub cross_category_threshold: f32,
}

impl CategoryFilter {
    pub fn new(boost: f32, cross_category_threshold: f32) -> Self {
        Self {
            boost,
            cross_category_threshold,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.category_boost, config.cross_category_threshold)
    }

    pub fn apply<'a>(
        &self,
        candidates: Vec<Candidate<'a>>,
        target: Option<Category>,
    ) -> Vec<Candidate<'a>> {
        let Some(target) = target else {
            tracing::debug!("No category intent, keeping {} candidates", candidates.len());
            return candidates;
        };

        let before = candidates.len();
        let kept: Vec<Candidate<'a>> = candidates
            .into_iter()
            .filter_map(|c| {
                if c.product.category == target {
                    Some(Candidate::new(c.product, c.distance - self.boost))
                } else if c.distance < self.cross_category_threshold {
                    Some(c)
                } else {
                    tracing::trace!(
                        "Dropping '{}' ({}, distance {:.4})",
                        c.product.name,
                        c.product.category,
                        c.distance
                    );
                    None
                }
            })
            .collect();

        tracing::debug!(
            "Category filter for {}: kept {}/{}",
            target,
            kept.len(),
            before
        );
        kept
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}
