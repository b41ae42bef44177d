//! Query expansion for improving retrieval recall.
//!
//! A query mentioning a known product word is expanded with that word's
//! synonyms before it is embedded, so products described with a different
//! phrase still land among the nearest neighbors.
//!
//! Only the first matching rule fires, even if the query contains keywords of
//! several rules.
//!
//! ## Example
//!
//! ```ignore
//! use shopai_core::query_expansion::QueryExpander;
//! use shopai_core::dictionary::MatchDictionary;
//!
//! let dict = MatchDictionary::builtin();
//! let expander = QueryExpander::new(&dict, 5);
//! let variants = expander.expand("推荐一些耳机");
//! // ["推荐一些耳机", "蓝牙耳机", "运动耳机", "无线耳机"]
//! ```

use crate::dictionary::{ExpansionRule, MatchDictionary};

/// Rule-based synonym expander.
#[derive(Debug, Clone, Copy)]
pub struct QueryExpander<'a> {
    rules: &'a [ExpansionRule],
    max_variants: usize,
}

impl<'a> QueryExpander<'a> {
    /// `max_variants` counts the original query.
    pub fn new(dictionary: &'a MatchDictionary, max_variants: usize) -> Self {
        Self {
            rules: &dictionary.expansion_rules,
            max_variants,
        }
    }

    /// The first rule whose keyword occurs in the lowercased query.
    pub fn matching_rule(&self, query: &str) -> Option<&'a ExpansionRule> {
        let lower = query.to_lowercase();
        self.rules.iter().find(|r| lower.contains(r.keyword.as_str()))
    }

    /// Original query first, then the matched rule's synonyms; deduplicated
    /// preserving order and truncated to `max_variants`.
    pub fn expand(&self, query: &str) -> Vec<String> {
        let mut variants = vec![query.to_string()];

        if let Some(rule) = self.matching_rule(query) {
            tracing::debug!(
                "Expanding query with rule '{}': {:?}",
                rule.keyword,
                rule.expansions
            );
            for expansion in &rule.expansions {
                if !variants.iter().any(|v| v == expansion) {
                    variants.push(expansion.clone());
                }
            }
        }

        variants.truncate(self.max_variants.max(1));
        variants
    }
}

// ============================================================================
// Tests
// ============================================================================
