//! Query intent classification and the per-request query context.

use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::dictionary::{CategoryRule, MatchDictionary};
use crate::errors::{ShopError, ShopResult};

/// Coarse purpose of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    SpecificProduct,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Greeting => write!(f, "greeting"),
            Intent::SpecificProduct => write!(f, "specific_product"),
        }
    }
}

/// `Greeting` if the normalized query contains any greeting token.
///
/// Tokens are matched as substrings, so `hi` also fires inside longer words.
pub fn classify_intent(normalized: &str, dictionary: &MatchDictionary) -> Intent {
    if dictionary
        .greetings
        .iter()
        .any(|g| normalized.contains(g.as_str()))
    {
        Intent::Greeting
    } else {
        Intent::SpecificProduct
    }
}

/// First rule in `rules` with a keyword occurring in `normalized`.
pub fn detect_category<'a>(normalized: &str, rules: &'a [CategoryRule]) -> Option<&'a CategoryRule> {
    rules.iter().find(|rule| rule.matches(normalized))
}

/// Per-request query state, discarded once the response is composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    /// Query as received, trimmed.
    pub raw: String,
    /// Lowercased query used for every keyword test.
    pub normalized: String,
    /// Expanded queries, original first.
    pub expansions: Vec<String>,
    pub intent: Intent,
    /// Category detected by the category filter's intent table.
    pub category: Option<Category>,
}

impl QueryContext {
    /// Normalize and classify a query. Empty queries are rejected.
    pub fn new(query: &str, dictionary: &MatchDictionary) -> ShopResult<Self> {
        let raw = query.trim();
        if raw.is_empty() {
            return Err(ShopError::InvalidArgument(
                "Query cannot be empty".to_string(),
            ));
        }

        let normalized = raw.to_lowercase();
        let intent = classify_intent(&normalized, dictionary);
        let category = detect_category(&normalized, &dictionary.filter_intents).map(|r| r.category);

        Ok(Self {
            raw: raw.to_string(),
            normalized,
            expansions: Vec::new(),
            intent,
            category,
        })
    }
}
