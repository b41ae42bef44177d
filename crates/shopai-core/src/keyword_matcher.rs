//! Keyword matching against the catalog.
//!
//! Three passes, each attempted only when the previous one found nothing:
//!
//! 1. **Product keywords**: the dictionary's near-synonym lists per product id,
//!    tested as substrings of the query, in dictionary order.
//! 2. **Full text**: segmented query tokens (≥ 2 chars) tested as substrings of
//!    `"{name} {category} {description}"`, in catalog order. The first hit
//!    short-circuits the product.
//! 3. **Category**: keyword→category rules tested as substrings of the query;
//!    every product of a hit category is included, in catalog order.
//!
//! The cascade is strict: pass 3 runs only when passes 1 and 2 are both
//! empty, never because they found "too few" products.
//!
//! Every match carries the same fixed score.

use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::{Catalog, Category, Product};
use crate::candidate::Candidate;
use crate::dictionary::MatchDictionary;
use crate::segment::Segmenter;

/// Which pass produced the matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    ProductKeywords,
    FullText,
    Category,
}

impl std::fmt::Display for MatchPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPass::ProductKeywords => write!(f, "product_keywords"),
            MatchPass::FullText => write!(f, "full_text"),
            MatchPass::Category => write!(f, "category"),
        }
    }
}

/// Result of [`KeywordMatcher::find`].
#[derive(Debug, Clone, Default)]
pub struct KeywordMatches<'a> {
    /// Matches in pass order, each scored with the matcher's fixed score.
    pub candidates: Vec<Candidate<'a>>,
    /// The pass that produced them, `None` when nothing matched.
    pub pass: Option<MatchPass>,
}

impl<'a> KeywordMatches<'a> {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Pure function of (query, catalog, dictionary).
#[derive(Debug, Clone, Copy)]
pub struct KeywordMatcher<'a> {
    catalog: &'a Catalog,
    dictionary: &'a MatchDictionary,
    segmenter: Segmenter,
    score: f32,
}

impl<'a> KeywordMatcher<'a> {
    pub fn new(
        catalog: &'a Catalog,
        dictionary: &'a MatchDictionary,
        segmenter: Segmenter,
        score: f32,
    ) -> Self {
        Self {
            catalog,
            dictionary,
            segmenter,
            score,
        }
    }

    /// Run the pass cascade on a normalized (lowercased) query.
    pub fn find(&self, normalized: &str) -> KeywordMatches<'a> {
        let passes: [(MatchPass, fn(&Self, &str) -> Vec<&'a Product>); 3] = [
            (MatchPass::ProductKeywords, Self::product_keyword_pass),
            (MatchPass::FullText, Self::full_text_pass),
            (MatchPass::Category, Self::category_pass),
        ];

        for (pass, run) in passes {
            let products = run(self, normalized);
            if !products.is_empty() {
                tracing::debug!("Keyword pass {:?} matched {} products", pass, products.len());
                return KeywordMatches {
                    candidates: products
                        .into_iter()
                        .map(|p| Candidate::new(p, self.score))
                        .collect(),
                    pass: Some(pass),
                };
            }
        }

        tracing::debug!("Keyword matcher found nothing");
        KeywordMatches::default()
    }

    fn product_keyword_pass(&self, query: &str) -> Vec<&'a Product> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();

        for entry in &self.dictionary.product_keywords {
            if !entry.keywords.iter().any(|k| query.contains(k.as_str())) {
                continue;
            }
            match self.catalog.get(&entry.product_id) {
                Some(product) if seen.insert(product.id.as_str()) => matched.push(product),
                Some(_) => {}
                None => tracing::trace!(
                    "Dictionary product '{}' is not in the catalog",
                    entry.product_id
                ),
            }
        }

        matched
    }

    fn full_text_pass(&self, query: &str) -> Vec<&'a Product> {
        let tokens = self.segmenter.tokens(query, 2);
        if tokens.is_empty() {
            return Vec::new();
        }

        self.catalog
            .iter()
            .filter(|product| {
                let full_text = format!(
                    "{} {} {}",
                    product.name, product.category, product.description
                )
                .to_lowercase();
                tokens.iter().any(|t| full_text.contains(t))
            })
            .collect()
    }

    fn category_pass(&self, query: &str) -> Vec<&'a Product> {
        let categories: HashSet<Category> = self
            .dictionary
            .category_rules
            .iter()
            .filter(|rule| rule.matches(query))
            .map(|rule| rule.category)
            .collect();

        if categories.is_empty() {
            return Vec::new();
        }

        tracing::debug!("Keyword category pass hit {:?}", categories);
        self.catalog
            .iter()
            .filter(|p| categories.contains(&p.category))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Price;

    fn catalog() -> Catalog {
        Catalog::from_products(vec![
            Product::new("ELEC001", "蓝牙耳机", Category::Electronics, "降噪无线耳机", Price::from_cents(19900)),
            Product::new("ELEC002", "充电宝", Category::Electronics, "大容量移动电源", Price::from_cents(8900)),
            Product::new("SPORTS001", "跑步鞋", Category::SportsOutdoor, "轻便透气缓震", Price::from_cents(29900)),
            Product::new("SPORTS008", "哑铃套装", Category::SportsOutdoor, "家用力量训练", Price::from_cents(15900)),
            Product::new("BOOK003", "挪威的森林", Category::Books, "村上春树经典小说", Price::from_cents(3900)),
            Product::new("OFFICE004", "人体工学椅", Category::Office, "可调节腰托", Price::from_cents(99900)),
        ])
        .unwrap()
    }

    fn matcher<'a>(catalog: &'a Catalog, dict: &'a MatchDictionary) -> KeywordMatcher<'a> {
        KeywordMatcher::new(catalog, dict, Segmenter::shared(), 0.5)
    }

    fn ids(matches: &KeywordMatches<'_>) -> Vec<String> {
        matches.candidates.iter().map(|c| c.id().to_string()).collect()
    }

    #[test]
    fn test_product_keyword_pass_headphones() {
        let catalog = catalog();
        let dict = MatchDictionary::builtin();
        let matches = matcher(&catalog, &dict).find("推荐一些耳机");

        assert_eq!(matches.pass, Some(MatchPass::ProductKeywords));
        assert_eq!(ids(&matches), vec!["ELEC001"]);
        assert_eq!(matches.candidates[0].distance, 0.5);
    }

    #[test]
    fn test_product_keyword_pass_follows_dictionary_order() {
        let catalog = catalog();
        let dict = MatchDictionary::builtin();
        // SPORTS001 precedes ELEC002 in the dictionary, not in the catalog
        let matches = matcher(&catalog, &dict).find("跑鞋和充电宝");
        assert_eq!(ids(&matches), vec!["SPORTS001", "ELEC002"]);
    }

    #[test]
    fn test_unknown_dictionary_ids_are_skipped() {
        let catalog = catalog();
        let dict = MatchDictionary::builtin();
        // 帐篷 maps to SPORTS003, absent from this catalog
        let matches = matcher(&catalog, &dict).find("帐篷");
        assert_ne!(matches.pass, Some(MatchPass::ProductKeywords));
    }

    #[test]
    fn test_full_text_pass_matches_description() {
        let catalog = catalog();
        let dict = MatchDictionary::builtin();
        let matches = matcher(&catalog, &dict).find("有没有无线的");

        assert_eq!(matches.pass, Some(MatchPass::FullText));
        assert_eq!(ids(&matches), vec!["ELEC001"]);
    }

    #[test]
    fn test_category_pass_runs_only_when_earlier_passes_empty() {
        let catalog = catalog();
        let dict = MatchDictionary::builtin();

        // 锻炼 hits the sports rule and no product keyword or catalog text
        let matches = matcher(&catalog, &dict).find("锻炼");
        assert_eq!(matches.pass, Some(MatchPass::Category));
        assert_eq!(ids(&matches), vec!["SPORTS001", "SPORTS008"]);

        // 哑铃 is a product keyword: the category pass never widens it to
        // the rest of 运动户外
        let matches = matcher(&catalog, &dict).find("哑铃");
        assert_eq!(matches.pass, Some(MatchPass::ProductKeywords));
        assert_eq!(ids(&matches), vec!["SPORTS008"]);
    }

    #[test]
    fn test_no_match() {
        let catalog = catalog();
        let dict = MatchDictionary::builtin();
        let matches = matcher(&catalog, &dict).find("zzz");
        assert!(matches.is_empty());
        assert_eq!(matches.pass, None);
    }

    #[test]
    fn test_matcher_is_idempotent() {
        let catalog = catalog();
        let dict = MatchDictionary::builtin();
        let m = matcher(&catalog, &dict);
        for query in ["推荐一些耳机", "锻炼", "经典小说", "跑鞋和充电宝"] {
            assert_eq!(ids(&m.find(query)), ids(&m.find(query)));
        }
    }
}
