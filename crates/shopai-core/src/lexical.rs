//! Cheap lexical re-scoring ahead of the cross-encoder.
//!
//! Each whitespace token of the query (more than one char) found in
//! `"{name} {description}"` earns a fixed weight, and a bonus is added once if
//! any token occurs in the name. The result stays a distance:
//! `distance - semantic`, sorted ascending and truncated.

use crate::candidate::{sort_by_distance, Candidate};
use crate::config::PipelineConfig;
use crate::segment::Segmenter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalScorer {
    pub token_weight: f32,
    pub name_bonus: f32,
    pub top_k: usize,
}

impl LexicalScorer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            token_weight: config.lexical_token_weight,
            name_bonus: config.lexical_name_bonus,
            top_k: config.lexical_top_k,
        }
    }

    /// Lexical evidence for one product text, given lowercased tokens.
    fn semantic_score(&self, tokens: &[&str], name: &str, text: &str) -> f32 {
        let hits = tokens.iter().filter(|t| text.contains(**t)).count();
        let mut score = self.token_weight * hits as f32;
        if tokens.iter().any(|t| name.contains(*t)) {
            score += self.name_bonus;
        }
        score
    }

    /// Re-score and keep the best `top_k` candidates.
    pub fn rescore<'a>(&self, query: &str, candidates: Vec<Candidate<'a>>) -> Vec<Candidate<'a>> {
        let lowered = query.to_lowercase();
        let tokens = Segmenter::whitespace_tokens(&lowered, 2);

        let mut scored: Vec<Candidate<'a>> = candidates
            .into_iter()
            .map(|c| {
                let name = c.product.name.to_lowercase();
                let text = format!("{} {}", name, c.product.description.to_lowercase());
                let semantic = self.semantic_score(&tokens, &name, &text);
                Candidate::new(c.product, c.distance - semantic)
            })
            .collect();

        sort_by_distance(&mut scored);
        scored.truncate(self.top_k);
        scored
    }
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Category, Price, Product};

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
    }

    #[test]
    fn test_token_and_name_bonus() {
        let catalog = Catalog::from_products(vec![
            Product::new("A", "Kindle 阅读器", Category::Electronics, "墨水屏 电子书", Price::from_cents(1)),
            Product::new("B", "台灯", Category::Office, "适合 kindle 夜读", Price::from_cents(1)),
            Product::new("C", "哑铃", Category::SportsOutdoor, "力量训练", Price::from_cents(1)),
        ])
        .unwrap();

        let input = catalog.iter().map(|p| Candidate::new(p, 1.0)).collect();
        let out = LexicalScorer::default().rescore("Kindle 电子书 x", input);

        let ids: Vec<_> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        // A: both tokens in text (0.2) + name hit (0.2)
        assert_close(out[0].distance, 0.6);
        // B: "kindle" in description only
        assert_close(out[1].distance, 0.9);
        assert_close(out[2].distance, 1.0);
    }

    #[test]
    fn test_unsegmented_query_has_no_effect_on_order() {
        let catalog = crate::testing::sample_catalog();
        let input = vec![
            Candidate::new(catalog.get("ELEC002").unwrap(), 0.4),
            Candidate::new(catalog.get("ELEC001").unwrap(), 0.2),
        ];
        // a single-token query is tested as a whole
        let out = LexicalScorer::default().rescore("推荐一些耳机", input);
        let ids: Vec<_> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["ELEC001", "ELEC002"]);
        assert_close(out[0].distance, 0.2);
    }

    #[test]
    fn test_truncates_to_top_k() {
        let catalog = crate::testing::sample_catalog();
        let input = catalog
            .iter()
            .enumerate()
            .map(|(i, p)| Candidate::new(p, i as f32))
            .collect();
        let scorer = LexicalScorer {
            top_k: 3,
            ..LexicalScorer::default()
        };
        let out = scorer.rescore("zz", input);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].id(), "ELEC001");
    }
}
