//! End-to-end pipeline scenarios over the shipped catalog.
//!
//! Assertions are about which products survive and why, not about exact
//! scores, so they hold for any embedder that ranks concept matches first.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use shopai_core::{
    Candidate, CandidatePool, Category, CategoryFilter, ComposedBy, Intent, MatchPass,
    PipelineConfig, PipelineStage, Recommendation, ShopError,
};

use common::{shop_catalog, OfflineEmbedder, Shop};

fn ids(rec: &Recommendation) -> Vec<&str> {
    rec.products.iter().map(|r| r.product.id.as_str()).collect()
}

#[test]
fn test_headphones_query_recommends_headphones() {
    let shop = Shop::new();
    let rec = shop.recommender.recommend("推荐一些耳机").unwrap();

    assert_eq!(rec.intent, Intent::SpecificProduct);
    assert_eq!(rec.category, Some(Category::Electronics));
    assert_eq!(rec.stage, PipelineStage::Composed);
    assert_eq!(ids(&rec), vec!["ELEC001"]);
    assert_eq!(rec.composed_by, ComposedBy::Template);
    assert!(rec.response.contains("蓝牙耳机"));

    // strongest candidate carries name evidence, distance mirrors the score
    let top = &rec.products[0];
    assert!(top.keyword_weight >= 0.3);
    assert_eq!(top.distance, -top.combined_score);
}

#[test]
fn test_expansions_start_with_raw_query() {
    let shop = Shop::new();
    let rec = shop.recommender.recommend("  推荐一些耳机 ").unwrap();
    assert_eq!(rec.query, "推荐一些耳机");
    assert_eq!(rec.expansions[0], "推荐一些耳机");
    assert!(rec.expansions.len() <= 5);
    let unique: HashSet<_> = rec.expansions.iter().collect();
    assert_eq!(unique.len(), rec.expansions.len());
}

#[test]
fn test_keyword_and_vector_hits_merge_into_one_candidate() {
    let shop = Shop::new();
    let rec = shop.recommender.recommend("推荐一些耳机").unwrap();

    assert_eq!(rec.debug.keyword_pass, Some(MatchPass::ProductKeywords));
    assert_eq!(rec.debug.keyword_matches, 1);
    // ELEC001 came from both sources but is counted once
    assert_eq!(rec.debug.merged, rec.debug.retrieved);
    assert_eq!(rec.last_matched[0].id, "ELEC001");
}

#[test]
fn test_pool_keeps_minimum_distance() {
    let catalog = shop_catalog();
    let headphones = catalog.get("ELEC001").unwrap();

    let mut pool = CandidatePool::new();
    pool.insert(Candidate::new(headphones, 0.5));
    pool.insert(Candidate::new(headphones, 0.1));
    pool.insert(Candidate::new(headphones, 0.3));

    assert_eq!(pool.len(), 1);
    assert_eq!(pool.get("ELEC001").unwrap().distance, 0.1);
}

#[test]
fn test_category_filter_drops_distant_other_categories() {
    let catalog = shop_catalog();
    let candidates: Vec<Candidate> = catalog
        .iter()
        .enumerate()
        .map(|(i, p)| Candidate::new(p, i as f32 * 0.05))
        .collect();

    let filtered = CategoryFilter::default().apply(candidates.clone(), Some(Category::Books));

    for c in &filtered {
        let raw = candidates.iter().find(|o| o.id() == c.id()).unwrap().distance;
        if c.product.category == Category::Books {
            assert!((c.distance - (raw - 0.2)).abs() < 1e-6);
        } else {
            assert!(raw < 0.3, "{} kept at raw distance {}", c.id(), raw);
        }
    }
    // every book survives, order is preserved
    let books = catalog.by_category(Category::Books).count();
    assert_eq!(
        filtered.iter().filter(|c| c.product.category == Category::Books).count(),
        books
    );
    let positions: Vec<usize> = filtered
        .iter()
        .map(|c| candidates.iter().position(|o| o.id() == c.id()).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_novels_keep_only_strong_evidence() {
    let shop = Shop::new();
    let rec = shop.recommender.recommend("推荐小说").unwrap();

    assert_eq!(rec.category, Some(Category::Books));
    let got: HashSet<&str> = ids(&rec).into_iter().collect();
    assert_eq!(got, HashSet::from(["BOOK003", "BOOK005"]));
    assert!(rec.products.len() <= 3);
}

#[test]
fn test_unrelated_query_is_no_match() {
    let shop = Shop::new();
    let rec = shop.recommender.recommend("zzz").unwrap();

    assert!(rec.is_no_match());
    assert!(rec.debug.rejected_all);
    assert!(rec.products.is_empty());
    assert_eq!(rec.stage, PipelineStage::Composed);
    assert!(rec.last_matched.len() <= 5);
}

#[test]
fn test_greetings() {
    let shop = Shop::new();
    for query in ["你好", "您好，有什么推荐", "Hello there", "which headphones"] {
        let rec = shop.recommender.recommend(query).unwrap();
        assert_eq!(rec.intent, Intent::Greeting, "query: {}", query);
        assert_eq!(rec.stage, PipelineStage::GreetingDone);
        assert!(rec.products.is_empty());
    }
}

#[test]
fn test_empty_query_is_rejected() {
    let shop = Shop::new();
    assert!(matches!(
        shop.recommender.recommend(" \t").unwrap_err(),
        ShopError::InvalidArgument(_)
    ));
}

#[test]
fn test_offline_embedder_degrades_to_keyword_matches() {
    let shop = Shop::with(Arc::new(OfflineEmbedder), PipelineConfig::default());

    let rec = shop.recommender.recommend("推荐一些耳机").unwrap();
    assert!(rec.debug.embedding_degraded);
    assert_eq!(ids(&rec), vec!["ELEC001"]);

    let err = shop.recommender.recommend("zzz").unwrap_err();
    assert!(err.is_capability_failure());
}

#[test]
fn test_recommendation_json_shape() {
    let shop = Shop::new();
    let rec = shop.recommender.recommend("推荐一些耳机").unwrap();
    let json = serde_json::to_value(&rec).unwrap();

    assert!(json["requestId"].is_string());
    assert_eq!(json["stage"], "composed");
    assert_eq!(json["composedBy"], "template");
    assert_eq!(json["products"][0]["product"]["product_id"], "ELEC001");
    assert!(json["debug"]["timings"]["totalMs"].is_u64());
}
