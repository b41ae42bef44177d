//! Cart-based recommendations.
//!
//! A cart is turned into a synthesized query over the names of its products
//! and run through the [`Recommender`] with the cart itself excluded. Carts
//! without a single known product get the configured popular list instead.

use serde::Serialize;

use crate::catalog::{Catalog, Product};
use crate::config::CartConfig;
use crate::constants::cart_query;
use crate::errors::ShopResult;
use crate::pipeline::{RecommendOptions, Recommendation, Recommender};

/// Outcome of [`recommend_for_cart`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartRecommendation {
    /// Non-personalized fallback for empty carts.
    Popular { products: Vec<Product> },
    /// Pipeline run over the synthesized cart query.
    Recommended {
        query: String,
        recommendation: Box<Recommendation>,
    },
}

impl CartRecommendation {
    pub fn is_popular(&self) -> bool {
        matches!(self, Self::Popular { .. })
    }

    /// Products to show for this cart.
    pub fn products(&self, recommender: &Recommender) -> Vec<Product> {
        match self {
            Self::Popular { products } => products.clone(),
            Self::Recommended { recommendation, .. } => {
                recommendation.recommended_products(recommender.catalog())
            }
        }
    }
}

/// What a cart resolves to before any model is involved.
#[derive(Debug, Clone)]
pub enum CartPlan {
    /// No known product in the cart.
    Popular(Vec<Product>),
    /// Synthesized query, with the cart products to exclude.
    Query { query: String, exclusions: Vec<String> },
}

impl CartPlan {
    /// Run the plan. Only [`CartPlan::Query`] touches the recommender.
    pub fn run(
        self,
        recommender: &Recommender,
        options: RecommendOptions,
    ) -> ShopResult<CartRecommendation> {
        match self {
            Self::Popular(products) => Ok(CartRecommendation::Popular { products }),
            Self::Query { query, exclusions } => {
                let options = options.with_exclusions(exclusions);
                let recommendation = recommender.recommend_with(&query, &options)?;
                Ok(CartRecommendation::Recommended {
                    query,
                    recommendation: Box::new(recommendation),
                })
            }
        }
    }
}

/// Resolve cart `ids` against the catalog.
///
/// Unknown ids are ignored and duplicates collapse. Carts without a single
/// known product fall back to the configured popular list.
pub fn plan_cart<S: AsRef<str>>(catalog: &Catalog, cart: &CartConfig, ids: &[S]) -> CartPlan {
    let mut known: Vec<&Product> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.as_ref();
        match catalog.get(id) {
            Some(product) if !known.iter().any(|p| p.id == product.id) => known.push(product),
            Some(_) => {}
            None => tracing::warn!("Ignoring unknown cart product id '{}'", id),
        }
    }

    if known.is_empty() {
        let products: Vec<Product> = cart
            .popular_ids
            .iter()
            .filter_map(|id| catalog.get(id).cloned())
            .collect();
        tracing::debug!("Empty cart, returning {} popular products", products.len());
        return CartPlan::Popular(products);
    }

    let names: Vec<&str> = known.iter().map(|p| p.name.as_str()).collect();
    CartPlan::Query {
        query: cart_query(&names),
        exclusions: known.iter().map(|p| p.id.clone()).collect(),
    }
}

/// Recommend products to go with the cart `ids`.
///
/// Unknown ids are ignored. Cart products never appear in the result.
pub fn recommend_for_cart<S: AsRef<str>>(
    recommender: &Recommender,
    cart: &CartConfig,
    ids: &[S],
    options: RecommendOptions,
) -> ShopResult<CartRecommendation> {
    plan_cart(recommender.catalog(), cart, ids).run(recommender, options)
}
