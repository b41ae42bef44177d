//! Response composition.
//!
//! Final candidates are turned into the reply either by a generative model
//! prompted with the candidates' details, or by a deterministic template.
//! A failed or empty generation falls back to the template.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::constants::{NO_MATCH_REPLY, TEMPLATE_FOOTER, TEMPLATE_REASON};
use crate::errors::ShopResult;
use crate::reranker::RankedProduct;

/// Text generation capability.
pub trait GeneratorBackend: Send + Sync {
    fn model_id(&self) -> &str;

    /// Complete `prompt`; the result is trimmed by the composer.
    fn generate(&self, prompt: &str) -> ShopResult<String>;
}

/// Which path produced the response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposedBy {
    Greeting,
    Template,
    Generator,
    NoMatch,
}

impl std::fmt::Display for ComposedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComposedBy::Greeting => write!(f, "greeting"),
            ComposedBy::Template => write!(f, "template"),
            ComposedBy::Generator => write!(f, "generator"),
            ComposedBy::NoMatch => write!(f, "no_match"),
        }
    }
}

/// Composed reply plus provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub text: String,
    pub composed_by: ComposedBy,
    /// Generation was attempted and failed (or came back empty).
    pub generator_degraded: bool,
}

/// Deterministic enumeration of the candidates.
pub fn template_response(query: &str, products: &[RankedProduct]) -> String {
    let mut text = format!("根据您的查询'{}'，我为您推荐以下商品：\n\n", query);
    for (i, ranked) in products.iter().enumerate() {
        let p = &ranked.product;
        let _ = write!(
            text,
            "{}. {} - ¥{}\n   描述: {}\n   推荐理由: {}\n\n",
            i + 1,
            p.name,
            p.price,
            p.description,
            TEMPLATE_REASON
        );
    }
    text.push_str(TEMPLATE_FOOTER);
    text
}

/// Shopping-assistant prompt for the generator.
pub fn generation_prompt(query: &str, products: &[RankedProduct]) -> String {
    let mut context = String::new();
    for (i, ranked) in products.iter().enumerate() {
        let p = &ranked.product;
        let _ = write!(
            context,
            "商品{}:\n- 名称: {}\n- 价格: ¥{}\n- 描述: {}\n\n",
            i + 1,
            p.name,
            p.price,
            p.description
        );
    }

    format!(
        "你是一位专业的导购员。用户咨询: {}\n\n\
         根据以下商品信息，为用户提供专业建议:\n{}\n\n\
         请提供:\n\
         1. 对用户需求的理解\n\
         2. 针对性的商品推荐及理由\n\
         3. 使用建议或注意事项\n\n\
         保持回答自然、专业、有帮助。",
        query, context
    )
}

/// Compose the reply for `products`.
///
/// `generator` is `None` when generation is disabled or skipped for this
/// request.
pub fn compose(
    query: &str,
    products: &[RankedProduct],
    generator: Option<&dyn GeneratorBackend>,
) -> Composition {
    if products.is_empty() {
        return Composition {
            text: NO_MATCH_REPLY.to_string(),
            composed_by: ComposedBy::NoMatch,
            generator_degraded: false,
        };
    }

    let Some(generator) = generator else {
        return Composition {
            text: template_response(query, products),
            composed_by: ComposedBy::Template,
            generator_degraded: false,
        };
    };

    let prompt = generation_prompt(query, products);
    match generator.generate(&prompt) {
        Ok(text) if !text.trim().is_empty() => Composition {
            text: text.trim().to_string(),
            composed_by: ComposedBy::Generator,
            generator_degraded: false,
        },
        Ok(_) => {
            tracing::warn!(
                "Generator '{}' returned an empty response, using template",
                generator.model_id()
            );
            degraded_template(query, products)
        }
        Err(e) => {
            tracing::warn!("Generation failed, using template: {}", e);
            degraded_template(query, products)
        }
    }
}

fn degraded_template(query: &str, products: &[RankedProduct]) -> Composition {
    Composition {
        text: template_response(query, products),
        composed_by: ComposedBy::Template,
        generator_degraded: true,
    }
}
