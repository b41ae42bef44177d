//! Common constants used throughout shopai-core.
//!
//! This module centralizes paths, file names, and the fixed texts of the
//! recommendation responses.

// ============================================================================
// Directory Names
// ============================================================================

/// The name of the global shopai directory.
///
/// Located at `~/.shopai/` on Unix-like systems. Holds the config, the
/// catalog, the embedding index, and the model weights.
pub const SHOPAI_HOME_DIR: &str = ".shopai";

/// Subdirectory of the home dir holding the embedding index.
pub const INDEX_DIR: &str = "index";

// ============================================================================
// File Names
// ============================================================================

/// The name of the global configuration file.
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

/// The name of the default product catalog file.
pub const CATALOG_FILENAME: &str = "products.json";

// ============================================================================
// Environment Variables
// ============================================================================

/// Overrides the global config location.
pub const SHOPAI_CONFIG_ENV: &str = "SHOPAI_CONFIG";

/// Overrides the `device` config key.
pub const SHOPAI_DEVICE_ENV: &str = "SHOPAI_DEVICE";

// ============================================================================
// Response Texts
// ============================================================================

/// Reply to greeting queries.
pub const GREETING_REPLY: &str = "您好！欢迎来到我们的商店！我可以帮您推荐商品。";

/// Reply when no candidate survives the pipeline.
pub const NO_MATCH_REPLY: &str =
    "抱歉，经过仔细筛选，我没有找到特别符合您需求的商品。或许您可以尝试更换一下关键词？";

/// Generic justification used by the templated composer.
pub const TEMPLATE_REASON: &str = "与您的需求高度匹配";

/// Closing line of the templated composer.
pub const TEMPLATE_FOOTER: &str = "这些商品都是根据您的需求精心挑选的，希望能满足您的购物需求！";

/// Ids recommended for an empty cart.
pub const DEFAULT_POPULAR_IDS: &[&str] = &["ELEC001", "SPORTS001", "BOOK001"];

/// Build the query synthesized from cart item names.
pub fn cart_query(names: &[&str]) -> String {
    format!("购买了{}，还需要什么商品？", names.join(", "))
}

// ============================================================================
// Tests
// ============================================================================
