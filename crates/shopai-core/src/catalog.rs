//! Product catalog store.
//!
//! The catalog is loaded once at startup from a JSON array of records
//!
//! ```json
//! [{"product_id": "ELEC001", "product_name": "蓝牙耳机", "category": "电子产品",
//!   "description": "...", "price": 199.0}]
//! ```
//!
//! and never mutated afterwards. Iteration order is file order; every
//! keyword pass reports candidates in this order.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ShopError, ShopResult};

// ============================================================================
// Category
// ============================================================================

/// The closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "电子产品")]
    Electronics,
    #[serde(rename = "运动户外")]
    SportsOutdoor,
    #[serde(rename = "书籍")]
    Books,
    #[serde(rename = "办公用品")]
    Office,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 4] = [
        Category::Electronics,
        Category::SportsOutdoor,
        Category::Books,
        Category::Office,
    ];

    /// The catalog's literal name for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "电子产品",
            Category::SportsOutdoor => "运动户外",
            Category::Books => "书籍",
            Category::Office => "办公用品",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == trimmed)
            .or_else(|| match trimmed.to_lowercase().as_str() {
                "electronics" => Some(Category::Electronics),
                "sports" | "outdoor" => Some(Category::SportsOutdoor),
                "books" => Some(Category::Books),
                "office" => Some(Category::Office),
                _ => None,
            })
            .ok_or_else(|| {
                ShopError::InvalidArgument(format!(
                    "Unknown category '{}'. Use one of: {}",
                    s,
                    Category::ALL.map(|c| c.as_str()).join(", ")
                ))
            })
    }
}

// ============================================================================
// Price
// ============================================================================

/// Non-negative price in integer cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Convert a decimal amount, rounding to the nearest cent.
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents > u64::MAX as f64 {
            return None;
        }
        Some(Self(cents as u64))
    }

    pub fn cents(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Price::from_decimal(amount).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid price {}: must be finite and >= 0", amount))
        })
    }
}

// ============================================================================
// Product
// ============================================================================

/// An immutable catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "product_id")]
    pub id: String,
    #[serde(rename = "product_name")]
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    pub price: Price,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        description: impl Into<String>,
        price: Price,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: description.into(),
            price,
        }
    }

    /// Text embedded into the index: `"{name} {category} {description}"`.
    pub fn index_text(&self) -> String {
        format!("{} {} {}", self.name, self.category, self.description)
    }

    /// Text given to the cross-encoder: `"{name} {description}"`.
    pub fn rerank_text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read-only, id-keyed product collection preserving file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from products, rejecting empty input and duplicate ids.
    pub fn from_products(products: Vec<Product>) -> ShopResult<Self> {
        if products.is_empty() {
            return Err(ShopError::InvalidArgument(
                "catalog contains no products".to_string(),
            ));
        }

        let mut by_id = HashMap::with_capacity(products.len());
        for (pos, product) in products.iter().enumerate() {
            if product.id.trim().is_empty() {
                return Err(ShopError::InvalidArgument(format!(
                    "product at position {} has an empty id",
                    pos
                )));
            }
            if by_id.insert(product.id.clone(), pos).is_some() {
                return Err(ShopError::InvalidArgument(format!(
                    "duplicate product id '{}'",
                    product.id
                )));
            }
        }

        Ok(Self { products, by_id })
    }

    /// Load the catalog from its JSON ingestion format.
    ///
    /// A missing file, a parse error, an empty array or duplicate ids are all
    /// fatal.
    pub fn load(path: &Path) -> ShopResult<Self> {
        if !path.exists() {
            return Err(ShopError::CatalogNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ShopError::catalog_invalid(path, e.to_string()))?;
        let products: Vec<Product> = serde_json::from_str(&content)
            .map_err(|e| ShopError::catalog_invalid(path, e.to_string()))?;

        let catalog = Self::from_products(products).map_err(|e| match e {
            ShopError::InvalidArgument(msg) => ShopError::catalog_invalid(path, msg),
            other => other,
        })?;

        tracing::debug!(
            "Loaded {} products from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).map(|&pos| &self.products[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Products in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products of one category, in file order.
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(move |p| p.category == category)
    }

    /// Products whose name occurs in `text`, in file order.
    pub fn mentioned_in<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a Product> + 'a {
        self.products
            .iter()
            .filter(move |p| !p.name.is_empty() && text.contains(p.name.as_str()))
    }
}

// ============================================================================
// Tests
// ============================================================================
