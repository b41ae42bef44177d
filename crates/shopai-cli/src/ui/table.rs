//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `shopai products` | `render_products_table()` |
//! | `shopai ask`, `shopai cart` | `render_ranked_table()` |
//! | `shopai status` | `render_status_table()` |
//!
//! Cells are plain text; colors would throw off comfy-table's width math.

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use shopai_core::{ModelStatus, Product, RankedProduct, StatusReport};

use super::format::truncate_width;

/// Columns reserved for everything but the description.
const PRODUCT_FIXED_COLUMNS: usize = 52;

/// Narrowest description column worth showing.
const MIN_DESCRIPTION_WIDTH: usize = 16;

fn plain_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table
}

/// Render a catalog listing.
///
/// # Example Output
///
/// ```text
/// ID         NAME        CATEGORY    PRICE     DESCRIPTION
/// ELEC001    蓝牙耳机    电子产品    ¥199.00   主动降噪无线蓝牙耳机...
/// ```
pub fn render_products_table(products: &[Product], terminal_width: usize) -> String {
    if products.is_empty() {
        return String::new();
    }

    let description_width = terminal_width
        .saturating_sub(PRODUCT_FIXED_COLUMNS)
        .max(MIN_DESCRIPTION_WIDTH);

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("NAME"),
        Cell::new("CATEGORY"),
        Cell::new("PRICE").set_alignment(CellAlignment::Right),
        Cell::new("DESCRIPTION"),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // ID
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // NAME
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // CATEGORY
        ColumnConstraint::LowerBoundary(Width::Fixed(9)),  // PRICE
    ]);

    for product in products {
        table.add_row(vec![
            Cell::new(&product.id),
            Cell::new(truncate_width(&product.name, 20)),
            Cell::new(product.category.as_str()),
            Cell::new(format!("¥{}", product.price)).set_alignment(CellAlignment::Right),
            Cell::new(truncate_width(&product.description, description_width)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the reranked products of one recommendation, best first.
///
/// `SCORE` is the combined fusion score, `KW` the keyword weight and
/// `REL` the cross-encoder relevance.
pub fn render_ranked_table(ranked: &[RankedProduct]) -> String {
    if ranked.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("ID"),
        Cell::new("NAME"),
        Cell::new("PRICE").set_alignment(CellAlignment::Right),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("KW").set_alignment(CellAlignment::Right),
        Cell::new("REL").set_alignment(CellAlignment::Right),
    ]);

    for (i, item) in ranked.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(&item.product.id),
            Cell::new(truncate_width(&item.product.name, 24)),
            Cell::new(format!("¥{}", item.product.price)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", item.combined_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", item.keyword_weight)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", item.cross_score)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}

fn model_detail(status: &ModelStatus) -> String {
    if !status.enabled {
        return format!("{} (disabled)", status.model_id);
    }
    match (&status.path, &status.reason) {
        (_, Some(reason)) => format!("{}: {}", status.model_id, reason),
        (Some(path), None) => format!("{} at {}", status.model_id, path.display()),
        (None, None) => status.model_id.clone(),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Render one row per component of a [`StatusReport`].
///
/// # Example Output
///
/// ```text
/// COMPONENT    READY   DETAIL
/// catalog      yes     30 products at /home/me/.shopai/products.json
/// index        no      no index at /home/me/.shopai/index
/// ```
pub fn render_status_table(report: &StatusReport) -> String {
    let mut table = plain_table();
    table.set_header(vec![Cell::new("COMPONENT"), Cell::new("READY"), Cell::new("DETAIL")]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(12)),
        ColumnConstraint::LowerBoundary(Width::Fixed(7)),
    ]);

    let catalog = &report.catalog;
    let catalog_detail = match (&catalog.error, catalog.count) {
        (Some(err), _) => err.clone(),
        (None, Some(count)) => format!("{} products at {}", count, catalog.path.display()),
        (None, None) => catalog.path.display().to_string(),
    };
    table.add_row(vec!["catalog".to_string(), yes_no(catalog.loaded).to_string(), catalog_detail]);

    let dictionary = &report.dictionary;
    let dictionary_detail = match (&dictionary.error, &dictionary.path) {
        (Some(err), _) => err.clone(),
        (None, Some(path)) => path.display().to_string(),
        (None, None) => "built-in".to_string(),
    };
    table.add_row(vec![
        "dictionary".to_string(),
        yes_no(dictionary.valid).to_string(),
        dictionary_detail,
    ]);

    let index = &report.index;
    let index_detail = if !index.exists {
        format!("no index at {}", index.path.display())
    } else if let Some(reason) = &index.reason {
        reason.clone()
    } else {
        format!(
            "{} vectors, dim {} at {}",
            index.count.unwrap_or(0),
            index.dimension.unwrap_or(0),
            index.path.display()
        )
    };
    table.add_row(vec!["index".to_string(), yes_no(index.compatible).to_string(), index_detail]);

    table.add_row(vec![
        "embedding".to_string(),
        yes_no(report.embedding.available).to_string(),
        model_detail(&report.embedding),
    ]);
    table.add_row(vec![
        "reranker".to_string(),
        yes_no(report.reranker.enabled && report.reranker.available).to_string(),
        model_detail(&report.reranker),
    ]);

    let generator = &report.generator;
    let generator_detail = if generator.enabled {
        format!("{} {} at {}", generator.provider, generator.model, generator.endpoint)
    } else {
        format!("{} (disabled)", generator.provider)
    };
    table.add_row(vec![
        "generator".to_string(),
        yes_no(generator.enabled).to_string(),
        generator_detail,
    ]);

    table.trim_fmt().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopai_core::{Category, Price};

    fn headphones() -> Product {
        Product::new(
            "ELEC001",
            "蓝牙耳机",
            Category::Electronics,
            "主动降噪无线蓝牙耳机，续航30小时",
            Price::from_cents(19900),
        )
    }

    #[test]
    fn test_products_table_has_header_and_rows() {
        let out = render_products_table(&[headphones()], 100);
        assert!(out.contains("ID"));
        assert!(out.contains("DESCRIPTION"));
        assert!(out.contains("ELEC001"));
        assert!(out.contains("¥199.00"));
        assert!(out.contains("电子产品"));
    }

    #[test]
    fn test_products_table_truncates_description_on_narrow_terminals() {
        let out = render_products_table(&[headphones()], 40);
        assert!(out.contains("..."));
        assert!(!out.contains("续航30小时"));
    }

    #[test]
    fn test_ranked_table_numbers_rows() {
        let ranked = RankedProduct {
            product: headphones(),
            cross_score: 0.91,
            keyword_weight: 0.4,
            combined_score: 0.73,
            distance: -0.73,
        };
        let out = render_ranked_table(&[ranked]);
        assert!(out.contains("SCORE"));
        assert!(out.contains("0.73"));
        assert!(out.contains("0.91"));
        assert!(out.lines().skip(1).any(|l| l.trim_start().starts_with("1 ")));
    }

    #[test]
    fn test_empty_inputs_render_nothing() {
        assert!(render_products_table(&[], 80).is_empty());
        assert!(render_ranked_table(&[]).is_empty());
    }
}
