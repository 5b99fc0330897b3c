//! Tests for catalog generation

use crate::catalog::{CategoryConfig, ProductCatalog, CATEGORIES};
use serde_json::json;

#[test]
fn generate_covers_every_category() {
    let catalog = ProductCatalog::generate();
    let expected: u32 = CATEGORIES.iter().map(|c| c.item_count).sum();
    assert_eq!(catalog.len(), expected as usize);
    assert_eq!(catalog.len(), 120);
}

#[test]
fn ids_are_sequential_across_categories() {
    let catalog = ProductCatalog::generate();
    let ids: Vec<i64> = catalog.iter().map(|p| p.id).collect();
    let expected: Vec<i64> = (1..=120).collect();
    assert_eq!(ids, expected);

    // First clock follows the last varmala
    let first_clock = catalog.get(21).unwrap();
    assert_eq!(first_clock.name, "clocks_1101");
    assert_eq!(catalog.get(20).unwrap().name, "varmala_1120");
}

#[test]
fn product_fields_follow_category_config() {
    let catalog = ProductCatalog::generate();
    let product = catalog.get(1).unwrap();

    assert_eq!(product.name, "varmala_1101");
    assert_eq!(product.category, "Varmala");
    assert_eq!(product.price, 2999);
    assert_eq!(product.dimensions, "18 x 18 inches");
    assert_eq!(
        product.description,
        "Handcrafted resin varmala with premium finish."
    );
    assert_eq!(
        product.image_url,
        "/attached_assets/generated_images/varmala_1101.jpg"
    );
    assert_eq!(product.materials, "Resin, Dried Flowers");
    assert_eq!(product.colors, vec!["white", "gold"]);
    assert_eq!(product.review_count, 40);
    assert_eq!(product.in_stock, 5);
}

#[test]
fn description_lowercases_multi_word_category() {
    let catalog = ProductCatalog::generate();
    let frame = catalog.iter().find(|p| p.name == "photoframes_1101").unwrap();
    assert_eq!(
        frame.description,
        "Handcrafted resin photo frames with premium finish."
    );
}

#[test]
fn from_categories_with_no_items_is_empty() {
    let config = CategoryConfig {
        base_name: "coasters",
        category: "Coasters",
        price: 499,
        dimensions: "4 inch diameter",
        item_count: 0,
    };
    let catalog = ProductCatalog::from_categories(&[config]);
    assert!(catalog.is_empty());
}

#[test]
fn to_rows_keeps_column_order() {
    let catalog = ProductCatalog::generate();
    let rows = catalog.to_rows().unwrap();
    assert_eq!(rows.len(), catalog.len());

    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "id",
            "name",
            "description",
            "price",
            "category",
            "image_url",
            "rating",
            "review_count",
            "in_stock",
            "colors",
            "dimensions",
            "materials"
        ]
    );
    assert_eq!(rows[0]["colors"], json!(["white", "gold"]));
    assert_eq!(rows[0]["rating"], json!(4.8));
}

#[test]
fn write_json_round_trips_entries() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("products.json");
    let catalog = ProductCatalog::generate();

    catalog.write_json(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<crate::catalog::ProductEntry> = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed.len(), 120);
    assert_eq!(&parsed[119], catalog.get(120).unwrap());
}
