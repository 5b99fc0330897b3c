//! Product catalog generation from static per-category configuration

use crate::error::{Result, SyncError};
use crate::export::write_document;
use crate::value::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// First item number of every category
const FIRST_ITEM_NUMBER: u32 = 1101;

const DEFAULT_MATERIALS: &str = "Resin, Dried Flowers";
const DEFAULT_RATING: f64 = 4.8;
const DEFAULT_REVIEW_COUNT: u32 = 40;
const DEFAULT_IN_STOCK: u32 = 5;
const DEFAULT_COLORS: [&str; 2] = ["white", "gold"];

/// Generation settings for one product line
#[derive(Debug, Clone, Copy)]
pub struct CategoryConfig {
    /// Prefix of product names and image files
    pub base_name: &'static str,
    pub category: &'static str,
    pub price: i64,
    pub dimensions: &'static str,
    pub item_count: u32,
}

/// Product lines in generation order; ids are assigned across all of them
pub const CATEGORIES: [CategoryConfig; 7] = [
    CategoryConfig {
        base_name: "varmala",
        category: "Varmala",
        price: 2999,
        dimensions: "18 x 18 inches",
        item_count: 20,
    },
    CategoryConfig {
        base_name: "clocks",
        category: "Clocks",
        price: 1599,
        dimensions: "16 inch diameter",
        item_count: 22,
    },
    CategoryConfig {
        base_name: "photoframes",
        category: "Photo Frames",
        price: 1199,
        dimensions: "12 x 16 inches",
        item_count: 22,
    },
    CategoryConfig {
        base_name: "wall-arts",
        category: "Photo Frames",
        price: 1299,
        dimensions: "12 x 16 inches",
        item_count: 17,
    },
    CategoryConfig {
        base_name: "pyramids",
        category: "Photo Frames",
        price: 1699,
        dimensions: "12 x 16 inches",
        item_count: 7,
    },
    CategoryConfig {
        base_name: "pooja-platter",
        category: "Photo Frames",
        price: 599,
        dimensions: "12 x 16 inches",
        item_count: 14,
    },
    CategoryConfig {
        base_name: "nameplates",
        category: "Photo Frames",
        price: 599,
        dimensions: "12 x 16 inches",
        item_count: 18,
    },
];

/// One generated product, fields in `products` column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEntry {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub image_url: String,
    pub rating: f64,
    pub review_count: u32,
    pub in_stock: u32,
    pub colors: Vec<String>,
    pub dimensions: String,
    pub materials: String,
}

impl ProductEntry {
    fn generate(id: i64, config: &CategoryConfig, number: u32) -> Self {
        let name = format!("{}_{}", config.base_name, number);
        Self {
            id,
            description: format!(
                "Handcrafted resin {} with premium finish.",
                config.category.to_lowercase()
            ),
            price: config.price,
            category: config.category.to_string(),
            image_url: format!("/attached_assets/generated_images/{}.jpg", name),
            name,
            rating: DEFAULT_RATING,
            review_count: DEFAULT_REVIEW_COUNT,
            in_stock: DEFAULT_IN_STOCK,
            colors: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
            dimensions: config.dimensions.to_string(),
            materials: DEFAULT_MATERIALS.to_string(),
        }
    }
}

/// Generated product catalog
pub struct ProductCatalog {
    entries: Vec<ProductEntry>,
}

impl ProductCatalog {
    /// Generate the catalog for the built-in product lines
    pub fn generate() -> Self {
        Self::from_categories(&CATEGORIES)
    }

    /// Generate products for `categories`, numbering ids sequentially from 1
    pub fn from_categories(categories: &[CategoryConfig]) -> Self {
        let mut entries = Vec::new();
        let mut next_id = 0;

        for config in categories {
            for number in FIRST_ITEM_NUMBER..FIRST_ITEM_NUMBER + config.item_count {
                next_id += 1;
                entries.push(ProductEntry::generate(next_id, config, number));
            }
        }

        log::info!(
            "Generated {} products across {} categories",
            entries.len(),
            categories.len()
        );
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductEntry> {
        self.entries.iter()
    }

    /// Look up a product by id
    pub fn get(&self, id: i64) -> Option<&ProductEntry> {
        self.entries.iter().find(|p| p.id == id)
    }

    /// Convert into rows for the upsert engine
    pub fn to_rows(&self) -> Result<Vec<Row>> {
        self.entries
            .iter()
            .map(|entry| match serde_json::to_value(entry)? {
                Value::Object(row) => Ok(row),
                _ => Err(SyncError::Json(serde::ser::Error::custom(
                    "product did not serialize to an object",
                ))),
            })
            .collect()
    }

    /// Save the catalog as a pretty-printed JSON array
    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_document(path, &self.to_rows()?)?;
        log::info!("Wrote {} products to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
