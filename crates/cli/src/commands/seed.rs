//! Seed the category tables from a YAML product list.
//!
//! Each entry is a product as the API serializes it: base fields plus a
//! `category` tag and that category's attributes. Entries without an `id`
//! get a fresh one. Rows are upserted on `slug`, so reseeding is safe.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{error, info};

use herbwell_core::ProductId;
use herbwell_storefront::db::{self, PgDatabase};
use herbwell_storefront::models::Product;

/// Parse a YAML product list.
///
/// # Errors
///
/// Returns the first entry that does not describe a valid product.
pub fn parse_catalog(content: &str) -> Result<Vec<Product>, serde_yaml::Error> {
    let entries: Vec<Mapping> = serde_yaml::from_str(content)?;
    entries
        .into_iter()
        .map(|mut entry| {
            let id_key = Value::String("id".to_string());
            if !entry.contains_key(&id_key) {
                entry.insert(id_key, Value::String(ProductId::generate().to_string()));
            }
            serde_yaml::from_value(Value::Mapping(entry))
        })
        .collect()
}

/// Upsert every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the database
/// URL is missing or unreachable.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url().ok_or("STOREFRONT_DATABASE_URL not set")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products = parse_catalog(&content)?;
    info!(products = products.len(), "Parsed catalog");

    let pool = db::create_pool(&database_url).await?;
    let database = PgDatabase::new(pool);
    info!("Connected to database");

    let mut failed = 0_usize;
    for product in &products {
        if let Err(e) = database.upsert_product(product).await {
            failed += 1;
            error!(slug = %product.slug, category = %product.category(), error = %e, "Failed to seed product");
        }
    }

    info!(seeded = products.len() - failed, failed, "Seeding complete!");
    if failed > 0 {
        return Err(format!("{failed} products failed to seed").into());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herbwell_core::Category;

    use super::*;

    #[test]
    fn test_parse_catalog_assigns_missing_ids() {
        let products = parse_catalog(
            r#"
- title: Lavender Soap
  slug: lavender-soap
  price: "8.99"
  category: soaps
  skinType: dry
  badges: [bestseller]
- id: 6f1c1d8e-0a4b-4c5e-9d7a-2f3b4c5d6e7f
  title: Calm Tea
  slug: calm-tea
  price: "6.50"
  category: herbal_teas
"#,
        )
        .unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].category(), Category::Soaps);
        assert_eq!(products[0].details.shared_attribute(), Some("dry"));
        assert!(products[0].has_badge("Bestseller"));
        assert_eq!(
            products[1].id.to_string(),
            "6f1c1d8e-0a4b-4c5e-9d7a-2f3b4c5d6e7f"
        );
        assert_eq!(products[1].category(), Category::HerbalTeas);
    }

    #[test]
    fn test_parse_catalog_rejects_unknown_category() {
        let result = parse_catalog(
            r#"
- title: Mystery
  slug: mystery
  price: "1.00"
  category: candles
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bundled_seed_file_parses() {
        let content = include_str!("../../seed/catalog.yaml");
        let products = parse_catalog(content).unwrap();
        for category in Category::ALL {
            assert!(
                products.iter().any(|p| p.category() == category),
                "no seed product for {category}"
            );
        }
    }
}
