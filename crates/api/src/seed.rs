//! Catalog seeding from a JSON file.

use std::path::Path;

use domain::{Attribute, Product, Variant};
use serde::Deserialize;
use store::InMemoryCatalog;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read catalog seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog seed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A variant with its attributes, as written in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedVariant {
    #[serde(flatten)]
    pub variant: Variant,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Products and variants to load before serving requests.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub variants: Vec<SeedVariant>,
}

impl CatalogSeed {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Inserts every product and variant into the catalog.
    pub async fn apply(self, catalog: &InMemoryCatalog) -> (usize, usize) {
        let counts = (self.products.len(), self.variants.len());
        for product in self.products {
            catalog.insert_product(product).await;
        }
        for seed in self.variants {
            catalog.insert_variant(seed.variant, seed.attributes).await;
        }
        counts
    }
}
