use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, VariantId};
use domain::{Attribute, Product, Variant};
use tokio::sync::RwLock;

use crate::{Result, StoreError};

/// Read access to products, variants and variant attributes.
///
/// Products and variants can be renamed or removed at any time, so callers
/// must handle `None` for ids that a stored document still references.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>>;

    /// Returns the attributes attached to a variant, in storage order.
    async fn get_variant_attributes(&self, variant_id: VariantId) -> Result<Vec<Attribute>>;
}

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    variants: HashMap<VariantId, Variant>,
    attributes: HashMap<VariantId, Vec<Attribute>>,
    fail: bool,
}

/// In-memory catalog used by tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.write().await.products.insert(product.id, product);
    }

    pub async fn insert_variant(&self, variant: Variant, attributes: Vec<Attribute>) {
        let mut state = self.state.write().await;
        state.attributes.insert(variant.id, attributes);
        state.variants.insert(variant.id, variant);
    }

    /// Renames a product, as the catalog team would after a document was written.
    pub async fn rename_product(&self, id: ProductId, name: impl Into<String>) {
        if let Some(product) = self.state.write().await.products.get_mut(&id) {
            product.name = name.into();
        }
    }

    pub async fn remove_product(&self, id: ProductId) {
        self.state.write().await.products.remove(&id);
    }

    pub async fn remove_variant(&self, id: VariantId) {
        let mut state = self.state.write().await;
        state.variants.remove(&id);
        state.attributes.remove(&id);
    }

    /// Makes every lookup fail until cleared.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    async fn read(&self) -> Result<tokio::sync::RwLockReadGuard<'_, CatalogState>> {
        let state = self.state.read().await;
        if state.fail {
            return Err(StoreError::Unavailable("catalog unavailable".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.read().await?.products.get(&id).cloned())
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>> {
        Ok(self.read().await?.variants.get(&id).cloned())
    }

    async fn get_variant_attributes(&self, variant_id: VariantId) -> Result<Vec<Attribute>> {
        Ok(self
            .read()
            .await?
            .attributes
            .get(&variant_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::AttributeType;

    #[tokio::test]
    async fn test_lookup_and_rename() {
        let catalog = InMemoryCatalog::new();
        let product_id = ProductId::new();
        catalog
            .insert_product(Product::new(product_id, "Acme Widget"))
            .await;

        catalog.rename_product(product_id, "Acme Widget v2").await;
        let product = catalog.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.name, "Acme Widget v2");

        catalog.remove_product(product_id).await;
        assert!(catalog.get_product(product_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_variant_attributes() {
        let catalog = InMemoryCatalog::new();
        let variant = Variant::new(VariantId::new(), ProductId::new(), "Large Red");
        let variant_id = variant.id;
        catalog
            .insert_variant(
                variant,
                vec![
                    Attribute::new(AttributeType::Size, "L"),
                    Attribute::new(AttributeType::Color, "Red"),
                ],
            )
            .await;

        let attributes = catalog.get_variant_attributes(variant_id).await.unwrap();
        assert_eq!(attributes.len(), 2);
        assert!(
            catalog
                .get_variant_attributes(VariantId::new())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_fail_switch() {
        let catalog = InMemoryCatalog::new();
        catalog.set_fail(true).await;
        assert!(matches!(
            catalog.get_product(ProductId::new()).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
