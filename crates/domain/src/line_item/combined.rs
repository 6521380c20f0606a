use common::{BrandId, DocumentId, ItemId, ProductId, VariantId};
use serde::{Deserialize, Serialize};

use super::resolve_attributes;
use crate::catalog::{Attribute, Product, Variant};
use crate::document::DocumentItem;
use crate::money::Money;
use crate::totals::LineAmounts;

/// A document line merged with its product, variant and attributes.
///
/// Derived on every read and never stored. Every catalog-sourced field is
/// optional: the product or variant may have been removed since the line
/// was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedLineItem {
    pub item_id: ItemId,
    pub document_id: DocumentId,
    pub product_id: ProductId,

    /// Frozen name when one was captured, otherwise the live catalog name.
    pub product_name: Option<String>,
    pub product_code: Option<String>,
    pub product_bar_code: Option<String>,
    pub product_description: Option<String>,
    pub brand_id: Option<BrandId>,
    pub brand_name: Option<String>,

    pub variant_id: Option<VariantId>,
    /// Frozen name when one was captured, otherwise the live catalog name.
    pub variant_name: Option<String>,
    pub variant_code: Option<String>,
    pub variant_description: Option<String>,

    /// Sorted by type; empty when the variant is absent.
    pub attributes: Vec<Attribute>,

    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Money,
    pub line_total: Money,
    pub bar_code: Option<String>,
    pub original_product_name: Option<String>,
    pub original_variant_name: Option<String>,

    /// Live catalog names, kept alongside the resolved display names.
    pub current_product_name: Option<String>,
    pub current_variant_name: Option<String>,
}

impl CombinedLineItem {
    /// Returns true when neither the product nor the variant could be joined.
    pub fn is_orphaned(&self) -> bool {
        self.current_product_name.is_none() && self.current_variant_name.is_none()
    }
}

impl LineAmounts for CombinedLineItem {
    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn discount(&self) -> Money {
        self.discount
    }
}

fn frozen(name: &Option<String>) -> Option<String> {
    name.as_ref().filter(|n| !n.trim().is_empty()).cloned()
}

/// Flattens a line and its joined catalog rows into one record.
///
/// `attributes` are only used when `variant` is present.
pub fn flatten(
    item: DocumentItem,
    product: Option<&Product>,
    variant: Option<&Variant>,
    attributes: Vec<Attribute>,
) -> CombinedLineItem {
    let line_total = item.net();

    let current_product_name = product.map(|p| p.name.clone());
    let current_variant_name = variant.map(|v| v.name.clone());

    let product_name = frozen(&item.original_product_name).or_else(|| current_product_name.clone());
    let variant_name = frozen(&item.original_variant_name).or_else(|| current_variant_name.clone());

    let attributes = if variant.is_some() {
        resolve_attributes(attributes)
    } else {
        Vec::new()
    };

    let brand = product.and_then(|p| p.brand.as_ref());

    CombinedLineItem {
        item_id: item.id,
        document_id: item.document_id,
        product_id: item.product_id,
        product_name,
        product_code: product.and_then(|p| p.code.clone()),
        product_bar_code: product.and_then(|p| p.bar_code.clone()),
        product_description: product.and_then(|p| p.description.clone()),
        brand_id: brand.map(|b| b.id),
        brand_name: brand.map(|b| b.name.clone()),
        variant_id: item.variant_id,
        variant_name,
        variant_code: variant.and_then(|v| v.code.clone()),
        variant_description: variant.and_then(|v| v.description.clone()),
        attributes,
        quantity: item.quantity,
        unit_price: item.unit_price,
        discount: item.discount,
        line_total,
        bar_code: item.bar_code,
        original_product_name: item.original_product_name,
        original_variant_name: item.original_variant_name,
        current_product_name,
        current_variant_name,
    }
}
