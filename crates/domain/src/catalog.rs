//! Catalog entities referenced by document lines.
//!
//! The catalog is owned by another part of the back office; documents only
//! read it to validate lines and to render them.

use common::{BrandId, ProductId, VariantId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The fixed set of attribute types a variant can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Color,
    Flavor,
    Material,
    Pattern,
    Size,
    Style,
    Weight,
}

impl AttributeType {
    /// Returns the wire name, which is also the sort key.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Color => "color",
            AttributeType::Flavor => "flavor",
            AttributeType::Material => "material",
            AttributeType::Pattern => "pattern",
            AttributeType::Size => "size",
            AttributeType::Style => "style",
            AttributeType::Weight => "weight",
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AttributeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "color" => Ok(AttributeType::Color),
            "flavor" => Ok(AttributeType::Flavor),
            "material" => Ok(AttributeType::Material),
            "pattern" => Ok(AttributeType::Pattern),
            "size" => Ok(AttributeType::Size),
            "style" => Ok(AttributeType::Style),
            "weight" => Ok(AttributeType::Weight),
            other => Err(ValidationError::UnknownAttributeType(other.to_string())),
        }
    }
}

/// A typed descriptor on a variant, e.g. (color, red).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    pub value: String,
}

impl Attribute {
    pub fn new(attribute_type: AttributeType, value: impl Into<String>) -> Self {
        Self {
            attribute_type,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// A catalog product with its brand already joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub bar_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<Brand>,
}

impl Product {
    /// Creates a product with only the required fields set.
    pub fn new(id: ProductId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: None,
            bar_code: None,
            description: None,
            brand: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brand = Some(brand);
        self
    }
}

/// A sellable variant of a product. Its attributes are stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Variant {
    pub fn new(id: VariantId, product_id: ProductId, name: impl Into<String>) -> Self {
        Self {
            id,
            product_id,
            name: name.into(),
            code: None,
            description: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}
