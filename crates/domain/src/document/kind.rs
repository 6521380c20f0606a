use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The two document variants handled by the lifecycle services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Goods received from a supplier; completing it records a stock entry.
    Purchase,
    /// Goods sold to a customer; completing it records a stock deduction.
    Sale,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Purchase => "purchase",
            DocumentKind::Sale => "sale",
        }
    }

    /// Returns the plural collection name used for tables and routes.
    pub fn collection(&self) -> &'static str {
        match self {
            DocumentKind::Purchase => "purchases",
            DocumentKind::Sale => "sales",
        }
    }

    /// Parses a collection name (`purchases` or `sales`).
    pub fn from_collection(name: &str) -> Result<Self, ValidationError> {
        match name {
            "purchases" => Ok(DocumentKind::Purchase),
            "sales" => Ok(DocumentKind::Sale),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }

    /// Prefix of generated document codes.
    pub fn code_prefix(&self) -> &'static str {
        match self {
            DocumentKind::Purchase => "PUR",
            DocumentKind::Sale => "SAL",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
