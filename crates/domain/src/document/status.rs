use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The lifecycle status of a document.
///
/// State transitions:
/// ```text
/// Draft ◄────► Pending
///   │  ╲         │  ╲
///   │   ╲        │   ──► Cancelled
///   │    ──► Completed ──► Draft | Pending
///   └──────────────────► Cancelled
/// ```
///
/// `Completed` is the only status that carries a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Being prepared; no stock effect.
    #[default]
    Draft,

    /// Awaiting completion. Also the safe fallback when a stock movement
    /// could not be recorded.
    Pending,

    /// Stock movement recorded.
    Completed,

    /// Abandoned (terminal state).
    Cancelled,
}

impl DocumentStatus {
    /// Returns true if documents in this status carry a stock movement.
    pub fn carries_stock_effect(&self) -> bool {
        matches!(self, DocumentStatus::Completed)
    }

    /// Returns true if a document may move from this status to `next`.
    ///
    /// Staying in the same status is not a transition and returns false.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Completed)
                | (Draft, Cancelled)
                | (Pending, Draft)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Completed, Draft)
                | (Completed, Pending)
        )
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Pending => "pending",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "pending" => Ok(DocumentStatus::Pending),
            "completed" => Ok(DocumentStatus::Completed),
            "cancelled" => Ok(DocumentStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Settlement status of a document. Carries no side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(ValidationError::UnknownPaymentStatus(other.to_string())),
        }
    }
}
