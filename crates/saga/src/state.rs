//! Lifecycle of one saga run.

use serde::{Deserialize, Serialize};

/// Where a document operation is in its saga.
///
/// ```text
/// not_started ─► running ─┬─► committed
///                         └─► compensating ─┬─► compensated
///                                           └─► needs_reconciliation
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SagaState {
    #[default]
    NotStarted,
    Running,
    /// A step failed; its predecessors are being undone.
    Compensating,
    Committed,
    /// Every compensation was applied.
    Compensated,
    /// A compensation failed and the data needs an operator.
    NeedsReconciliation,
}

impl SagaState {
    /// Returns true if the saga may move from this state to `next`.
    pub fn can_become(&self, next: SagaState) -> bool {
        use SagaState::*;
        matches!(
            (self, next),
            (NotStarted, Running)
                | (Running, Committed)
                | (Running, Compensating)
                | (Compensating, Compensated)
                | (Compensating, NeedsReconciliation)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "not_started",
            SagaState::Running => "running",
            SagaState::Compensating => "compensating",
            SagaState::Committed => "committed",
            SagaState::Compensated => "compensated",
            SagaState::NeedsReconciliation => "needs_reconciliation",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
