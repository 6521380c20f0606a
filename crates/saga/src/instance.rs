//! In-flight record of one document saga.

use common::{DocumentId, Version};
use domain::{DocumentKind, DocumentStatus, NewDocumentItem};
use serde::Serialize;

use crate::services::{MovementKind, StockLine};
use crate::state::SagaState;

/// Undo action registered by a completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Remove a header this saga inserted.
    DeleteDocument,
    /// Remove the lines this saga inserted.
    DeleteItems,
    /// Put lines back after this saga deleted them.
    RestoreItems(Vec<NewDocumentItem>),
    /// Write a status back onto the header, provided it is still at the
    /// version this saga left it at.
    RestoreStatus {
        status: DocumentStatus,
        version: Version,
    },
    /// Record again a movement this saga reversed.
    ReapplyMovement {
        kind: MovementKind,
        lines: Vec<StockLine>,
    },
}

impl Compensation {
    pub fn name(&self) -> &'static str {
        match self {
            Compensation::DeleteDocument => "delete_document",
            Compensation::DeleteItems => "delete_items",
            Compensation::RestoreItems(_) => "restore_items",
            Compensation::RestoreStatus { .. } => "restore_status",
            Compensation::ReapplyMovement { .. } => "reapply_movement",
        }
    }
}

/// A compensation that could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationFailure {
    pub compensation: &'static str,
    pub reason: String,
}

/// Tracks the steps and pending compensations of one operation.
///
/// Compensations form a stack: they are handed back in reverse order of
/// registration.
#[derive(Debug, Clone)]
pub struct SagaInstance {
    operation: &'static str,
    kind: DocumentKind,
    document_id: Option<DocumentId>,
    state: SagaState,
    completed_steps: Vec<&'static str>,
    compensations: Vec<Compensation>,
    failed_step: Option<&'static str>,
    failure_reason: Option<String>,
    failed_compensations: Vec<CompensationFailure>,
}

impl SagaInstance {
    pub fn new(operation: &'static str, kind: DocumentKind) -> Self {
        Self {
            operation,
            kind,
            document_id: None,
            state: SagaState::NotStarted,
            completed_steps: Vec::new(),
            compensations: Vec::new(),
            failed_step: None,
            failure_reason: None,
            failed_compensations: Vec::new(),
        }
    }

    /// Creates a running saga for an existing document.
    pub fn start(operation: &'static str, kind: DocumentKind, document_id: Option<DocumentId>) -> Self {
        let mut saga = Self::new(operation, kind);
        saga.document_id = document_id;
        saga.transition(SagaState::Running);
        saga
    }

    pub fn set_document(&mut self, document_id: DocumentId) {
        self.document_id = Some(document_id);
    }

    /// Records a completed step and the action that undoes it, if any.
    pub fn step_completed(&mut self, step: &'static str, compensation: Option<Compensation>) {
        tracing::debug!(operation = self.operation, step, "saga step completed");
        self.completed_steps.push(step);
        if let Some(compensation) = compensation {
            self.compensations.push(compensation);
        }
    }

    /// Registers a compensation ahead of the step it guards.
    pub fn push_compensation(&mut self, compensation: Compensation) {
        self.compensations.push(compensation);
    }

    /// Drops every registered compensation.
    ///
    /// Past this point the saga recovers forward instead of undoing.
    pub fn pivot(&mut self) {
        self.compensations.clear();
    }

    /// Marks the saga as failed at `step` and returns the compensations to run.
    pub fn fail(&mut self, step: &'static str, reason: impl Into<String>) -> Vec<Compensation> {
        self.transition(SagaState::Compensating);
        self.failed_step = Some(step);
        self.failure_reason = Some(reason.into());
        let mut compensations = std::mem::take(&mut self.compensations);
        compensations.reverse();
        compensations
    }

    pub fn compensation_failed(&mut self, compensation: &Compensation, reason: impl Into<String>) {
        self.failed_compensations.push(CompensationFailure {
            compensation: compensation.name(),
            reason: reason.into(),
        });
    }

    /// Closes a failed saga once its compensations have run.
    pub fn finish_compensation(&mut self) -> SagaState {
        let next = if self.failed_compensations.is_empty() {
            SagaState::Compensated
        } else {
            SagaState::NeedsReconciliation
        };
        self.transition(next);
        self.state
    }

    pub fn commit(&mut self) {
        self.transition(SagaState::Committed);
    }

    fn transition(&mut self, next: SagaState) {
        debug_assert!(
            self.state.can_become(next),
            "saga {} cannot go from {} to {next}",
            self.operation,
            self.state
        );
        self.state = next;
    }
}

// Query methods
impl SagaInstance {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.document_id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn completed_steps(&self) -> &[&'static str] {
        &self.completed_steps
    }

    pub fn pending_compensations(&self) -> &[Compensation] {
        &self.compensations
    }

    pub fn failed_step(&self) -> Option<&'static str> {
        self.failed_step
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn failed_compensations(&self) -> &[CompensationFailure] {
        &self.failed_compensations
    }

    pub fn take_failed_compensations(&mut self) -> Vec<CompensationFailure> {
        std::mem::take(&mut self.failed_compensations)
    }
}
