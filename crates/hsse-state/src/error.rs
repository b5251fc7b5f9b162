//! # Workflow Errors
//!
//! Every rejected operation surfaces as a [`WorkflowError`] naming what was
//! attempted and the status it was attempted from. Callers can tell a
//! wrong-state rejection (`InvalidTransition`, `InvalidState`,
//! `PrematureClosure`) apart from bad input (`MissingPrecondition`).
//!
//! A rejected operation never leaves partial mutation behind.

use thiserror::Error;

use hsse_core::{ActionId, FindingId, HsseError, Severity};

/// Errors raised by workflow, finding and corrective action operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The status change is not permitted from the current status.
    #[error("invalid {subject} transition: {from} -> {to}")]
    InvalidTransition {
        /// What is transitioning ("audit", "finding", "corrective action", ...).
        subject: &'static str,
        /// Current status.
        from: &'static str,
        /// Attempted target status.
        to: &'static str,
    },

    /// A mutation was attempted while the owner is not in a state that
    /// accepts it (e.g. adding a finding to a draft or closed record).
    #[error("cannot {operation} while {subject} is {state}")]
    InvalidState {
        /// The record whose state blocks the operation.
        subject: &'static str,
        /// Its current status.
        state: &'static str,
        /// The operation that was refused.
        operation: &'static str,
    },

    /// A finding was closed before its resolution / verification steps.
    #[error(
        "finding {finding_id} cannot be closed from {state} (requires verification: {requires_verification})"
    )]
    PrematureClosure {
        /// The finding.
        finding_id: FindingId,
        /// Its current status.
        state: &'static str,
        /// Whether the finding is gated on verification.
        requires_verification: bool,
    },

    /// Required input was absent or blank.
    #[error("missing precondition: {0}")]
    MissingPrecondition(String),

    /// Verification was requested for a finding that is not gated on it.
    #[error("finding {finding_id} does not require verification (severity {severity})")]
    VerificationNotRequired {
        /// The finding.
        finding_id: FindingId,
        /// Its severity.
        severity: Severity,
    },

    /// The workflow variant has no such operation.
    #[error("{kind} does not support {operation}")]
    UnsupportedOperation {
        /// Workflow variant.
        kind: &'static str,
        /// The refused operation.
        operation: &'static str,
    },

    /// No finding with this id belongs to the workflow.
    #[error("finding {0} not found")]
    FindingNotFound(FindingId),

    /// No corrective action with this id belongs to the workflow.
    #[error("corrective action {0} not found")]
    ActionNotFound(ActionId),

    /// A caller-supplied record id is already in use within the workflow.
    #[error("duplicate record id: {0}")]
    DuplicateRecord(String),

    /// Persisted state violates a lifecycle invariant and was not loaded.
    #[error("inconsistent workflow state: {0}")]
    InconsistentState(String),

    /// One command of a batch was rejected; the whole batch was discarded.
    #[error("command {index} rejected: {source}")]
    CommandRejected {
        /// Zero-based position of the failing command.
        index: usize,
        /// Why it failed.
        #[source]
        source: Box<WorkflowError>,
    },
}

impl WorkflowError {
    /// Shorthand for [`WorkflowError::MissingPrecondition`].
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingPrecondition(what.into())
    }
}

impl From<HsseError> for WorkflowError {
    fn from(e: HsseError) -> Self {
        Self::MissingPrecondition(e.to_string())
    }
}

/// Reject blank text, naming the field in the error.
pub(crate) fn require_text(value: &str, field: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        return Err(WorkflowError::missing(format!("{field} must not be empty")));
    }
    Ok(())
}
