//! # hsse-state — Compliance Workflow Engine
//!
//! State machines for HSSE compliance records and the findings and
//! corrective actions they own.
//!
//! ## State Machines
//!
//! - **Workflow lifecycle** (`lifecycle.rs`, `workflow.rs`): Audit,
//!   Inspection, WorkPermit, License and SecurityIncident share one status
//!   enum and one transition table, with per-variant subsets. The
//!   [`Workflow`] aggregate gates every record mutation by its own status.
//!
//! - **Finding** (`finding.rs`): `Open → Resolved → Verified → Closed`,
//!   with `Verified` mandatory for findings the severity mapper flags and
//!   `NotApplicable` as the dismissal path from `Open`.
//!
//! - **Corrective action** (`action.rs`): `Open → InProgress → Completed`
//!   or `Cancelled`, with overdue computed at read time.
//!
//! ## Design
//!
//! Statuses are validated enums rather than typestate: records are loaded
//! from storage and driven by commands, so their status is only known at
//! runtime. All mutation goes through methods that consult the transition
//! table and check inputs before touching any field, and deserialization
//! goes through [`Workflow::reconstitute`]. Time comes from an injected
//! [`hsse_core::Clock`].

pub mod action;
pub mod command;
pub mod error;
pub mod finding;
pub mod item;
pub mod lifecycle;
pub mod store;
pub mod summary;
pub mod workflow;

// ─── Lifecycle re-exports ────────────────────────────────────────────

pub use lifecycle::{TransitionRecord, WorkflowKind, WorkflowStatus};
pub use workflow::{
    AdministrativeOverride, Approval, NewWorkflow, Outcome, Workflow, WorkflowSnapshot,
};

// ─── Record re-exports ───────────────────────────────────────────────

pub use action::{ActionStatus, Completion, CorrectiveAction, NewCorrectiveAction};
pub use finding::{
    Closure, Dismissal, Finding, FindingStatus, NewFinding, RemediationPlan, Verification,
};
pub use item::{ItemKind, NewWorkItem, WorkItem};

// ─── Command, reporting and storage re-exports ──────────────────────

pub use command::{CommandOutcome, WorkflowCommand};
pub use error::WorkflowError;
pub use store::{update, InMemoryStore, StoreError, WorkflowStore};
pub use summary::{ActionCounts, FindingCounts, WorkflowSummary};
