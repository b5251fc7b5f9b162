//! # Workflow Lifecycle Table
//!
//! Statuses, variants and the transition table shared by every compliance
//! workflow.
//!
//! ## Design Choice: Validated Enum over Typestate
//!
//! Workflows are loaded from storage and driven by API commands, so the
//! status is not known at compile time. Instead of one zero-sized type per
//! status, each variant declares a closed table ([`WorkflowKind::states`],
//! [`WorkflowKind::valid_transitions`]) and every transition method on
//! [`crate::Workflow`] consults it before touching anything. No call site
//! compares statuses ad hoc.
//!
//! ## Variants
//!
//! ```text
//! Audit / Inspection:
//!   Draft ──schedule()──▶ Scheduled ──start()──▶ InProgress ──complete()──▶ Completed
//!                           ▲    │
//!                           └────┘ reschedule
//!
//! WorkPermit: as Audit, plus
//!   Scheduled | InProgress ──expire()──▶ Expired
//!   Rejected | Expired ──reopen(override)──▶ Draft
//!
//! License:
//!   Draft ──submit()──▶ Submitted ──approve()──▶ Approved ──activate()──▶ Active
//!   Active ──suspend()──▶ Suspended ──reinstate()──▶ Active
//!   Active | Suspended ──revoke()──▶ Revoked
//!   Active | Suspended ──expire()──▶ Expired
//!   Rejected | Expired ──reopen(override)──▶ Draft
//!
//! SecurityIncident:
//!   Draft ──submit()──▶ Submitted ──start()──▶ InProgress ──resolve()──▶ Resolved ──close()──▶ Closed
//! ```
//!
//! `cancel()` and `reject()` lead from every non-terminal status to
//! Cancelled / Rejected, including a resolved incident.

use serde::{Deserialize, Serialize};

use hsse_core::{ActorId, Timestamp};

// ─── Workflow Kind ───────────────────────────────────────────────────

/// The compliance record variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Planned compliance audit.
    Audit,
    /// Site or equipment inspection.
    Inspection,
    /// Permit to perform hazardous work.
    WorkPermit,
    /// Regulatory or operating license.
    License,
    /// Reported security incident under investigation.
    SecurityIncident,
}

impl WorkflowKind {
    /// All workflow variants.
    pub fn all() -> &'static [WorkflowKind] {
        &[
            Self::Audit,
            Self::Inspection,
            Self::WorkPermit,
            Self::License,
            Self::SecurityIncident,
        ]
    }

    /// The snake_case identifier, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::Inspection => "inspection",
            Self::WorkPermit => "work_permit",
            Self::License => "license",
            Self::SecurityIncident => "security_incident",
        }
    }

    /// Statuses this variant can ever be in.
    pub fn states(&self) -> &'static [WorkflowStatus] {
        use WorkflowStatus::*;
        match self {
            Self::Audit | Self::Inspection => {
                &[Draft, Scheduled, InProgress, Completed, Cancelled, Rejected]
            }
            Self::WorkPermit => &[
                Draft, Scheduled, InProgress, Completed, Expired, Cancelled, Rejected,
            ],
            Self::License => &[
                Draft, Submitted, Approved, Active, Suspended, Revoked, Expired, Cancelled,
                Rejected,
            ],
            Self::SecurityIncident => &[
                Draft, Submitted, InProgress, Resolved, Closed, Cancelled, Rejected,
            ],
        }
    }

    /// Whether this variant has `status` in its lifecycle.
    pub fn has_state(&self, status: WorkflowStatus) -> bool {
        self.states().contains(&status)
    }

    /// Target statuses reachable from `from`.
    ///
    /// `Draft` appears as a target of Rejected/Expired for variants that
    /// support reopening; it is only reachable through an administrative
    /// override.
    pub fn valid_transitions(&self, from: WorkflowStatus) -> &'static [WorkflowStatus] {
        use WorkflowStatus::*;
        match (self, from) {
            (Self::Audit | Self::Inspection, Draft) => &[Scheduled, Cancelled, Rejected],
            (Self::Audit | Self::Inspection, Scheduled) => {
                &[Scheduled, InProgress, Cancelled, Rejected]
            }
            (Self::Audit | Self::Inspection, InProgress) => &[Completed, Cancelled, Rejected],

            (Self::WorkPermit, Draft) => &[Scheduled, Cancelled, Rejected],
            (Self::WorkPermit, Scheduled) => &[Scheduled, InProgress, Expired, Cancelled, Rejected],
            (Self::WorkPermit, InProgress) => &[Completed, Expired, Cancelled, Rejected],
            (Self::WorkPermit, Rejected | Expired) => &[Draft],

            (Self::License, Draft) => &[Submitted, Cancelled, Rejected],
            (Self::License, Submitted) => &[Approved, Cancelled, Rejected],
            (Self::License, Approved) => &[Active, Cancelled, Rejected],
            (Self::License, Active) => &[Suspended, Revoked, Expired, Cancelled, Rejected],
            (Self::License, Suspended) => &[Active, Revoked, Expired, Cancelled, Rejected],
            (Self::License, Rejected | Expired) => &[Draft],

            (Self::SecurityIncident, Draft) => &[Submitted, Cancelled, Rejected],
            (Self::SecurityIncident, Submitted) => &[InProgress, Cancelled, Rejected],
            (Self::SecurityIncident, InProgress) => &[Resolved, Cancelled, Rejected],
            (Self::SecurityIncident, Resolved) => &[Closed, Cancelled, Rejected],

            _ => &[],
        }
    }

    /// Whether `from → to` is in this variant's table.
    pub fn permits(&self, from: WorkflowStatus, to: WorkflowStatus) -> bool {
        self.valid_transitions(from).contains(&to)
    }

    /// Statuses during which new findings, items and corrective actions may
    /// be recorded.
    pub fn accepts_records(&self, status: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        match self {
            Self::Audit | Self::Inspection | Self::WorkPermit => {
                matches!(status, Scheduled | InProgress)
            }
            Self::License => matches!(status, Active | Suspended),
            Self::SecurityIncident => matches!(status, Submitted | InProgress),
        }
    }

    /// Whether a rejected or expired record can be reopened by override.
    pub fn supports_reopen(&self) -> bool {
        matches!(self, Self::WorkPermit | Self::License)
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowKind {
    type Err = hsse_core::HsseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| hsse_core::HsseError::UnknownVariant {
                kind: "workflow kind",
                value: s.to_string(),
            })
    }
}

// ─── Workflow Status ─────────────────────────────────────────────────

/// Lifecycle status of a workflow (union over all variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Being prepared; nothing may be recorded yet.
    Draft,
    /// Planned for a date.
    Scheduled,
    /// Submitted for approval or reported.
    Submitted,
    /// Approved, not yet in force.
    Approved,
    /// In force.
    Active,
    /// Work or investigation under way.
    InProgress,
    /// Temporarily out of force.
    Suspended,
    /// Investigation concluded, awaiting closure.
    Resolved,
    /// Work finished (terminal).
    Completed,
    /// Case closed (terminal).
    Closed,
    /// Refused (terminal).
    Rejected,
    /// Withdrawn (terminal).
    Cancelled,
    /// Validity lapsed (terminal).
    Expired,
    /// Permanently withdrawn by authority (terminal).
    Revoked,
}

impl WorkflowStatus {
    /// Every status, in declaration order.
    pub fn all() -> &'static [WorkflowStatus] {
        &[
            Self::Draft,
            Self::Scheduled,
            Self::Submitted,
            Self::Approved,
            Self::Active,
            Self::InProgress,
            Self::Suspended,
            Self::Resolved,
            Self::Completed,
            Self::Closed,
            Self::Rejected,
            Self::Cancelled,
            Self::Expired,
            Self::Revoked,
        ]
    }

    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Scheduled => "SCHEDULED",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Active => "ACTIVE",
            Self::InProgress => "IN_PROGRESS",
            Self::Suspended => "SUSPENDED",
            Self::Resolved => "RESOLVED",
            Self::Completed => "COMPLETED",
            Self::Closed => "CLOSED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
            Self::Revoked => "REVOKED",
        }
    }

    /// Whether this status ends the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Closed
                | Self::Rejected
                | Self::Cancelled
                | Self::Expired
                | Self::Revoked
        )
    }

    /// Whether an actual end date belongs with this status.
    pub fn carries_end_date(&self) -> bool {
        matches!(self, Self::Completed | Self::Closed | Self::Resolved)
    }

    /// Cancelled and rejected records accept no mutation at all, not even
    /// remediation of existing findings and actions.
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = hsse_core::HsseError;

    /// Case-insensitive; `in-progress` and `IN_PROGRESS` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|st| st.as_str() == wanted)
            .ok_or_else(|| hsse_core::HsseError::UnknownVariant {
                kind: "workflow status",
                value: s.to_string(),
            })
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// One entry of an append-only transition log.
///
/// Used for workflows, findings and corrective actions alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    /// Status before the transition.
    pub from: S,
    /// Status after the transition.
    pub to: S,
    /// When the transition occurred.
    pub at: Timestamp,
    /// Who performed it, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorId>,
    /// Free-text reason or note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl<S> TransitionRecord<S> {
    /// Build a record without actor or reason.
    pub fn new(from: S, to: S, at: Timestamp) -> Self {
        Self {
            from,
            to,
            at,
            actor: None,
            reason: None,
        }
    }

    /// Attach the acting party.
    pub fn by(mut self, actor: Option<ActorId>) -> Self {
        self.actor = actor;
        self
    }

    /// Attach a reason.
    pub fn because(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}
