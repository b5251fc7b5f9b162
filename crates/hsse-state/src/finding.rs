//! # Finding Sub-Workflow
//!
//! A finding is a nonconformance or observation recorded against a parent
//! workflow. Its severity and type fix, at creation, both its escalation
//! priority and whether closure is gated on an independent verification.
//!
//! ## States
//!
//! ```text
//! Open ──mark_as_resolved()──▶ Resolved ──mark_as_verified()──▶ Verified ──close()──▶ Closed
//!   │                             │
//!   │                             └──close()  (only when verification is not required)
//!   │
//!   └──mark_as_not_applicable()──▶ NotApplicable
//! ```
//!
//! Closing a finding that still awaits resolution or verification is a
//! [`WorkflowError::PrematureClosure`], never a silent no-op.

use serde::{Deserialize, Serialize};

use hsse_core::{escalate, ActorId, FindingId, FindingType, Priority, Severity, Timestamp};

use crate::error::{require_text, WorkflowError};
use crate::lifecycle::TransitionRecord;

/// Finding status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingStatus {
    /// Recorded, remediation pending.
    Open,
    /// Remediated, awaiting verification or closure.
    Resolved,
    /// Remediation independently confirmed.
    Verified,
    /// Closed (terminal).
    Closed,
    /// Dismissed as not applicable (terminal).
    NotApplicable,
}

impl FindingStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Resolved => "RESOLVED",
            Self::Verified => "VERIFIED",
            Self::Closed => "CLOSED",
            Self::NotApplicable => "NOT_APPLICABLE",
        }
    }

    /// Whether this status ends the finding's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::NotApplicable)
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for recording a new finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFinding {
    /// Caller-chosen id, so later commands in the same batch can refer to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FindingId>,
    /// What was found.
    pub description: String,
    /// Classification.
    pub finding_type: FindingType,
    /// Impact.
    pub severity: Severity,
    /// Where it was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Equipment concerned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
}

impl NewFinding {
    /// A finding with no location or equipment reference.
    pub fn new(description: impl Into<String>, finding_type: FindingType, severity: Severity) -> Self {
        Self {
            id: None,
            description: description.into(),
            finding_type,
            severity,
            location: None,
            equipment: None,
        }
    }
}

/// The remediation plan attached to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    /// What will be done.
    pub description: String,
    /// When it is due.
    pub due_date: Timestamp,
    /// Who is accountable.
    pub responsible_party: ActorId,
}

/// Evidence of an independent verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Verifier.
    pub verified_by: ActorId,
    /// When.
    pub verified_at: Timestamp,
    /// Verifier's notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Who closed the finding and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    /// Closer.
    pub closed_by: ActorId,
    /// When.
    pub closed_at: Timestamp,
    /// Closing notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Why the finding was dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dismissal {
    /// Who dismissed it.
    pub marked_by: ActorId,
    /// When.
    pub marked_at: Timestamp,
    /// Justification.
    pub reason: String,
}

/// A finding recorded against a workflow.
///
/// Fields are private; every mutation goes through a method that checks
/// the current status first and mutates nothing when it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    id: FindingId,
    description: String,
    finding_type: FindingType,
    severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equipment: Option<String>,
    status: FindingStatus,
    requires_verification: bool,
    priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    immediate_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    corrective_action: Option<RemediationPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolved_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verification: Option<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    closure: Option<Closure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dismissal: Option<Dismissal>,
    created_at: Timestamp,
    #[serde(default)]
    transitions: Vec<TransitionRecord<FindingStatus>>,
}

impl Finding {
    /// Record a new finding in `Open`.
    ///
    /// Priority and the verification gate are derived from severity and
    /// type here and never recomputed.
    pub fn create(new: NewFinding, now: Timestamp) -> Result<Self, WorkflowError> {
        require_text(&new.description, "finding description")?;
        let escalation = escalate(new.severity, new.finding_type);
        Ok(Self {
            id: new.id.unwrap_or_default(),
            description: new.description,
            finding_type: new.finding_type,
            severity: new.severity,
            location: new.location,
            equipment: new.equipment,
            status: FindingStatus::Open,
            requires_verification: escalation.requires_verification,
            priority: escalation.priority,
            immediate_action: None,
            corrective_action: None,
            resolved_at: None,
            verification: None,
            closure: None,
            dismissal: None,
            created_at: now,
            transitions: Vec::new(),
        })
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn id(&self) -> FindingId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn finding_type(&self) -> FindingType {
        self.finding_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn equipment(&self) -> Option<&str> {
        self.equipment.as_deref()
    }

    pub fn status(&self) -> FindingStatus {
        self.status
    }

    /// Whether closure is gated on [`Finding::mark_as_verified`].
    pub fn requires_verification(&self) -> bool {
        self.requires_verification
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn immediate_action(&self) -> Option<&str> {
        self.immediate_action.as_deref()
    }

    pub fn corrective_action(&self) -> Option<&RemediationPlan> {
        self.corrective_action.as_ref()
    }

    pub fn resolved_at(&self) -> Option<Timestamp> {
        self.resolved_at
    }

    pub fn verification(&self) -> Option<&Verification> {
        self.verification.as_ref()
    }

    pub fn closure(&self) -> Option<&Closure> {
        self.closure.as_ref()
    }

    pub fn dismissal(&self) -> Option<&Dismissal> {
        self.dismissal.as_ref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn transitions(&self) -> &[TransitionRecord<FindingStatus>] {
        &self.transitions
    }

    /// Not yet closed or dismissed.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Resolved, gated on verification, and not yet verified.
    pub fn awaiting_verification(&self) -> bool {
        self.status == FindingStatus::Resolved && self.requires_verification
    }

    // ── Remediation metadata ────────────────────────────────────────

    /// Record the containment step taken on discovery.
    pub fn set_immediate_action(&mut self, text: &str) -> Result<(), WorkflowError> {
        self.require_editable("set immediate action")?;
        require_text(text, "immediate action")?;
        self.immediate_action = Some(text.to_string());
        Ok(())
    }

    /// Attach or replace the remediation plan.
    pub fn set_corrective_action(&mut self, plan: RemediationPlan) -> Result<(), WorkflowError> {
        self.require_editable("set corrective action")?;
        require_text(&plan.description, "corrective action description")?;
        self.corrective_action = Some(plan);
        Ok(())
    }

    fn require_editable(&self, operation: &'static str) -> Result<(), WorkflowError> {
        match self.status {
            FindingStatus::Open | FindingStatus::Resolved => Ok(()),
            other => Err(WorkflowError::InvalidState {
                subject: "finding",
                state: other.as_str(),
                operation,
            }),
        }
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// `Open → Resolved`.
    pub fn mark_as_resolved(&mut self, now: Timestamp) -> Result<(), WorkflowError> {
        self.require_transition(FindingStatus::Open, FindingStatus::Resolved)?;
        self.resolved_at = Some(now);
        self.record(FindingStatus::Resolved, now, None, None);
        Ok(())
    }

    /// `Resolved → Verified`, for findings gated on verification only.
    pub fn mark_as_verified(
        &mut self,
        verified_by: ActorId,
        notes: Option<String>,
        now: Timestamp,
    ) -> Result<(), WorkflowError> {
        self.require_transition(FindingStatus::Resolved, FindingStatus::Verified)?;
        if !self.requires_verification {
            return Err(WorkflowError::VerificationNotRequired {
                finding_id: self.id,
                severity: self.severity,
            });
        }
        self.verification = Some(Verification {
            verified_by: verified_by.clone(),
            verified_at: now,
            notes: notes.clone(),
        });
        self.record(FindingStatus::Verified, now, Some(verified_by), notes);
        Ok(())
    }

    /// Close the finding.
    ///
    /// Allowed from `Verified`, or from `Resolved` when verification is not
    /// required. Any other open status is a premature closure.
    pub fn close(
        &mut self,
        closed_by: ActorId,
        notes: Option<String>,
        now: Timestamp,
    ) -> Result<(), WorkflowError> {
        let ready = match self.status {
            FindingStatus::Verified => true,
            FindingStatus::Resolved => !self.requires_verification,
            FindingStatus::Open => false,
            FindingStatus::Closed | FindingStatus::NotApplicable => {
                return Err(self.invalid(FindingStatus::Closed));
            }
        };
        if !ready {
            return Err(WorkflowError::PrematureClosure {
                finding_id: self.id,
                state: self.status.as_str(),
                requires_verification: self.requires_verification,
            });
        }
        self.closure = Some(Closure {
            closed_by: closed_by.clone(),
            closed_at: now,
            notes: notes.clone(),
        });
        self.record(FindingStatus::Closed, now, Some(closed_by), notes);
        Ok(())
    }

    /// `Open → NotApplicable`, with a mandatory justification.
    pub fn mark_as_not_applicable(
        &mut self,
        reason: &str,
        marked_by: ActorId,
        now: Timestamp,
    ) -> Result<(), WorkflowError> {
        self.require_transition(FindingStatus::Open, FindingStatus::NotApplicable)?;
        require_text(reason, "not-applicable reason")?;
        self.dismissal = Some(Dismissal {
            marked_by: marked_by.clone(),
            marked_at: now,
            reason: reason.to_string(),
        });
        self.record(
            FindingStatus::NotApplicable,
            now,
            Some(marked_by),
            Some(reason.to_string()),
        );
        Ok(())
    }

    fn require_transition(
        &self,
        from: FindingStatus,
        to: FindingStatus,
    ) -> Result<(), WorkflowError> {
        if self.status != from {
            return Err(self.invalid(to));
        }
        Ok(())
    }

    fn invalid(&self, to: FindingStatus) -> WorkflowError {
        WorkflowError::InvalidTransition {
            subject: "finding",
            from: self.status.as_str(),
            to: to.as_str(),
        }
    }

    fn record(
        &mut self,
        to: FindingStatus,
        now: Timestamp,
        actor: Option<ActorId>,
        reason: Option<String>,
    ) {
        let from = self.status;
        self.status = to;
        self.transitions
            .push(TransitionRecord::new(from, to, now).by(actor).because(reason));
    }

    /// Check the status against the data that must accompany it.
    pub(crate) fn check_invariants(&self) -> Result<(), WorkflowError> {
        let fail = |what: &str| {
            Err(WorkflowError::InconsistentState(format!(
                "finding {} in {}: {what}",
                self.id, self.status
            )))
        };
        let expected = escalate(self.severity, self.finding_type);
        if expected.requires_verification != self.requires_verification
            || expected.priority != self.priority
        {
            return fail("escalation does not match severity and type");
        }
        if self.status != FindingStatus::Open
            && self.status != FindingStatus::NotApplicable
            && self.resolved_at.is_none()
        {
            return fail("missing resolution date");
        }
        if !self.requires_verification
            && (self.status == FindingStatus::Verified || self.verification.is_some())
        {
            return fail("verification recorded on a finding without the verification gate");
        }
        let verified_path = matches!(self.status, FindingStatus::Verified)
            || (self.status == FindingStatus::Closed && self.requires_verification);
        if verified_path && self.verification.is_none() {
            return fail("missing verification");
        }
        if (self.status == FindingStatus::Closed) != self.closure.is_some() {
            return fail("closure record does not match status");
        }
        if (self.status == FindingStatus::NotApplicable) != self.dismissal.is_some() {
            return fail("dismissal record does not match status");
        }
        Ok(())
    }
}
