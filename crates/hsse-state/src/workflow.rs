//! # Workflow Aggregate
//!
//! One compliance record (audit, inspection, work permit, license or
//! security incident) together with the work items, findings and
//! corrective actions it owns. The aggregate is the only way to mutate any
//! of them: every operation checks the parent's status before delegating to
//! the finding or action state machine.
//!
//! ## Invariants
//!
//! - Dates are set by transitions only: `actual_start_at` by `start()`,
//!   `actual_end_at` by `complete()` / `resolve()`.
//! - New records are accepted only while [`WorkflowKind::accepts_records`]
//!   holds. Existing records can still be remediated after completion, but
//!   never once the workflow is Cancelled or Rejected.
//! - A failed operation leaves the aggregate untouched. A successful one
//!   increments [`Workflow::version`].
//!
//! ## Persistence
//!
//! The aggregate serializes through [`WorkflowSnapshot`]. Deserialization
//! goes through [`Workflow::reconstitute`], which refuses snapshots whose
//! dates, statuses or derived fields contradict the lifecycle rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use hsse_core::{
    ActionId, ActorId, Clock, FindingId, ItemId, Severity, Timestamp, WorkflowId,
};

use crate::action::{CorrectiveAction, NewCorrectiveAction};
use crate::error::{require_text, WorkflowError};
use crate::finding::{Finding, NewFinding, RemediationPlan};
use crate::item::{ItemKind, NewWorkItem, WorkItem};
use crate::lifecycle::{TransitionRecord, WorkflowKind, WorkflowStatus};

// ─── Supporting Types ────────────────────────────────────────────────

/// Input for creating a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WorkflowId>,
    pub kind: WorkflowKind,
    /// Human-readable reference, e.g. `AUD-2025-014`.
    pub number: String,
    pub title: String,
}

/// Approval of a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub approved_by: ActorId,
    pub approved_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

/// Recorded outcome of a completed or resolved workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
}

/// Explicit authorization to reopen a rejected or expired record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrativeOverride {
    pub authorized_by: ActorId,
    pub reason: String,
}

// ─── Workflow ────────────────────────────────────────────────────────

/// A compliance workflow and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkflowSnapshot", into = "WorkflowSnapshot")]
pub struct Workflow {
    id: WorkflowId,
    kind: WorkflowKind,
    number: String,
    title: String,
    status: WorkflowStatus,
    created_at: Timestamp,
    updated_at: Timestamp,
    scheduled_at: Option<Timestamp>,
    actual_start_at: Option<Timestamp>,
    actual_end_at: Option<Timestamp>,
    approval: Option<Approval>,
    outcome: Option<Outcome>,
    items: Vec<WorkItem>,
    findings: Vec<Finding>,
    actions: Vec<CorrectiveAction>,
    transitions: Vec<TransitionRecord<WorkflowStatus>>,
    version: u64,
}

impl Workflow {
    /// Create a workflow in `Draft` at version 1.
    pub fn create(new: NewWorkflow, clock: &dyn Clock) -> Result<Self, WorkflowError> {
        require_text(&new.number, "workflow number")?;
        require_text(&new.title, "workflow title")?;
        let now = clock.now();
        Ok(Self {
            id: new.id.unwrap_or_default(),
            kind: new.kind,
            number: new.number,
            title: new.title,
            status: WorkflowStatus::Draft,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            actual_start_at: None,
            actual_end_at: None,
            approval: None,
            outcome: None,
            items: Vec::new(),
            findings: Vec::new(),
            actions: Vec::new(),
            transitions: Vec::new(),
            version: 1,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Time of the last successful mutation.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn scheduled_at(&self) -> Option<Timestamp> {
        self.scheduled_at
    }

    pub fn actual_start_at(&self) -> Option<Timestamp> {
        self.actual_start_at
    }

    pub fn actual_end_at(&self) -> Option<Timestamp> {
        self.actual_end_at
    }

    pub fn approval(&self) -> Option<&Approval> {
        self.approval.as_ref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn finding(&self, id: FindingId) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id() == id)
    }

    pub fn actions(&self) -> &[CorrectiveAction] {
        &self.actions
    }

    pub fn action(&self, id: ActionId) -> Option<&CorrectiveAction> {
        self.actions.iter().find(|a| a.id() == id)
    }

    pub fn transitions(&self) -> &[TransitionRecord<WorkflowStatus>] {
        &self.transitions
    }

    /// Monotonic counter incremented by every successful mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Corrective actions overdue at `now`, in insertion order.
    pub fn overdue_actions(&self, now: Timestamp) -> Vec<&CorrectiveAction> {
        self.actions.iter().filter(|a| a.is_overdue(now)).collect()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// `Draft → Scheduled`, or re-schedule while Scheduled.
    ///
    /// Re-scheduling to the date already set succeeds without recording
    /// anything.
    pub fn schedule(&mut self, at: Timestamp, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Scheduled, "schedule")?;
        let previous = match self.status {
            WorkflowStatus::Scheduled => self.scheduled_at,
            _ => None,
        };
        if previous == Some(at) {
            return Ok(());
        }
        self.scheduled_at = Some(at);
        let reason = previous.map(|p| format!("rescheduled from {p}"));
        self.transition(WorkflowStatus::Scheduled, clock.now(), None, reason);
        Ok(())
    }

    /// `Scheduled → InProgress` (incidents: `Submitted → InProgress`).
    pub fn start(&mut self, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::InProgress, "start")?;
        let now = clock.now();
        self.actual_start_at = Some(now);
        self.transition(WorkflowStatus::InProgress, now, None, None);
        Ok(())
    }

    /// `InProgress → Completed`. Findings may remain open.
    pub fn complete(
        &mut self,
        summary: &str,
        recommendations: Option<String>,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Completed, "complete")?;
        require_text(summary, "completion summary")?;
        let now = clock.now();
        self.actual_end_at = Some(now);
        self.outcome = Some(Outcome {
            summary: summary.to_string(),
            recommendations,
        });
        self.transition(WorkflowStatus::Completed, now, None, None);
        Ok(())
    }

    /// Report a draft license application or incident.
    pub fn submit(&mut self, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Submitted, "submit")?;
        self.transition(WorkflowStatus::Submitted, clock.now(), None, None);
        Ok(())
    }

    /// `Submitted → Approved`, optionally with an expiry date.
    pub fn approve(
        &mut self,
        approved_by: ActorId,
        expires_at: Option<Timestamp>,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Approved, "approve")?;
        let now = clock.now();
        if let Some(expiry) = expires_at {
            if expiry <= now {
                return Err(WorkflowError::missing(format!(
                    "expiry {expiry} must be after approval time {now}"
                )));
            }
        }
        self.approval = Some(Approval {
            approved_by: approved_by.clone(),
            approved_at: now,
            expires_at,
        });
        self.transition(WorkflowStatus::Approved, now, Some(approved_by), None);
        Ok(())
    }

    /// `Approved → Active`.
    pub fn activate(&mut self, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Active, "activate")?;
        self.require_source(WorkflowStatus::Approved, WorkflowStatus::Active)?;
        self.transition(WorkflowStatus::Active, clock.now(), None, None);
        Ok(())
    }

    /// `Active → Suspended`.
    pub fn suspend(&mut self, reason: &str, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Suspended, "suspend")?;
        require_text(reason, "suspension reason")?;
        self.transition(
            WorkflowStatus::Suspended,
            clock.now(),
            None,
            Some(reason.to_string()),
        );
        Ok(())
    }

    /// `Suspended → Active`.
    pub fn reinstate(&mut self, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Active, "reinstate")?;
        self.require_source(WorkflowStatus::Suspended, WorkflowStatus::Active)?;
        self.transition(WorkflowStatus::Active, clock.now(), None, None);
        Ok(())
    }

    /// `Active | Suspended → Revoked`.
    pub fn revoke(&mut self, reason: &str, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Revoked, "revoke")?;
        require_text(reason, "revocation reason")?;
        self.transition(
            WorkflowStatus::Revoked,
            clock.now(),
            None,
            Some(reason.to_string()),
        );
        Ok(())
    }

    /// Mark a license or work permit as lapsed.
    pub fn expire(&mut self, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Expired, "expire")?;
        self.transition(WorkflowStatus::Expired, clock.now(), None, None);
        Ok(())
    }

    /// `InProgress → Resolved` for a security incident.
    pub fn resolve(&mut self, resolution: &str, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Resolved, "resolve")?;
        require_text(resolution, "resolution")?;
        let now = clock.now();
        self.actual_end_at = Some(now);
        self.outcome = Some(Outcome {
            summary: resolution.to_string(),
            recommendations: None,
        });
        self.transition(WorkflowStatus::Resolved, now, None, None);
        Ok(())
    }

    /// `Resolved → Closed` for a security incident.
    pub fn close(&mut self, notes: Option<String>, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Closed, "close")?;
        self.transition(WorkflowStatus::Closed, clock.now(), None, notes);
        Ok(())
    }

    /// Withdraw the record. Valid from any open status.
    pub fn cancel(&mut self, reason: &str, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Cancelled, "cancel")?;
        require_text(reason, "cancellation reason")?;
        self.transition(
            WorkflowStatus::Cancelled,
            clock.now(),
            None,
            Some(reason.to_string()),
        );
        Ok(())
    }

    /// Refuse the record. Valid from any open status.
    pub fn reject(&mut self, reason: &str, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.require_transition(WorkflowStatus::Rejected, "reject")?;
        require_text(reason, "rejection reason")?;
        self.transition(
            WorkflowStatus::Rejected,
            clock.now(),
            None,
            Some(reason.to_string()),
        );
        Ok(())
    }

    /// Return a rejected or expired work permit / license to `Draft`.
    ///
    /// Planned and actual dates, approval and outcome are cleared. Existing
    /// items, findings and actions stay attached and the transition log
    /// keeps the earlier history.
    pub fn reopen(
        &mut self,
        authorization: AdministrativeOverride,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        if !self.kind.supports_reopen() {
            return Err(WorkflowError::UnsupportedOperation {
                kind: self.kind.as_str(),
                operation: "reopen",
            });
        }
        self.require_transition(WorkflowStatus::Draft, "reopen")?;
        require_text(&authorization.reason, "override reason")?;
        self.scheduled_at = None;
        self.actual_start_at = None;
        self.actual_end_at = None;
        self.approval = None;
        self.outcome = None;
        self.transition(
            WorkflowStatus::Draft,
            clock.now(),
            Some(authorization.authorized_by),
            Some(authorization.reason),
        );
        Ok(())
    }

    // ── Work items ──────────────────────────────────────────────────

    /// Attach a checklist item, hazard, precaution or condition.
    pub fn add_item(&mut self, new: NewWorkItem, clock: &dyn Clock) -> Result<ItemId, WorkflowError> {
        self.require_accepting("add item")?;
        if let Some(id) = new.id {
            if self.items.iter().any(|i| i.id == id) {
                return Err(WorkflowError::DuplicateRecord(id.to_string()));
            }
        }
        let now = clock.now();
        let item = WorkItem::create(new, now)?;
        let id = item.id;
        self.items.push(item);
        self.touch(now);
        Ok(id)
    }

    /// Attach a hazard with its assessed risk.
    pub fn add_hazard(
        &mut self,
        description: &str,
        risk: Severity,
        clock: &dyn Clock,
    ) -> Result<ItemId, WorkflowError> {
        self.add_item(
            NewWorkItem {
                id: None,
                kind: ItemKind::Hazard,
                description: description.to_string(),
                risk: Some(risk),
            },
            clock,
        )
    }

    // ── Findings ────────────────────────────────────────────────────

    /// Record a finding in `Open`.
    pub fn add_finding(
        &mut self,
        new: NewFinding,
        clock: &dyn Clock,
    ) -> Result<FindingId, WorkflowError> {
        self.require_accepting("add finding")?;
        if let Some(id) = new.id {
            if self.finding(id).is_some() {
                return Err(WorkflowError::DuplicateRecord(id.to_string()));
            }
        }
        let now = clock.now();
        let finding = Finding::create(new, now)?;
        let id = finding.id();
        self.findings.push(finding);
        self.touch(now);
        Ok(id)
    }

    pub fn set_finding_immediate_action(
        &mut self,
        id: FindingId,
        text: &str,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_finding(id, "update finding", clock, |f, _| {
            f.set_immediate_action(text)
        })
    }

    pub fn set_finding_corrective_action(
        &mut self,
        id: FindingId,
        plan: RemediationPlan,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_finding(id, "update finding", clock, |f, _| {
            f.set_corrective_action(plan)
        })
    }

    pub fn resolve_finding(&mut self, id: FindingId, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.with_finding(id, "resolve finding", clock, |f, now| f.mark_as_resolved(now))
    }

    pub fn verify_finding(
        &mut self,
        id: FindingId,
        verified_by: ActorId,
        notes: Option<String>,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_finding(id, "verify finding", clock, |f, now| {
            f.mark_as_verified(verified_by, notes, now)
        })
    }

    pub fn close_finding(
        &mut self,
        id: FindingId,
        closed_by: ActorId,
        notes: Option<String>,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_finding(id, "close finding", clock, |f, now| {
            f.close(closed_by, notes, now)
        })
    }

    pub fn mark_finding_not_applicable(
        &mut self,
        id: FindingId,
        reason: &str,
        marked_by: ActorId,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_finding(id, "dismiss finding", clock, |f, now| {
            f.mark_as_not_applicable(reason, marked_by, now)
        })
    }

    // ── Corrective actions ──────────────────────────────────────────

    /// Create a corrective action, optionally linked to an open finding.
    ///
    /// Without an explicit priority the linked finding's priority is used;
    /// with neither, the call fails with `MissingPrecondition`.
    pub fn add_corrective_action(
        &mut self,
        new: NewCorrectiveAction,
        clock: &dyn Clock,
    ) -> Result<ActionId, WorkflowError> {
        self.require_accepting("add corrective action")?;
        let due_date = new
            .due_date
            .ok_or_else(|| WorkflowError::missing("corrective action due date is required"))?;
        let inherited = match new.finding_id {
            Some(finding_id) => {
                let finding = self
                    .finding(finding_id)
                    .ok_or(WorkflowError::FindingNotFound(finding_id))?;
                if !finding.is_open() {
                    return Err(WorkflowError::InvalidState {
                        subject: "finding",
                        state: finding.status().as_str(),
                        operation: "link corrective action",
                    });
                }
                Some(finding.priority())
            }
            None => None,
        };
        let priority = new.priority.or(inherited).ok_or_else(|| {
            WorkflowError::missing("priority is required when no finding is linked")
        })?;
        if let Some(id) = new.id {
            if self.action(id).is_some() {
                return Err(WorkflowError::DuplicateRecord(id.to_string()));
            }
        }
        let now = clock.now();
        let action = CorrectiveAction::create(new, due_date, priority, now)?;
        let id = action.id();
        self.actions.push(action);
        self.touch(now);
        Ok(id)
    }

    pub fn start_action(&mut self, id: ActionId, clock: &dyn Clock) -> Result<(), WorkflowError> {
        self.with_action(id, "start corrective action", clock, |a, now| a.start(now))
    }

    pub fn complete_action(
        &mut self,
        id: ActionId,
        completed_by: ActorId,
        notes: Option<String>,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_action(id, "complete corrective action", clock, |a, now| {
            a.complete(completed_by, notes, now)
        })
    }

    pub fn cancel_action(
        &mut self,
        id: ActionId,
        reason: &str,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_action(id, "cancel corrective action", clock, |a, now| {
            a.cancel(reason, now)
        })
    }

    pub fn reschedule_action(
        &mut self,
        id: ActionId,
        due_date: Timestamp,
        clock: &dyn Clock,
    ) -> Result<(), WorkflowError> {
        self.with_action(id, "reschedule corrective action", clock, |a, _| {
            a.reschedule(due_date)
        })
    }

    // ── Guards ──────────────────────────────────────────────────────

    fn require_transition(
        &self,
        target: WorkflowStatus,
        operation: &'static str,
    ) -> Result<(), WorkflowError> {
        if !self.kind.has_state(target) && !is_common_target(target) {
            return Err(WorkflowError::UnsupportedOperation {
                kind: self.kind.as_str(),
                operation,
            });
        }
        if !self.kind.permits(self.status, target) {
            return Err(self.invalid(target));
        }
        Ok(())
    }

    /// For targets reachable from several statuses through different
    /// operations (`activate` vs `reinstate`).
    fn require_source(
        &self,
        source: WorkflowStatus,
        target: WorkflowStatus,
    ) -> Result<(), WorkflowError> {
        if self.status != source {
            return Err(self.invalid(target));
        }
        Ok(())
    }

    fn invalid(&self, target: WorkflowStatus) -> WorkflowError {
        WorkflowError::InvalidTransition {
            subject: self.kind.as_str(),
            from: self.status.as_str(),
            to: target.as_str(),
        }
    }

    fn require_accepting(&self, operation: &'static str) -> Result<(), WorkflowError> {
        if !self.kind.accepts_records(self.status) {
            return Err(WorkflowError::InvalidState {
                subject: self.kind.as_str(),
                state: self.status.as_str(),
                operation,
            });
        }
        Ok(())
    }

    fn require_mutable(&self, operation: &'static str) -> Result<(), WorkflowError> {
        if self.status == WorkflowStatus::Draft || self.status.is_frozen() {
            return Err(WorkflowError::InvalidState {
                subject: self.kind.as_str(),
                state: self.status.as_str(),
                operation,
            });
        }
        Ok(())
    }

    fn with_finding<F>(
        &mut self,
        id: FindingId,
        operation: &'static str,
        clock: &dyn Clock,
        f: F,
    ) -> Result<(), WorkflowError>
    where
        F: FnOnce(&mut Finding, Timestamp) -> Result<(), WorkflowError>,
    {
        self.require_mutable(operation)?;
        let now = clock.now();
        let finding = self
            .findings
            .iter_mut()
            .find(|candidate| candidate.id() == id)
            .ok_or(WorkflowError::FindingNotFound(id))?;
        f(finding, now)?;
        self.touch(now);
        Ok(())
    }

    fn with_action<F>(
        &mut self,
        id: ActionId,
        operation: &'static str,
        clock: &dyn Clock,
        f: F,
    ) -> Result<(), WorkflowError>
    where
        F: FnOnce(&mut CorrectiveAction, Timestamp) -> Result<(), WorkflowError>,
    {
        self.require_mutable(operation)?;
        let now = clock.now();
        let action = self
            .actions
            .iter_mut()
            .find(|candidate| candidate.id() == id)
            .ok_or(WorkflowError::ActionNotFound(id))?;
        f(action, now)?;
        self.touch(now);
        Ok(())
    }

    fn transition(
        &mut self,
        to: WorkflowStatus,
        now: Timestamp,
        actor: Option<ActorId>,
        reason: Option<String>,
    ) {
        let from = self.status;
        self.status = to;
        self.transitions
            .push(TransitionRecord::new(from, to, now).by(actor).because(reason));
        self.touch(now);
    }

    fn touch(&mut self, now: Timestamp) {
        self.version += 1;
        self.updated_at = now;
    }

    // ── Reconstitution ──────────────────────────────────────────────

    /// Rebuild a workflow from persisted state, validating every
    /// lifecycle invariant instead of trusting the stored fields.
    pub fn reconstitute(snapshot: WorkflowSnapshot) -> Result<Self, WorkflowError> {
        let wf = Self {
            id: snapshot.id,
            kind: snapshot.kind,
            number: snapshot.number,
            title: snapshot.title,
            status: snapshot.status,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            scheduled_at: snapshot.scheduled_at,
            actual_start_at: snapshot.actual_start_at,
            actual_end_at: snapshot.actual_end_at,
            approval: snapshot.approval,
            outcome: snapshot.outcome,
            items: snapshot.items,
            findings: snapshot.findings,
            actions: snapshot.actions,
            transitions: snapshot.transitions,
            version: snapshot.version,
        };
        wf.check_invariants()?;
        Ok(wf)
    }

    fn check_invariants(&self) -> Result<(), WorkflowError> {
        let fail = |what: String| {
            Err(WorkflowError::InconsistentState(format!(
                "{} {} in {}: {what}",
                self.kind, self.id, self.status
            )))
        };
        use WorkflowStatus::*;

        if !self.kind.has_state(self.status) {
            return fail(format!("{} has no status {}", self.kind, self.status));
        }
        if self.number.trim().is_empty() || self.title.trim().is_empty() {
            return fail("number and title are required".into());
        }
        if self.version == 0 {
            return fail("version must be at least 1".into());
        }
        match self.transitions.last() {
            Some(last) if last.to != self.status => {
                return fail(format!("last transition leads to {}", last.to));
            }
            None if self.status != Draft => {
                return fail("status reached without any transition".into());
            }
            _ => {}
        }
        if self.status == Scheduled && self.scheduled_at.is_none() {
            return fail("scheduled without a date".into());
        }
        if matches!(self.status, InProgress | Completed | Resolved | Closed)
            && self.actual_start_at.is_none()
        {
            return fail("reached only through start() but has no start date".into());
        }
        if self.actual_start_at.is_some() && !self.transitions.iter().any(|t| t.to == InProgress) {
            return fail("start date set without passing through IN_PROGRESS".into());
        }
        let withdrawn_after_resolution =
            self.status.is_frozen() && self.transitions.iter().any(|t| t.to == Resolved);
        if self.actual_end_at.is_some()
            != (self.status.carries_end_date() || withdrawn_after_resolution)
        {
            return fail("end date does not match status".into());
        }
        if self.status.carries_end_date() && self.outcome.is_none() {
            return fail("missing outcome".into());
        }
        if matches!(self.status, Approved | Active | Suspended) && self.approval.is_none() {
            return fail("missing approval".into());
        }

        let mut seen = HashSet::new();
        if !self.items.iter().all(|i| seen.insert(i.id)) {
            return fail("duplicate item id".into());
        }
        let mut finding_ids = HashSet::new();
        for finding in &self.findings {
            if !finding_ids.insert(finding.id()) {
                return fail(format!("duplicate finding {}", finding.id()));
            }
            finding.check_invariants()?;
        }
        let mut action_ids = HashSet::new();
        for action in &self.actions {
            if !action_ids.insert(action.id()) {
                return fail(format!("duplicate corrective action {}", action.id()));
            }
            if let Some(fid) = action.finding_id() {
                if !finding_ids.contains(&fid) {
                    return fail(format!("corrective action {} links unknown {fid}", action.id()));
                }
            }
            action.check_invariants()?;
        }
        Ok(())
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────

/// The persisted form of a [`Workflow`].
///
/// Plain data with public fields. Converting back into a `Workflow` runs
/// [`Workflow::reconstitute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub id: WorkflowId,
    pub kind: WorkflowKind,
    pub number: String,
    pub title: String,
    pub status: WorkflowStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub items: Vec<WorkItem>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub actions: Vec<CorrectiveAction>,
    #[serde(default)]
    pub transitions: Vec<TransitionRecord<WorkflowStatus>>,
    pub version: u64,
}

impl From<Workflow> for WorkflowSnapshot {
    fn from(wf: Workflow) -> Self {
        Self {
            id: wf.id,
            kind: wf.kind,
            number: wf.number,
            title: wf.title,
            status: wf.status,
            created_at: wf.created_at,
            updated_at: wf.updated_at,
            scheduled_at: wf.scheduled_at,
            actual_start_at: wf.actual_start_at,
            actual_end_at: wf.actual_end_at,
            approval: wf.approval,
            outcome: wf.outcome,
            items: wf.items,
            findings: wf.findings,
            actions: wf.actions,
            transitions: wf.transitions,
            version: wf.version,
        }
    }
}

impl TryFrom<WorkflowSnapshot> for Workflow {
    type Error = WorkflowError;

    fn try_from(snapshot: WorkflowSnapshot) -> Result<Self, Self::Error> {
        Self::reconstitute(snapshot)
    }
}

/// Targets of the operations every variant exposes (schedule, start,
/// complete, cancel, reject). A variant whose table never reaches one of
/// them reports an invalid transition rather than an unknown operation.
fn is_common_target(status: WorkflowStatus) -> bool {
    matches!(
        status,
        WorkflowStatus::Scheduled
            | WorkflowStatus::InProgress
            | WorkflowStatus::Completed
            | WorkflowStatus::Cancelled
            | WorkflowStatus::Rejected
    )
}
