//! # Corrective Action Tracker
//!
//! Remediation tasks with an owner and a due date, optionally linked to the
//! finding they remediate.
//!
//! ```text
//! Open ──start()──▶ InProgress ──complete()──▶ Completed
//!  │  └──────────────complete()─────────────────▲
//!  └──cancel()──▶ Cancelled ◀──cancel()── InProgress
//! ```
//!
//! Overdue is a derived predicate: the due date is in the past and the
//! action is not completed. It is evaluated against an injected "now".

use serde::{Deserialize, Serialize};

use hsse_core::{ActionId, ActorId, FindingId, Priority, Timestamp};

use crate::error::{require_text, WorkflowError};
use crate::lifecycle::TransitionRecord;

/// Corrective action status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl ActionStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a corrective action.
///
/// `due_date` is mandatory; it is optional here so that its absence is
/// reported as a [`WorkflowError::MissingPrecondition`] rather than a
/// deserialization failure. `priority` may be omitted when `finding_id`
/// is given, in which case the finding's priority is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCorrectiveAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActionId>,
    pub description: String,
    pub responsible_party: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding_id: Option<FindingId>,
}

/// Completion evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub completed_by: ActorId,
    pub completed_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A corrective action owned by a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectiveAction {
    id: ActionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finding_id: Option<FindingId>,
    description: String,
    responsible_party: ActorId,
    due_date: Timestamp,
    priority: Priority,
    status: ActionStatus,
    created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completion: Option<Completion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cancellation_reason: Option<String>,
    #[serde(default)]
    transitions: Vec<TransitionRecord<ActionStatus>>,
}

impl CorrectiveAction {
    /// Create an `Open` action.
    ///
    /// The caller resolves the priority (explicit or inherited from the
    /// linked finding) before calling.
    pub(crate) fn create(
        new: NewCorrectiveAction,
        due_date: Timestamp,
        priority: Priority,
        now: Timestamp,
    ) -> Result<Self, WorkflowError> {
        require_text(&new.description, "corrective action description")?;
        Ok(Self {
            id: new.id.unwrap_or_default(),
            finding_id: new.finding_id,
            description: new.description,
            responsible_party: new.responsible_party,
            due_date,
            priority,
            status: ActionStatus::Open,
            created_at: now,
            started_at: None,
            completion: None,
            cancellation_reason: None,
            transitions: Vec::new(),
        })
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn finding_id(&self) -> Option<FindingId> {
        self.finding_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn responsible_party(&self) -> &ActorId {
        &self.responsible_party
    }

    pub fn due_date(&self) -> Timestamp {
        self.due_date
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> ActionStatus {
        self.status
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn transitions(&self) -> &[TransitionRecord<ActionStatus>] {
        &self.transitions
    }

    /// Due date in the past and not completed.
    ///
    /// Cancelled actions past their due date still count; only completion
    /// discharges the obligation.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.due_date < now && self.status != ActionStatus::Completed
    }

    /// `Open → InProgress`.
    pub fn start(&mut self, now: Timestamp) -> Result<(), WorkflowError> {
        if self.status != ActionStatus::Open {
            return Err(self.invalid(ActionStatus::InProgress));
        }
        self.started_at = Some(now);
        self.record(ActionStatus::InProgress, now, None, None);
        Ok(())
    }

    /// `Open | InProgress → Completed`.
    pub fn complete(
        &mut self,
        completed_by: ActorId,
        notes: Option<String>,
        now: Timestamp,
    ) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(self.invalid(ActionStatus::Completed));
        }
        self.completion = Some(Completion {
            completed_by: completed_by.clone(),
            completed_at: now,
            notes: notes.clone(),
        });
        self.record(ActionStatus::Completed, now, Some(completed_by), notes);
        Ok(())
    }

    /// `Open | InProgress → Cancelled`.
    pub fn cancel(&mut self, reason: &str, now: Timestamp) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(self.invalid(ActionStatus::Cancelled));
        }
        require_text(reason, "cancellation reason")?;
        self.cancellation_reason = Some(reason.to_string());
        self.record(ActionStatus::Cancelled, now, None, Some(reason.to_string()));
        Ok(())
    }

    /// Move the due date of a non-terminal action.
    pub fn reschedule(&mut self, due_date: Timestamp) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(WorkflowError::InvalidState {
                subject: "corrective action",
                state: self.status.as_str(),
                operation: "reschedule",
            });
        }
        self.due_date = due_date;
        Ok(())
    }

    fn invalid(&self, to: ActionStatus) -> WorkflowError {
        WorkflowError::InvalidTransition {
            subject: "corrective action",
            from: self.status.as_str(),
            to: to.as_str(),
        }
    }

    fn record(
        &mut self,
        to: ActionStatus,
        now: Timestamp,
        actor: Option<ActorId>,
        reason: Option<String>,
    ) {
        let from = self.status;
        self.status = to;
        self.transitions
            .push(TransitionRecord::new(from, to, now).by(actor).because(reason));
    }

    pub(crate) fn check_invariants(&self) -> Result<(), WorkflowError> {
        let fail = |what: &str| {
            Err(WorkflowError::InconsistentState(format!(
                "corrective action {} in {}: {what}",
                self.id, self.status
            )))
        };
        if (self.status == ActionStatus::Completed) != self.completion.is_some() {
            return fail("completion record does not match status");
        }
        if (self.status == ActionStatus::Cancelled) != self.cancellation_reason.is_some() {
            return fail("cancellation reason does not match status");
        }
        if self.status == ActionStatus::InProgress && self.started_at.is_none() {
            return fail("missing start date");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse("2025-03-01T12:00:00Z").unwrap()
    }

    fn owner() -> ActorId {
        ActorId::new("site-supervisor").unwrap()
    }

    fn make_action(due: Timestamp) -> CorrectiveAction {
        CorrectiveAction::create(
            NewCorrectiveAction {
                id: None,
                description: "replace fire extinguisher".into(),
                responsible_party: owner(),
                due_date: Some(due),
                priority: None,
                finding_id: None,
            },
            due,
            Priority::Medium,
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_overdue_until_completed() {
        let mut a = make_action(now().plus_days(-1));
        assert!(a.is_overdue(now()));
        a.complete(owner(), None, now()).unwrap();
        assert!(!a.is_overdue(now()));
    }

    #[test]
    fn test_not_overdue_on_due_instant() {
        let a = make_action(now());
        assert!(!a.is_overdue(now()));
        assert!(a.is_overdue(now().plus_secs(1)));
    }

    #[test]
    fn test_cancelled_past_due_counts_as_overdue() {
        let mut a = make_action(now().plus_days(-3));
        a.cancel("superseded", now()).unwrap();
        assert!(a.is_overdue(now()));
    }

    #[test]
    fn test_start_then_complete() {
        let mut a = make_action(now().plus_days(7));
        a.start(now()).unwrap();
        assert_eq!(a.started_at(), Some(now()));
        a.complete(owner(), Some("installed".into()), now()).unwrap();
        assert_eq!(a.status(), ActionStatus::Completed);
        assert_eq!(a.transitions().len(), 2);
        a.check_invariants().unwrap();
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut a = make_action(now());
        a.start(now()).unwrap();
        let err = a.start(now()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition { from: "IN_PROGRESS", to: "IN_PROGRESS", .. }
        ));
    }

    #[test]
    fn test_terminal_actions_are_frozen() {
        let mut a = make_action(now());
        a.complete(owner(), None, now()).unwrap();
        assert!(a.cancel("oops", now()).is_err());
        assert!(a.complete(owner(), None, now()).is_err());
        assert!(matches!(
            a.reschedule(now().plus_days(1)),
            Err(WorkflowError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_cancel_requires_reason_and_leaves_state() {
        let mut a = make_action(now());
        assert!(matches!(
            a.cancel("", now()),
            Err(WorkflowError::MissingPrecondition(_))
        ));
        assert_eq!(a.status(), ActionStatus::Open);
        assert!(a.transitions().is_empty());
    }

    #[test]
    fn test_reschedule_clears_overdue() {
        let mut a = make_action(now().plus_days(-1));
        a.reschedule(now().plus_days(5)).unwrap();
        assert!(!a.is_overdue(now()));
    }
}
