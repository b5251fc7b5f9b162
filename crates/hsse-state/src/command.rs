//! # Workflow Commands
//!
//! Every workflow operation as a serializable value, so the HTTP surface
//! and the CLI can drive the aggregate from JSON or YAML documents.
//!
//! ```json
//! [
//!   { "op": "schedule", "at": "2025-01-10T00:00:00Z" },
//!   { "op": "start" },
//!   { "op": "add_finding", "id": "…", "description": "…",
//!     "finding_type": "non_conformance", "severity": "major" }
//! ]
//! ```
//!
//! [`Workflow::apply_all`] applies a batch all-or-nothing: the batch runs
//! against a copy and the copy replaces the aggregate only if every
//! command succeeded.

use serde::{Deserialize, Serialize};

use hsse_core::{ActionId, ActorId, Clock, FindingId, ItemId, Timestamp};

use crate::action::NewCorrectiveAction;
use crate::error::WorkflowError;
use crate::finding::{NewFinding, RemediationPlan};
use crate::item::NewWorkItem;
use crate::workflow::{AdministrativeOverride, Workflow};

/// One workflow operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkflowCommand {
    // Lifecycle
    Schedule {
        at: Timestamp,
    },
    Start,
    Complete {
        summary: String,
        #[serde(default)]
        recommendations: Option<String>,
    },
    Submit,
    Approve {
        approved_by: ActorId,
        #[serde(default)]
        expires_at: Option<Timestamp>,
    },
    Activate,
    Suspend {
        reason: String,
    },
    Reinstate,
    Revoke {
        reason: String,
    },
    Expire,
    Resolve {
        resolution: String,
    },
    Close {
        #[serde(default)]
        notes: Option<String>,
    },
    Cancel {
        reason: String,
    },
    Reject {
        reason: String,
    },
    Reopen(AdministrativeOverride),

    // Records
    AddItem(NewWorkItem),
    AddFinding(NewFinding),
    SetImmediateAction {
        finding_id: FindingId,
        text: String,
    },
    SetFindingCorrectiveAction {
        finding_id: FindingId,
        plan: RemediationPlan,
    },
    ResolveFinding {
        finding_id: FindingId,
    },
    VerifyFinding {
        finding_id: FindingId,
        verified_by: ActorId,
        #[serde(default)]
        notes: Option<String>,
    },
    CloseFinding {
        finding_id: FindingId,
        closed_by: ActorId,
        #[serde(default)]
        notes: Option<String>,
    },
    MarkFindingNotApplicable {
        finding_id: FindingId,
        reason: String,
        marked_by: ActorId,
    },

    // Corrective actions
    AddCorrectiveAction(NewCorrectiveAction),
    StartAction {
        action_id: ActionId,
    },
    CompleteAction {
        action_id: ActionId,
        completed_by: ActorId,
        #[serde(default)]
        notes: Option<String>,
    },
    CancelAction {
        action_id: ActionId,
        reason: String,
    },
    RescheduleAction {
        action_id: ActionId,
        due_date: Timestamp,
    },
}

impl WorkflowCommand {
    /// The `op` tag of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Schedule { .. } => "schedule",
            Self::Start => "start",
            Self::Complete { .. } => "complete",
            Self::Submit => "submit",
            Self::Approve { .. } => "approve",
            Self::Activate => "activate",
            Self::Suspend { .. } => "suspend",
            Self::Reinstate => "reinstate",
            Self::Revoke { .. } => "revoke",
            Self::Expire => "expire",
            Self::Resolve { .. } => "resolve",
            Self::Close { .. } => "close",
            Self::Cancel { .. } => "cancel",
            Self::Reject { .. } => "reject",
            Self::Reopen(_) => "reopen",
            Self::AddItem(_) => "add_item",
            Self::AddFinding(_) => "add_finding",
            Self::SetImmediateAction { .. } => "set_immediate_action",
            Self::SetFindingCorrectiveAction { .. } => "set_finding_corrective_action",
            Self::ResolveFinding { .. } => "resolve_finding",
            Self::VerifyFinding { .. } => "verify_finding",
            Self::CloseFinding { .. } => "close_finding",
            Self::MarkFindingNotApplicable { .. } => "mark_finding_not_applicable",
            Self::AddCorrectiveAction(_) => "add_corrective_action",
            Self::StartAction { .. } => "start_action",
            Self::CompleteAction { .. } => "complete_action",
            Self::CancelAction { .. } => "cancel_action",
            Self::RescheduleAction { .. } => "reschedule_action",
        }
    }
}

/// What a successfully applied command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "id", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    ItemAdded(ItemId),
    FindingAdded(FindingId),
    ActionAdded(ActionId),
}

impl Workflow {
    /// Apply one command.
    pub fn apply(
        &mut self,
        command: WorkflowCommand,
        clock: &dyn Clock,
    ) -> Result<CommandOutcome, WorkflowError> {
        use WorkflowCommand as C;
        let applied = |r: Result<(), WorkflowError>| r.map(|()| CommandOutcome::Applied);
        match command {
            C::Schedule { at } => applied(self.schedule(at, clock)),
            C::Start => applied(self.start(clock)),
            C::Complete {
                summary,
                recommendations,
            } => applied(self.complete(&summary, recommendations, clock)),
            C::Submit => applied(self.submit(clock)),
            C::Approve {
                approved_by,
                expires_at,
            } => applied(self.approve(approved_by, expires_at, clock)),
            C::Activate => applied(self.activate(clock)),
            C::Suspend { reason } => applied(self.suspend(&reason, clock)),
            C::Reinstate => applied(self.reinstate(clock)),
            C::Revoke { reason } => applied(self.revoke(&reason, clock)),
            C::Expire => applied(self.expire(clock)),
            C::Resolve { resolution } => applied(self.resolve(&resolution, clock)),
            C::Close { notes } => applied(self.close(notes, clock)),
            C::Cancel { reason } => applied(self.cancel(&reason, clock)),
            C::Reject { reason } => applied(self.reject(&reason, clock)),
            C::Reopen(authorization) => applied(self.reopen(authorization, clock)),

            C::AddItem(new) => self.add_item(new, clock).map(CommandOutcome::ItemAdded),
            C::AddFinding(new) => self.add_finding(new, clock).map(CommandOutcome::FindingAdded),
            C::SetImmediateAction { finding_id, text } => {
                applied(self.set_finding_immediate_action(finding_id, &text, clock))
            }
            C::SetFindingCorrectiveAction { finding_id, plan } => {
                applied(self.set_finding_corrective_action(finding_id, plan, clock))
            }
            C::ResolveFinding { finding_id } => applied(self.resolve_finding(finding_id, clock)),
            C::VerifyFinding {
                finding_id,
                verified_by,
                notes,
            } => applied(self.verify_finding(finding_id, verified_by, notes, clock)),
            C::CloseFinding {
                finding_id,
                closed_by,
                notes,
            } => applied(self.close_finding(finding_id, closed_by, notes, clock)),
            C::MarkFindingNotApplicable {
                finding_id,
                reason,
                marked_by,
            } => applied(self.mark_finding_not_applicable(finding_id, &reason, marked_by, clock)),

            C::AddCorrectiveAction(new) => self
                .add_corrective_action(new, clock)
                .map(CommandOutcome::ActionAdded),
            C::StartAction { action_id } => applied(self.start_action(action_id, clock)),
            C::CompleteAction {
                action_id,
                completed_by,
                notes,
            } => applied(self.complete_action(action_id, completed_by, notes, clock)),
            C::CancelAction { action_id, reason } => {
                applied(self.cancel_action(action_id, &reason, clock))
            }
            C::RescheduleAction {
                action_id,
                due_date,
            } => applied(self.reschedule_action(action_id, due_date, clock)),
        }
    }

    /// Apply a batch atomically.
    ///
    /// On failure the aggregate is unchanged and the error names the index
    /// of the rejected command.
    pub fn apply_all(
        &mut self,
        commands: Vec<WorkflowCommand>,
        clock: &dyn Clock,
    ) -> Result<Vec<CommandOutcome>, WorkflowError> {
        let mut draft = self.clone();
        let mut outcomes = Vec::with_capacity(commands.len());
        for (index, command) in commands.into_iter().enumerate() {
            let outcome = draft
                .apply(command, clock)
                .map_err(|source| WorkflowError::CommandRejected {
                    index,
                    source: Box::new(source),
                })?;
            outcomes.push(outcome);
        }
        *self = draft;
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use hsse_core::{FixedClock, Severity};

    use crate::lifecycle::{WorkflowKind, WorkflowStatus};
    use crate::workflow::NewWorkflow;

    use super::*;

    fn clock() -> FixedClock {
        FixedClock::at(Timestamp::parse("2025-01-10T08:00:00Z").unwrap())
    }

    fn make_audit(clock: &dyn Clock) -> Workflow {
        Workflow::create(
            NewWorkflow {
                id: None,
                kind: WorkflowKind::Audit,
                number: "AUD-1".into(),
                title: "Annual HSE audit".into(),
            },
            clock,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_batch_from_json() {
        let json = r#"[
            {"op": "schedule", "at": "2025-01-10T00:00:00Z"},
            {"op": "start"},
            {"op": "add_finding", "description": "spill kit missing",
             "finding_type": "non_conformance", "severity": "major"},
            {"op": "complete", "summary": "one finding"}
        ]"#;
        let commands: Vec<WorkflowCommand> = serde_json::from_str(json).unwrap();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[2].name(), "add_finding");

        let c = clock();
        let mut wf = make_audit(&c);
        let outcomes = wf.apply_all(commands, &c).unwrap();
        assert_eq!(wf.status(), WorkflowStatus::Completed);
        assert!(matches!(outcomes[2], CommandOutcome::FindingAdded(_)));
        assert_eq!(wf.findings()[0].severity(), Severity::Major);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let c = clock();
        let mut wf = make_audit(&c);
        let before = wf.clone();
        let commands = vec![
            WorkflowCommand::Schedule { at: c.now() },
            WorkflowCommand::Start,
            WorkflowCommand::Cancel { reason: "".into() },
        ];
        let err = wf.apply_all(commands, &c).unwrap_err();
        match err {
            WorkflowError::CommandRejected { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, WorkflowError::MissingPrecondition(_)));
            }
            other => panic!("expected CommandRejected, got {other:?}"),
        }
        assert_eq!(wf, before);
    }

    #[test]
    fn test_batch_can_reference_supplied_ids() {
        let c = clock();
        let mut wf = make_audit(&c);
        let fid = FindingId::new();
        let verifier = ActorId::new("qa").unwrap();
        let mut finding = NewFinding::new(
            "missing lockout tag",
            hsse_core::FindingType::CriticalNonConformance,
            Severity::Moderate,
        );
        finding.id = Some(fid);
        let commands = vec![
            WorkflowCommand::Schedule { at: c.now() },
            WorkflowCommand::AddFinding(finding),
            WorkflowCommand::ResolveFinding { finding_id: fid },
            WorkflowCommand::VerifyFinding {
                finding_id: fid,
                verified_by: verifier.clone(),
                notes: None,
            },
            WorkflowCommand::CloseFinding {
                finding_id: fid,
                closed_by: verifier,
                notes: None,
            },
        ];
        let outcomes = wf.apply_all(commands, &c).unwrap();
        assert_eq!(outcomes[1], CommandOutcome::FindingAdded(fid));
        assert_eq!(
            wf.finding(fid).unwrap().status(),
            crate::finding::FindingStatus::Closed
        );
    }

    #[test]
    fn test_unknown_op_rejected() {
        let err = serde_json::from_str::<WorkflowCommand>(r#"{"op": "teleport"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(CommandOutcome::Applied).unwrap();
        assert_eq!(json, serde_json::json!({"result": "applied"}));
    }
}
