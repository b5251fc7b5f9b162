//! Completion reporting: how much remediation is still outstanding on a
//! workflow at a given instant.

use serde::{Deserialize, Serialize};

use hsse_core::{Priority, Timestamp, WorkflowId};

use crate::action::ActionStatus;
use crate::finding::FindingStatus;
use crate::lifecycle::{WorkflowKind, WorkflowStatus};
use crate::workflow::Workflow;

/// Finding counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub total: usize,
    /// Neither closed nor dismissed: open, resolved or verified.
    pub open: usize,
    /// Resolved findings still waiting at the verification gate. Also
    /// counted in `open`.
    pub awaiting_verification: usize,
    pub closed: usize,
    pub not_applicable: usize,
}

/// Corrective action counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub overdue: usize,
}

/// Remediation status of a workflow, computed at `as_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub workflow_id: WorkflowId,
    pub kind: WorkflowKind,
    pub status: WorkflowStatus,
    pub as_of: Timestamp,
    pub findings: FindingCounts,
    pub actions: ActionCounts,
    /// Highest priority among findings and actions still open.
    pub highest_open_priority: Option<Priority>,
    /// No open finding and no open or in-progress action remains.
    pub remediation_complete: bool,
}

impl Workflow {
    /// Summarize outstanding remediation as of `now`.
    pub fn summary(&self, now: Timestamp) -> WorkflowSummary {
        let mut findings = FindingCounts::default();
        let mut highest: Option<Priority> = None;
        for f in self.findings() {
            findings.total += 1;
            match f.status() {
                FindingStatus::Open | FindingStatus::Resolved | FindingStatus::Verified => {
                    findings.open += 1;
                    highest = highest.max(Some(f.priority()));
                }
                FindingStatus::Closed => findings.closed += 1,
                FindingStatus::NotApplicable => findings.not_applicable += 1,
            }
            if f.awaiting_verification() {
                findings.awaiting_verification += 1;
            }
        }

        let mut actions = ActionCounts::default();
        for a in self.actions() {
            actions.total += 1;
            match a.status() {
                ActionStatus::Open => actions.open += 1,
                ActionStatus::InProgress => actions.in_progress += 1,
                ActionStatus::Completed => actions.completed += 1,
                ActionStatus::Cancelled => actions.cancelled += 1,
            }
            if !a.status().is_terminal() {
                highest = highest.max(Some(a.priority()));
            }
            if a.is_overdue(now) {
                actions.overdue += 1;
            }
        }

        WorkflowSummary {
            workflow_id: self.id(),
            kind: self.kind(),
            status: self.status(),
            as_of: now,
            findings,
            actions,
            highest_open_priority: highest,
            remediation_complete: findings.open == 0 && actions.open + actions.in_progress == 0,
        }
    }
}
