//! Work items: checklist entries, hazards, precautions and permit
//! conditions attached to a workflow.

use serde::{Deserialize, Serialize};

use hsse_core::{ItemId, Severity, Timestamp};

use crate::error::{require_text, WorkflowError};

/// What a work item records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    ChecklistItem,
    Hazard,
    Precaution,
    Condition,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChecklistItem => "checklist_item",
            Self::Hazard => "hazard",
            Self::Precaution => "precaution",
            Self::Condition => "condition",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for adding a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub kind: ItemKind,
    pub description: String,
    /// Assessed risk, for hazards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<Severity>,
}

/// A work item owned by a workflow. Items have no lifecycle of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<Severity>,
    pub added_at: Timestamp,
}

impl WorkItem {
    pub(crate) fn create(new: NewWorkItem, now: Timestamp) -> Result<Self, WorkflowError> {
        require_text(&new.description, "item description")?;
        Ok(Self {
            id: new.id.unwrap_or_default(),
            kind: new.kind,
            description: new.description,
            risk: new.risk,
            added_at: now,
        })
    }
}
