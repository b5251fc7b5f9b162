//! # Identity Newtypes
//!
//! Newtype wrappers for all identifiers in the workflow engine. These
//! prevent accidental identifier confusion: you cannot pass a `FindingId`
//! where an `ActionId` is expected.
//!
//! Ownership is structural. A finding or action id is only meaningful
//! inside the workflow that created it; no id is shared across workflows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HsseError;

/// Generates a UUID-backed identifier newtype with a display prefix.
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Parse from a bare UUID string or a prefixed display form.
            pub fn parse(s: &str) -> Result<Self, HsseError> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw).map(Self).map_err(|e| {
                    HsseError::Validation(format!(
                        concat!("invalid ", $prefix, " id {:?}: {}"),
                        s, e
                    ))
                })
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a compliance workflow record (audit, inspection,
    /// work permit, license, security incident).
    WorkflowId,
    "workflow"
);

uuid_identifier!(
    /// Unique identifier for a finding within a workflow.
    FindingId,
    "finding"
);

uuid_identifier!(
    /// Unique identifier for a corrective action within a workflow.
    ActionId,
    "action"
);

uuid_identifier!(
    /// Unique identifier for a work item (checklist entry, hazard, precaution).
    ItemId,
    "item"
);

/// The person or system that performed an operation.
///
/// Supplied by the caller as an opaque string (user id, e-mail, service
/// name). The engine does not authenticate; it only refuses blank actors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl TryFrom<String> for ActorId {
    type Error = HsseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActorId> for String {
    fn from(actor: ActorId) -> Self {
        actor.0
    }
}

impl ActorId {
    /// Create an actor identifier, rejecting blank input.
    pub fn new(id: impl Into<String>) -> Result<Self, HsseError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(HsseError::Validation(
                "actor id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Access the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let id = Uuid::nil();
        assert_eq!(
            WorkflowId::from_uuid(id).to_string(),
            "workflow:00000000-0000-0000-0000-000000000000"
        );
        assert!(FindingId::from_uuid(id).to_string().starts_with("finding:"));
        assert!(ActionId::from_uuid(id).to_string().starts_with("action:"));
        assert!(ItemId::from_uuid(id).to_string().starts_with("item:"));
    }

    #[test]
    fn test_parse_bare_and_prefixed() {
        let id = WorkflowId::new();
        let bare = id.as_uuid().to_string();
        assert_eq!(WorkflowId::parse(&bare).unwrap(), id);
        assert_eq!(WorkflowId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(FindingId::parse("not-a-uuid").is_err());
        assert!(FindingId::parse("").is_err());
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(ActionId::new(), ActionId::new());
    }

    #[test]
    fn test_serde_is_bare_uuid() {
        let id = FindingId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let parsed: FindingId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_actor_rejects_blank() {
        assert!(ActorId::new("").is_err());
        assert!(ActorId::new("   ").is_err());
        assert_eq!(ActorId::new("auditor-7").unwrap().as_str(), "auditor-7");
    }

    #[test]
    fn test_actor_deserialize_validates() {
        let actor: ActorId = serde_json::from_str("\"hse-lead\"").unwrap();
        assert_eq!(actor.as_str(), "hse-lead");
        assert!(serde_json::from_str::<ActorId>("\"  \"").is_err());
    }
}
