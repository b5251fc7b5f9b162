//! # Aggregate Store Boundary
//!
//! Workflows are loaded and saved as whole aggregates. Concurrent writers
//! are serialized by an optimistic version check: a save names the version
//! it was loaded at, and fails with [`StoreError::VersionConflict`] if
//! another writer got there first.
//!
//! [`update`] packages the load / mutate / save cycle so that a rejected
//! operation is never persisted and a no-op (same-date re-schedule) is not
//! written at all.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use hsse_core::WorkflowId;

use crate::error::WorkflowError;
use crate::workflow::Workflow;

/// Errors from a [`WorkflowStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("workflow {0} not found")]
    NotFound(WorkflowId),

    #[error("workflow {0} already exists")]
    AlreadyExists(WorkflowId),

    #[error("workflow {id} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        id: WorkflowId,
        expected: u64,
        actual: u64,
    },

    /// The domain operation itself was refused.
    #[error(transparent)]
    Rejected(#[from] WorkflowError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Whole-aggregate persistence with optimistic concurrency.
pub trait WorkflowStore: Send + Sync {
    /// Persist a newly created workflow.
    fn insert(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Load a workflow by id.
    fn load(&self, id: WorkflowId) -> Result<Workflow, StoreError>;

    /// Replace the stored workflow if it is still at `expected_version`.
    fn save(&self, workflow: &Workflow, expected_version: u64) -> Result<(), StoreError>;

    /// All stored workflows, ordered by creation time.
    fn list(&self) -> Result<Vec<Workflow>, StoreError>;
}

/// Load, mutate and save one workflow.
///
/// When the caller names the version it last saw, a newer stored version
/// is a [`StoreError::VersionConflict`]. The closure's error is returned as
/// [`StoreError::Rejected`] and nothing is written. If the closure left the
/// version unchanged, nothing is written either.
pub fn update<S, T, F>(
    store: &S,
    id: WorkflowId,
    seen_version: Option<u64>,
    f: F,
) -> Result<(Workflow, T), StoreError>
where
    S: WorkflowStore + ?Sized,
    F: FnOnce(&mut Workflow) -> Result<T, WorkflowError>,
{
    let mut workflow = store.load(id)?;
    let expected = workflow.version();
    if let Some(seen) = seen_version {
        if seen != expected {
            return Err(StoreError::VersionConflict {
                id,
                expected: seen,
                actual: expected,
            });
        }
    }
    let out = f(&mut workflow)?;
    if workflow.version() != expected {
        store.save(&workflow, expected)?;
        tracing::debug!(
            workflow = %id,
            from_version = expected,
            to_version = workflow.version(),
            status = %workflow.status(),
            "workflow saved"
        );
    }
    Ok((workflow, out))
}

// ─── In-memory store ─────────────────────────────────────────────────

/// A process-local store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.read().is_empty()
    }
}

impl WorkflowStore for InMemoryStore {
    fn insert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut guard = self.workflows.write();
        if guard.contains_key(&workflow.id()) {
            return Err(StoreError::AlreadyExists(workflow.id()));
        }
        guard.insert(workflow.id(), workflow.clone());
        tracing::info!(workflow = %workflow.id(), kind = %workflow.kind(), "workflow created");
        Ok(())
    }

    fn load(&self, id: WorkflowId) -> Result<Workflow, StoreError> {
        self.workflows
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn save(&self, workflow: &Workflow, expected_version: u64) -> Result<(), StoreError> {
        let mut guard = self.workflows.write();
        let current = guard
            .get(&workflow.id())
            .ok_or(StoreError::NotFound(workflow.id()))?;
        if current.version() != expected_version {
            tracing::warn!(
                workflow = %workflow.id(),
                expected = expected_version,
                actual = current.version(),
                "version conflict"
            );
            return Err(StoreError::VersionConflict {
                id: workflow.id(),
                expected: expected_version,
                actual: current.version(),
            });
        }
        guard.insert(workflow.id(), workflow.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Workflow>, StoreError> {
        let mut all: Vec<Workflow> = self.workflows.read().values().cloned().collect();
        all.sort_by_key(|w| (w.created_at(), w.id()));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use hsse_core::{Clock, FixedClock, Timestamp};

    use crate::lifecycle::{WorkflowKind, WorkflowStatus};
    use crate::workflow::NewWorkflow;

    use super::*;

    fn clock() -> FixedClock {
        FixedClock::at(Timestamp::parse("2025-01-10T08:00:00Z").unwrap())
    }

    fn make_stored(store: &InMemoryStore, clock: &dyn Clock) -> WorkflowId {
        let wf = Workflow::create(
            NewWorkflow {
                id: None,
                kind: WorkflowKind::Audit,
                number: "AUD-9".into(),
                title: "Fire safety".into(),
            },
            clock,
        )
        .unwrap();
        store.insert(&wf).unwrap();
        wf.id()
    }

    #[test]
    fn test_update_persists_success() {
        let c = clock();
        let store = InMemoryStore::new();
        let id = make_stored(&store, &c);
        let (wf, ()) = update(&store, id, None, |wf| wf.schedule(c.now(), &c)).unwrap();
        assert_eq!(wf.status(), WorkflowStatus::Scheduled);
        assert_eq!(store.load(id).unwrap().version(), 2);
    }

    #[test]
    fn test_update_does_not_persist_rejection() {
        let c = clock();
        let store = InMemoryStore::new();
        let id = make_stored(&store, &c);
        let err = update(&store, id, Some(1), |wf| wf.start(&c)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(WorkflowError::InvalidTransition { .. })
        ));
        assert_eq!(store.load(id).unwrap().status(), WorkflowStatus::Draft);
    }

    #[test]
    fn test_update_with_stale_seen_version() {
        let c = clock();
        let store = InMemoryStore::new();
        let id = make_stored(&store, &c);
        update(&store, id, Some(1), |wf| wf.schedule(c.now(), &c)).unwrap();
        let err = update(&store, id, Some(1), |wf| wf.start(&c)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 1, actual: 2, .. }
        ));
        assert_eq!(store.load(id).unwrap().status(), WorkflowStatus::Scheduled);
    }

    #[test]
    fn test_stale_save_conflicts() {
        let c = clock();
        let store = InMemoryStore::new();
        let id = make_stored(&store, &c);

        let mut first = store.load(id).unwrap();
        let mut second = store.load(id).unwrap();
        first.schedule(c.now(), &c).unwrap();
        second.cancel("duplicate record", &c).unwrap();

        store.save(&first, 1).unwrap();
        let err = store.save(&second, 1).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 1, actual: 2, .. }
        ));
        assert_eq!(store.load(id).unwrap().status(), WorkflowStatus::Scheduled);
    }

    #[test]
    fn test_insert_twice_and_missing() {
        let c = clock();
        let store = InMemoryStore::new();
        let id = make_stored(&store, &c);
        let wf = store.load(id).unwrap();
        assert!(matches!(store.insert(&wf), Err(StoreError::AlreadyExists(_))));
        assert!(matches!(
            store.load(WorkflowId::new()),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
