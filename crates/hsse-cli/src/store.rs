//! # File Store
//!
//! One pretty-printed JSON file per workflow, named `<uuid>.json`, in a
//! local state directory. Writes go to a temporary sibling file which is
//! then renamed over the target, so a crash never leaves half a record.
//!
//! Writers for the same workflow are serialized by a `.<uuid>.lock` file
//! created with `create_new`, held across the version check and the
//! rename. Two processes saving at the same expected version therefore see
//! one success and one [`StoreError::VersionConflict`]. A lock left behind
//! by a crashed process blocks writers until it is removed by hand.
//!
//! Every load goes through workflow reconstitution: a hand-edited file that
//! breaks a lifecycle rule is reported, not silently accepted.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use hsse_core::WorkflowId;
use hsse_state::{StoreError, Workflow, WorkflowStore};

/// How long a writer waits for another writer's lock by default.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const LOCK_RETRY: Duration = Duration::from_millis(10);

/// JSON-file-per-workflow store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override how long writers wait for a held lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: WorkflowId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_uuid()))
    }

    fn lock_path_for(&self, id: WorkflowId) -> PathBuf {
        self.dir.join(format!(".{}.lock", id.as_uuid()))
    }

    fn read(&self, path: &Path) -> Result<Workflow, StoreError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Callers must hold the workflow's [`WriteLock`].
    fn write(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(workflow)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let target = self.path_for(workflow.id());
        let tmp = self
            .dir
            .join(format!(".{}.json.tmp", workflow.id().as_uuid()));
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn lock(&self, id: WorkflowId) -> Result<WriteLock, StoreError> {
        WriteLock::acquire(self.lock_path_for(id), self.lock_timeout)
    }
}

/// Exclusive write lock on one workflow file, released on drop.
#[derive(Debug)]
struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    fn acquire(path: PathBuf, timeout: Duration) -> Result<Self, StoreError> {
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        tracing::warn!(lock = %path.display(), "timed out waiting for workflow lock");
                        return Err(StoreError::Io(io::Error::new(
                            io::ErrorKind::WouldBlock,
                            format!(
                                "{} is held by another writer; remove it if no other hsse process is running",
                                path.display()
                            ),
                        )));
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release workflow lock");
        }
    }
}

impl WorkflowStore for FileStore {
    fn insert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let _lock = self.lock(workflow.id())?;
        if self.path_for(workflow.id()).exists() {
            return Err(StoreError::AlreadyExists(workflow.id()));
        }
        self.write(workflow)?;
        tracing::info!(
            workflow = %workflow.id(),
            kind = %workflow.kind(),
            dir = %self.dir.display(),
            "workflow created"
        );
        Ok(())
    }

    fn load(&self, id: WorkflowId) -> Result<Workflow, StoreError> {
        let path = self.path_for(id);
        match self.read(&path) {
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id))
            }
            other => other,
        }
    }

    fn save(&self, workflow: &Workflow, expected_version: u64) -> Result<(), StoreError> {
        if !self.path_for(workflow.id()).exists() {
            return Err(StoreError::NotFound(workflow.id()));
        }
        let _lock = self.lock(workflow.id())?;
        let current = self.load(workflow.id())?;
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
        self.write(workflow)
    }

    fn list(&self) -> Result<Vec<Workflow>, StoreError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut all = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(
                        dir = %self.dir.display(),
                        error = %e,
                        "failed to read directory entry while listing workflows"
                    );
                    continue;
                }
            };
            let path = entry.path();
            let is_record = path.extension().and_then(|e| e.to_str()) == Some("json")
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if !is_record {
                continue;
            }
            match self.read(&path) {
                Ok(wf) => all.push(wf),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable workflow file");
                }
            }
        }
        all.sort_by_key(|w| (w.created_at(), w.id()));
        Ok(all)
    }
}
