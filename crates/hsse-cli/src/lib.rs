//! # hsse-cli — Compliance Workflow Command-Line Interface
//!
//! Clap-based CLI over the workflow engine, persisting each workflow as a
//! JSON file in a local state directory.
//!
//! ## Subcommands
//!
//! - `workflow create | apply | status | summary | list`
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to `hsse-state`; no lifecycle rules here.

use std::path::PathBuf;

pub mod store;
pub mod workflow;

/// Default state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".hsse/workflows";

/// Resolve the state directory: explicit flag, then `HSSE_STATE_DIR`, then
/// [`DEFAULT_STATE_DIR`].
pub fn resolve_state_dir(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    flag.or_else(|| env.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_env() {
        let dir = resolve_state_dir(Some("/tmp/a".into()), Some("/tmp/b".into()));
        assert_eq!(dir, PathBuf::from("/tmp/a"));
    }

    #[test]
    fn test_env_used_when_no_flag() {
        assert_eq!(
            resolve_state_dir(None, Some("/srv/hsse".into())),
            PathBuf::from("/srv/hsse")
        );
    }

    #[test]
    fn test_default_when_nothing_set() {
        assert_eq!(resolve_state_dir(None, None), PathBuf::from(DEFAULT_STATE_DIR));
        assert_eq!(
            resolve_state_dir(None, Some("  ".into())),
            PathBuf::from(DEFAULT_STATE_DIR)
        );
    }
}
