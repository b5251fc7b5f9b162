//! # Workflow Subcommand
//!
//! Compliance workflow management backed by the JSON [`FileStore`].
//!
//! ## Subcommands
//!
//! - `create` — Create an audit, inspection, work permit, license or
//!   security incident in DRAFT.
//! - `apply` — Apply a YAML or JSON command batch atomically.
//! - `status` — Show lifecycle state, findings and corrective actions.
//! - `summary` — Remediation summary at an instant (default now).
//! - `list` — List known workflows, optionally filtered.
//!
//! ## Command files
//!
//! Either a bare list of commands or a mapping with `commands` and an
//! optional `expected_version`:
//!
//! ```yaml
//! expected_version: 1
//! commands:
//!   - op: schedule
//!     at: 2025-01-11
//!   - op: start
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Deserialize;

use hsse_core::{Clock, Timestamp, WorkflowId};
use hsse_state::{
    update, CommandOutcome, NewWorkflow, Workflow, WorkflowCommand, WorkflowKind, WorkflowStatus,
    WorkflowStore,
};

use crate::store::FileStore;

/// Arguments for the `hsse workflow` subcommand.
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowSubcommand,
}

/// Workflow subcommands.
#[derive(Subcommand, Debug)]
pub enum WorkflowSubcommand {
    /// Create a new workflow in DRAFT.
    Create {
        /// audit, inspection, work_permit, license or security_incident.
        #[arg(long)]
        kind: WorkflowKind,
        /// Human-readable reference (e.g. "AUD-2025-014").
        #[arg(long)]
        number: String,
        #[arg(long)]
        title: String,
    },

    /// Apply a batch of commands from a YAML or JSON file.
    Apply {
        /// Workflow identifier.
        #[arg(long)]
        id: String,
        /// Path to the command file.
        #[arg(long)]
        file: PathBuf,
        /// Refuse to apply unless the stored version matches.
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Show current workflow state.
    Status {
        /// Workflow identifier.
        #[arg(long)]
        id: String,
    },

    /// Remediation summary.
    Summary {
        /// Workflow identifier.
        #[arg(long)]
        id: String,
        /// Evaluate at this date or RFC 3339 instant instead of now.
        #[arg(long)]
        at: Option<String>,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List all known workflows.
    List {
        #[arg(long)]
        kind: Option<WorkflowKind>,
        #[arg(long)]
        status: Option<WorkflowStatus>,
    },
}

/// Contents of a command file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandFile {
    Batch {
        #[serde(default)]
        expected_version: Option<u64>,
        commands: Vec<WorkflowCommand>,
    },
    Bare(Vec<WorkflowCommand>),
}

/// Execute the workflow subcommand.
pub fn run_workflow(args: &WorkflowArgs, state_dir: &Path, clock: &dyn Clock) -> Result<u8> {
    let store = FileStore::new(state_dir);

    match &args.command {
        WorkflowSubcommand::Create {
            kind,
            number,
            title,
        } => cmd_create(&store, *kind, number, title, clock).map(|_| 0),

        WorkflowSubcommand::Apply {
            id,
            file,
            expected_version,
        } => cmd_apply(&store, id, file, *expected_version, clock),

        WorkflowSubcommand::Status { id } => cmd_status(&store, id),

        WorkflowSubcommand::Summary { id, at, json } => {
            cmd_summary(&store, id, at.as_deref(), *json, clock)
        }

        WorkflowSubcommand::List { kind, status } => cmd_list(&store, *kind, *status),
    }
}

fn parse_id(id: &str) -> Result<WorkflowId> {
    WorkflowId::parse(id.trim()).with_context(|| format!("invalid workflow ID: {id:?}"))
}

fn load(store: &FileStore, id: &str) -> Result<Workflow> {
    let id = parse_id(id)?;
    store
        .load(id)
        .with_context(|| format!("failed to load workflow {id}"))
}

/// Create a workflow and return its id.
fn cmd_create(
    store: &FileStore,
    kind: WorkflowKind,
    number: &str,
    title: &str,
    clock: &dyn Clock,
) -> Result<WorkflowId> {
    let workflow = Workflow::create(
        NewWorkflow {
            id: None,
            kind,
            number: number.to_string(),
            title: title.to_string(),
        },
        clock,
    )
    .context("invalid workflow")?;
    store
        .insert(&workflow)
        .context("failed to write workflow state")?;

    println!(
        "OK: created {kind} {} ({number}) in {} state",
        workflow.id().as_uuid(),
        workflow.status()
    );
    Ok(workflow.id())
}

fn read_command_file(path: &Path) -> Result<CommandFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read command file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse command file: {}", path.display()))
}

/// Apply a command file atomically.
fn cmd_apply(
    store: &FileStore,
    id: &str,
    file: &Path,
    expected_version: Option<u64>,
    clock: &dyn Clock,
) -> Result<u8> {
    let id = parse_id(id)?;
    let (file_version, commands) = match read_command_file(file)? {
        CommandFile::Batch {
            expected_version,
            commands,
        } => (expected_version, commands),
        CommandFile::Bare(commands) => (None, commands),
    };
    if commands.is_empty() {
        bail!("command file {} contains no commands", file.display());
    }
    let seen = expected_version.or(file_version);
    let count = commands.len();

    let (workflow, outcomes) = update(store, id, seen, |wf| wf.apply_all(commands, clock))
        .with_context(|| format!("commands rejected for workflow {id}"))?;

    tracing::info!(workflow = %id, commands = count, version = workflow.version(), "command batch applied");
    println!(
        "OK: applied {count} command(s); {} is {} at version {}",
        id.as_uuid(),
        workflow.status(),
        workflow.version()
    );
    for outcome in outcomes {
        match outcome {
            CommandOutcome::Applied => {}
            CommandOutcome::ItemAdded(item) => println!("  added item {}", item.as_uuid()),
            CommandOutcome::FindingAdded(f) => println!("  added finding {}", f.as_uuid()),
            CommandOutcome::ActionAdded(a) => println!("  added corrective action {}", a.as_uuid()),
        }
    }
    Ok(0)
}

/// Show workflow status.
fn cmd_status(store: &FileStore, id: &str) -> Result<u8> {
    let wf = load(store, id)?;

    println!("Workflow: {}", wf.id().as_uuid());
    println!("  Kind: {}", wf.kind());
    println!("  Number: {}", wf.number());
    println!("  Title: {}", wf.title());
    println!("  Status: {}", wf.status());
    println!("  Version: {}", wf.version());
    if let Some(at) = wf.scheduled_at() {
        println!("  Scheduled: {at}");
    }
    if let Some(at) = wf.actual_start_at() {
        println!("  Started: {at}");
    }
    if let Some(at) = wf.actual_end_at() {
        println!("  Ended: {at}");
    }
    println!("  Transitions: {}", wf.transitions().len());
    for (i, t) in wf.transitions().iter().enumerate() {
        println!("    [{i}] {} → {} at {}", t.from, t.to, t.at);
    }
    println!("  Findings: {}", wf.findings().len());
    for f in wf.findings() {
        println!(
            "    {} [{} / {}] {}{}",
            f.id().as_uuid(),
            f.severity(),
            f.status(),
            f.description(),
            if f.awaiting_verification() { " (awaiting verification)" } else { "" }
        );
    }
    println!("  Corrective actions: {}", wf.actions().len());
    for a in wf.actions() {
        println!(
            "    {} [{} / {}] due {} — {}",
            a.id().as_uuid(),
            a.priority(),
            a.status(),
            a.due_date(),
            a.description()
        );
    }

    Ok(0)
}

/// Print the remediation summary.
fn cmd_summary(
    store: &FileStore,
    id: &str,
    at: Option<&str>,
    json: bool,
    clock: &dyn Clock,
) -> Result<u8> {
    let wf = load(store, id)?;
    let at = match at {
        Some(raw) => Timestamp::parse_date_or_time(raw).context("invalid --at")?,
        None => clock.now(),
    };
    let summary = wf.summary(at);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(0);
    }

    println!("Summary for {} as of {}", wf.id().as_uuid(), summary.as_of);
    println!("  Status: {}", summary.status);
    println!(
        "  Findings: {} total, {} open, {} awaiting verification, {} closed, {} not applicable",
        summary.findings.total,
        summary.findings.open,
        summary.findings.awaiting_verification,
        summary.findings.closed,
        summary.findings.not_applicable
    );
    println!(
        "  Actions: {} total, {} open, {} in progress, {} completed, {} cancelled, {} overdue",
        summary.actions.total,
        summary.actions.open,
        summary.actions.in_progress,
        summary.actions.completed,
        summary.actions.cancelled,
        summary.actions.overdue
    );
    match summary.highest_open_priority {
        Some(p) => println!("  Highest open priority: {p}"),
        None => println!("  Highest open priority: none"),
    }
    println!(
        "  Remediation complete: {}",
        if summary.remediation_complete { "yes" } else { "no" }
    );
    Ok(0)
}

/// List workflows in the state directory.
fn cmd_list(
    store: &FileStore,
    kind: Option<WorkflowKind>,
    status: Option<WorkflowStatus>,
) -> Result<u8> {
    if !store.dir().is_dir() {
        println!("No workflows found (state directory does not exist).");
        return Ok(0);
    }

    let entries: Vec<Workflow> = store
        .list()
        .context("failed to list workflows")?
        .into_iter()
        .filter(|wf| kind.map_or(true, |k| wf.kind() == k))
        .filter(|wf| status.map_or(true, |s| wf.status() == s))
        .collect();

    if entries.is_empty() {
        println!("No workflows found.");
    } else {
        println!("Workflows ({}):", entries.len());
        for wf in &entries {
            println!(
                "  {} {} {}: {} (v{})",
                wf.id().as_uuid(),
                wf.kind(),
                wf.number(),
                wf.status(),
                wf.version()
            );
        }
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use hsse_core::FixedClock;
    use hsse_state::FindingStatus;

    use super::*;

    fn clock() -> FixedClock {
        FixedClock::at(Timestamp::parse("2025-01-10T08:00:00Z").unwrap())
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_workflow_create_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("workflows"));
        let c = clock();

        let id = cmd_create(&store, WorkflowKind::Audit, "AUD-1", "Fire safety", &c).unwrap();
        assert_eq!(cmd_status(&store, &id.as_uuid().to_string()).unwrap(), 0);
        assert_eq!(store.load(id).unwrap().status(), WorkflowStatus::Draft);
    }

    #[test]
    fn test_workflow_create_with_blank_title_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(cmd_create(&store, WorkflowKind::Audit, "AUD-1", "  ", &clock()).is_err());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_workflow_apply_yaml_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("workflows"));
        let c = clock();
        let id = cmd_create(&store, WorkflowKind::Audit, "AUD-2", "Tank farm", &c).unwrap();

        let file = write_file(
            dir.path(),
            "batch.yaml",
            r#"
expected_version: 1
commands:
  - op: schedule
    at: 2025-01-11
  - op: start
  - op: add_finding
    id: 3d0c5a8e-1b2f-4c6d-9e7f-0a1b2c3d4e5f
    description: missing guard rail
    finding_type: non_conformance
    severity: moderate
  - op: resolve_finding
    finding_id: 3d0c5a8e-1b2f-4c6d-9e7f-0a1b2c3d4e5f
  - op: close_finding
    finding_id: 3d0c5a8e-1b2f-4c6d-9e7f-0a1b2c3d4e5f
    closed_by: site-lead
"#,
        );
        let code = cmd_apply(&store, &id.to_string(), &file, None, &c).unwrap();
        assert_eq!(code, 0);

        let wf = store.load(id).unwrap();
        assert_eq!(wf.status(), WorkflowStatus::InProgress);
        assert_eq!(wf.findings()[0].status(), FindingStatus::Closed);
        assert_eq!(
            wf.scheduled_at().unwrap(),
            Timestamp::parse("2025-01-11T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_workflow_apply_bare_json_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("workflows"));
        let c = clock();
        let id = cmd_create(&store, WorkflowKind::License, "LIC-1", "Radiography", &c).unwrap();

        let file = write_file(
            dir.path(),
            "cmds.json",
            r#"[
                { "op": "submit" },
                { "op": "approve", "approved_by": "regulator", "expires_at": "2026-01-10T00:00:00Z" },
                { "op": "activate" }
            ]"#,
        );
        cmd_apply(&store, &id.as_uuid().to_string(), &file, Some(1), &c).unwrap();
        assert_eq!(store.load(id).unwrap().status(), WorkflowStatus::Active);
    }

    #[test]
    fn test_workflow_apply_rejected_batch_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("workflows"));
        let c = clock();
        let id = cmd_create(&store, WorkflowKind::Inspection, "INS-1", "Scaffold", &c).unwrap();

        let file = write_file(
            dir.path(),
            "bad.yaml",
            "- op: schedule\n  at: 2025-01-12\n- op: complete\n  summary: done\n",
        );
        let err = cmd_apply(&store, &id.to_string(), &file, None, &c).unwrap_err();
        assert!(format!("{err:#}").contains("command 1"), "{err:#}");

        let wf = store.load(id).unwrap();
        assert_eq!(wf.status(), WorkflowStatus::Draft);
        assert_eq!(wf.version(), 1);
    }

    #[test]
    fn test_workflow_apply_with_stale_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("workflows"));
        let c = clock();
        let id = cmd_create(&store, WorkflowKind::Audit, "AUD-3", "Stores", &c).unwrap();

        let file = write_file(dir.path(), "s.yaml", "- op: schedule\n  at: 2025-02-01\n");
        cmd_apply(&store, &id.to_string(), &file, Some(1), &c).unwrap();

        let file = write_file(dir.path(), "c.yaml", "- op: cancel\n  reason: duplicate\n");
        assert!(cmd_apply(&store, &id.to_string(), &file, Some(1), &c).is_err());
        assert_eq!(store.load(id).unwrap().status(), WorkflowStatus::Scheduled);
    }

    #[test]
    fn test_workflow_apply_empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("workflows"));
        let c = clock();
        let id = cmd_create(&store, WorkflowKind::Audit, "AUD-4", "Lab", &c).unwrap();
        let file = write_file(dir.path(), "empty.yaml", "commands: []\n");
        assert!(cmd_apply(&store, &id.to_string(), &file, None, &c).is_err());
    }

    #[test]
    fn test_workflow_summary_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("workflows"));
        let c = clock();
        let id = cmd_create(&store, WorkflowKind::SecurityIncident, "SI-1", "Tailgating", &c).unwrap();
        cmd_create(&store, WorkflowKind::Audit, "AUD-5", "Security", &c).unwrap();

        let id_str = id.to_string();
        assert_eq!(cmd_summary(&store, &id_str, None, false, &c).unwrap(), 0);
        assert_eq!(cmd_summary(&store, &id_str, Some("2025-06-01"), true, &c).unwrap(), 0);
        assert!(cmd_summary(&store, &id_str, Some("someday"), false, &c).is_err());

        assert_eq!(cmd_list(&store, None, None).unwrap(), 0);
        assert_eq!(
            cmd_list(&store, Some(WorkflowKind::License), Some(WorkflowStatus::Draft)).unwrap(),
            0
        );
    }

    #[test]
    fn test_workflow_list_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent"));
        assert_eq!(cmd_list(&store, None, None).unwrap(), 0);
    }

    #[test]
    fn test_workflow_status_unknown_or_malformed_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(cmd_status(&store, "../../etc/passwd").is_err());
        assert!(cmd_status(&store, &WorkflowId::new().to_string()).is_err());
    }

    #[test]
    fn test_run_workflow_create_subcommand() {
        let dir = tempfile::tempdir().unwrap();
        let args = WorkflowArgs {
            command: WorkflowSubcommand::Create {
                kind: WorkflowKind::WorkPermit,
                number: "WP-9".into(),
                title: "Confined space entry".into(),
            },
        };
        assert_eq!(run_workflow(&args, dir.path(), &clock()).unwrap(), 0);
        let store = FileStore::new(dir.path());
        assert_eq!(store.list().unwrap()[0].kind(), WorkflowKind::WorkPermit);
    }
}
