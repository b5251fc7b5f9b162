//! # hsse CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hsse_cli::resolve_state_dir;
use hsse_cli::workflow::{run_workflow, WorkflowArgs};
use hsse_core::SystemClock;

/// HSSE compliance workflow CLI.
///
/// Creates and drives audits, inspections, work permits, licenses and
/// security incidents, tracking findings and corrective actions to closure.
#[derive(Parser, Debug)]
#[command(name = "hsse", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding workflow state files (default: $HSSE_STATE_DIR or ./.hsse/workflows).
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compliance workflow lifecycle, findings and corrective actions.
    Workflow(WorkflowArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let state_dir = resolve_state_dir(cli.state_dir, std::env::var("HSSE_STATE_DIR").ok());
    tracing::debug!(state_dir = %state_dir.display(), "resolved state directory");

    let result = match cli.command {
        Commands::Workflow(args) => run_workflow(&args, &state_dir, &SystemClock),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsse_cli::workflow::WorkflowSubcommand;
    use hsse_state::{WorkflowKind, WorkflowStatus};

    #[test]
    fn test_cli_parse_create() {
        let cli = Cli::try_parse_from([
            "hsse",
            "workflow",
            "create",
            "--kind",
            "work_permit",
            "--number",
            "WP-1",
            "--title",
            "Hot work",
        ])
        .unwrap();
        let Commands::Workflow(args) = cli.command;
        match args.command {
            WorkflowSubcommand::Create { kind, number, .. } => {
                assert_eq!(kind, WorkflowKind::WorkPermit);
                assert_eq!(number, "WP-1");
            }
            other => panic!("unexpected subcommand: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_unknown_kind_rejected() {
        let parsed = Cli::try_parse_from([
            "hsse", "workflow", "create", "--kind", "survey", "--number", "S-1", "--title", "x",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hsse",
            "workflow",
            "list",
            "--status",
            "in_progress",
            "--state-dir",
            "/tmp/hsse",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/hsse")));
        let Commands::Workflow(args) = cli.command;
        match args.command {
            WorkflowSubcommand::List { status, kind } => {
                assert_eq!(status, Some(WorkflowStatus::InProgress));
                assert!(kind.is_none());
            }
            other => panic!("unexpected subcommand: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_apply_with_expected_version() {
        let cli = Cli::try_parse_from([
            "hsse",
            "workflow",
            "apply",
            "--id",
            "workflow:3d0c5a8e-1b2f-4c6d-9e7f-0a1b2c3d4e5f",
            "--file",
            "batch.yaml",
            "--expected-version",
            "4",
        ])
        .unwrap();
        let Commands::Workflow(args) = cli.command;
        match args.command {
            WorkflowSubcommand::Apply {
                file,
                expected_version,
                ..
            } => {
                assert_eq!(file, PathBuf::from("batch.yaml"));
                assert_eq!(expected_version, Some(4));
            }
            other => panic!("unexpected subcommand: {other:?}"),
        }
    }
}
