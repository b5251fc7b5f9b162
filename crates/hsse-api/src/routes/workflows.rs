//! # Workflow API
//!
//! Create compliance workflows, drive them with command batches, and read
//! their remediation status.
//!
//! A command batch is applied atomically: either every command succeeds and
//! the new version is stored, or the first rejected command is reported
//! (with its index) and nothing is written. Clients that send the
//! `expected_version` they last read get a 409 if someone else wrote first.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use hsse_core::WorkflowId;
use hsse_state::{
    update, CommandOutcome, CorrectiveAction, NewWorkflow, Workflow, WorkflowCommand,
    WorkflowKind, WorkflowStatus, WorkflowSummary,
};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, instant_or, Validate};
use crate::state::AppState;

/// Upper bound on commands per batch.
const MAX_BATCH: usize = 500;

/// Request to create a workflow.
#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub kind: WorkflowKind,
    pub number: String,
    pub title: String,
}

impl Validate for CreateWorkflowRequest {
    fn validate(&self) -> Result<(), String> {
        if self.number.trim().is_empty() {
            return Err("number must be non-empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("title must be non-empty".to_string());
        }
        if self.number.len() > 64 {
            return Err("number must not exceed 64 characters".to_string());
        }
        Ok(())
    }
}

/// A batch of commands against one workflow.
#[derive(Debug, Deserialize)]
pub struct CommandBatchRequest {
    /// Version the client last read. Omit to apply against whatever is current.
    #[serde(default)]
    pub expected_version: Option<u64>,
    pub commands: Vec<WorkflowCommand>,
}

impl Validate for CommandBatchRequest {
    fn validate(&self) -> Result<(), String> {
        if self.commands.is_empty() {
            return Err("commands must not be empty".to_string());
        }
        if self.commands.len() > MAX_BATCH {
            return Err(format!("at most {MAX_BATCH} commands per batch"));
        }
        Ok(())
    }
}

/// Result of an applied batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandBatchResponse {
    pub workflow_id: WorkflowId,
    pub version: u64,
    pub status: WorkflowStatus,
    pub outcomes: Vec<CommandOutcome>,
}

/// Filters for `GET /v1/workflows`.
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub kind: Option<WorkflowKind>,
    pub status: Option<WorkflowStatus>,
}

/// Compact listing entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowListItem {
    pub id: WorkflowId,
    pub kind: WorkflowKind,
    pub number: String,
    pub title: String,
    pub status: WorkflowStatus,
    pub version: u64,
}

impl From<&Workflow> for WorkflowListItem {
    fn from(wf: &Workflow) -> Self {
        Self {
            id: wf.id(),
            kind: wf.kind(),
            number: wf.number().to_string(),
            title: wf.title().to_string(),
            status: wf.status(),
            version: wf.version(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AtParams {
    /// Date (`YYYY-MM-DD`) or RFC 3339 instant. Defaults to now.
    pub at: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ActionParams {
    #[serde(default)]
    pub overdue: bool,
    pub at: Option<String>,
}

/// Build the workflow router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/workflows", get(list_workflows).post(create_workflow))
        .route("/v1/workflows/{id}", get(get_workflow))
        .route("/v1/workflows/{id}/commands", post(apply_commands))
        .route("/v1/workflows/{id}/summary", get(get_summary))
        .route("/v1/workflows/{id}/actions", get(list_actions))
}

fn parse_id(raw: &str) -> Result<WorkflowId, AppError> {
    WorkflowId::parse(raw).map_err(|e| AppError::NotFound(format!("workflow {raw}: {e}")))
}

/// POST /v1/workflows — Create a workflow in DRAFT.
async fn create_workflow(
    State(state): State<AppState>,
    body: Result<Json<CreateWorkflowRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Workflow>), AppError> {
    let req = extract_validated_json(body)?;
    let workflow = Workflow::create(
        NewWorkflow {
            id: None,
            kind: req.kind,
            number: req.number,
            title: req.title,
        },
        &*state.clock,
    )?;
    state.store.insert(&workflow)?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

/// GET /v1/workflows — List workflows, optionally filtered by kind and status.
async fn list_workflows(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<WorkflowListItem>>, AppError> {
    let items = state
        .store
        .list()?
        .iter()
        .filter(|wf| params.kind.map_or(true, |k| wf.kind() == k))
        .filter(|wf| params.status.map_or(true, |s| wf.status() == s))
        .map(WorkflowListItem::from)
        .collect();
    Ok(Json(items))
}

/// GET /v1/workflows/{id} — Full workflow record.
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Workflow>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.load(id)?))
}

/// POST /v1/workflows/{id}/commands — Apply a command batch atomically.
async fn apply_commands(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CommandBatchRequest>, JsonRejection>,
) -> Result<Json<CommandBatchResponse>, AppError> {
    let id = parse_id(&id)?;
    let req = extract_validated_json(body)?;
    let count = req.commands.len();
    let clock = state.clock.clone();
    let (workflow, outcomes) = update(&*state.store, id, req.expected_version, |wf| {
        wf.apply_all(req.commands, &*clock)
    })?;
    tracing::info!(
        workflow = %id,
        commands = count,
        version = workflow.version(),
        status = %workflow.status(),
        "command batch applied"
    );
    Ok(Json(CommandBatchResponse {
        workflow_id: id,
        version: workflow.version(),
        status: workflow.status(),
        outcomes,
    }))
}

/// GET /v1/workflows/{id}/summary — Remediation summary at `?at=` (default now).
async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<AtParams>,
) -> Result<Json<WorkflowSummary>, AppError> {
    let id = parse_id(&id)?;
    let at = instant_or(params.at.as_deref(), state.clock.now())?;
    Ok(Json(state.store.load(id)?.summary(at)))
}

/// GET /v1/workflows/{id}/actions — Corrective actions, `?overdue=true` to
/// keep only those overdue at `?at=`.
async fn list_actions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActionParams>,
) -> Result<Json<Vec<CorrectiveAction>>, AppError> {
    let id = parse_id(&id)?;
    let at = instant_or(params.at.as_deref(), state.clock.now())?;
    let workflow = state.store.load(id)?;
    let actions = if params.overdue {
        workflow.overdue_actions(at).into_iter().cloned().collect()
    } else {
        workflow.actions().to_vec()
    };
    Ok(Json(actions))
}
