//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps workflow and store errors to HTTP status codes with a JSON body
//! carrying a machine-readable code and a message. Internal error details
//! are logged, never returned.
//!
//! | Source | Status |
//! |--------|--------|
//! | wrong-state rejections (`InvalidTransition`, `InvalidState`, `PrematureClosure`, ...) | 409 |
//! | `MissingPrecondition`, request validation | 422 |
//! | unknown workflow, finding or action | 404 |
//! | concurrent modification | 409 |
//! | anything else | 500 |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hsse_state::{StoreError, WorkflowError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "INVALID_TRANSITION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for client errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Stale or duplicate write (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The workflow engine refused the operation.
    #[error(transparent)]
    Rejected(WorkflowError),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Rejected(err) => workflow_status(err),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Rejected(WorkflowError::CommandRejected { index, .. }) => {
                Some(serde_json::json!({ "command_index": index }))
            }
            _ => None,
        }
    }
}

fn workflow_status(err: &WorkflowError) -> (StatusCode, &'static str) {
    match err {
        WorkflowError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        WorkflowError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
        WorkflowError::PrematureClosure { .. } => (StatusCode::CONFLICT, "PREMATURE_CLOSURE"),
        WorkflowError::VerificationNotRequired { .. } => {
            (StatusCode::CONFLICT, "VERIFICATION_NOT_REQUIRED")
        }
        WorkflowError::UnsupportedOperation { .. } => {
            (StatusCode::CONFLICT, "UNSUPPORTED_OPERATION")
        }
        WorkflowError::DuplicateRecord(_) => (StatusCode::CONFLICT, "DUPLICATE_RECORD"),
        WorkflowError::MissingPrecondition(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "MISSING_PRECONDITION")
        }
        WorkflowError::FindingNotFound(_) | WorkflowError::ActionNotFound(_) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        }
        WorkflowError::InconsistentState(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
        WorkflowError::CommandRejected { source, .. } => workflow_status(source),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        Self::Rejected(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(format!("workflow {id}")),
            StoreError::AlreadyExists(_) | StoreError::VersionConflict { .. } => {
                Self::Conflict(err.to_string())
            }
            StoreError::Rejected(e) => Self::Rejected(e),
            StoreError::Io(_) | StoreError::Serialization(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<hsse_core::HsseError> for AppError {
    fn from(err: hsse_core::HsseError) -> Self {
        Self::Validation(err.to_string())
    }
}
