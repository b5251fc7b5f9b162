//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! JSON bodies and query-string instants in handlers.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use hsse_core::Timestamp;

use crate::error::AppError;

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Resolve an optional `at` query parameter (date or RFC 3339 instant),
/// falling back to `now`.
pub fn instant_or(at: Option<&str>, now: Timestamp) -> Result<Timestamp, AppError> {
    match at {
        Some(raw) => Ok(Timestamp::parse_date_or_time(raw)?),
        None => Ok(now),
    }
}
