//! # Error Types
//!
//! Core-level errors: rejected input values for timestamps, identifiers and
//! classification enums. Workflow transition errors live in `hsse-state`.

use thiserror::Error;

/// Top-level error type for `hsse-core`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HsseError {
    /// A value failed validation at construction or parse time.
    #[error("validation error: {0}")]
    Validation(String),

    /// An unknown identifier was supplied for a closed enumeration.
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// Name of the enumeration (e.g. "severity").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}
