//! # hsse-core — Foundational Types for the HSSE Workflow Engine
//!
//! Leaf crate of the workspace. Defines the primitives every compliance
//! workflow shares: identifier newtypes, UTC-only timestamps, the injected
//! clock, and the single severity → priority mapping.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `WorkflowId`, `FindingId`,
//!    `ActionId`, `ItemId` and `ActorId` are distinct types. A finding id
//!    cannot be passed where an action id is expected.
//!
//! 2. **One severity mapper.** [`severity::escalate`] is the only place that
//!    turns a finding's severity into a priority and a verification flag.
//!    Audits, inspections, permits, licenses and incidents all call it.
//!
//! 3. **Time is injected.** Nothing in the engine reads the system clock
//!    directly; callers pass a [`Clock`]. Tests use [`FixedClock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `hsse-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod severity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use error::HsseError;
pub use identity::{ActionId, ActorId, FindingId, ItemId, WorkflowId};
pub use severity::{escalate, Escalation, FindingType, Priority, Severity};
pub use temporal::{Clock, FixedClock, SystemClock, Timestamp};
