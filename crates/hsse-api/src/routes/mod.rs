//! # API Route Modules
//!
//! - `workflows` — workflow creation, command batches, summaries and
//!   corrective action queries.

pub mod workflows;
