//! # The Snapshot Processing Pipeline
//!
//! This module orchestrates the accept path: decode and parse the pending
//! file, detect already-committed rounds, resolve authorization, persist the
//! round, and hand the file to the lifecycle manager. Failures after a
//! server id has been resolved are recorded for operator review before being
//! re-raised; failures before that point propagate directly and are never
//! attributed to a server.
//!
//! ## Submodules
//!
//! - **processor**: Pure orchestration of one processing attempt.
//! - **recorder**: Failure-record persistence and the best-effort failed move.
//! - **actions**: The operator-facing action surface (list/accept/delete).
//! - **locks**: Per-filename mutual exclusion for concurrent accepts.
//! - **types**: The error taxonomy and outcome values.

mod actions;
mod locks;
mod processor;
mod recorder;
mod types;

pub use actions::{
    accept_pending, delete_failed_record, delete_pending, list_failed_records, list_pending,
};
pub use locks::FileLocks;
pub use processor::process_snapshot;
pub use recorder::{record_failure, truncate_reason, REASON_BUDGET};
pub use types::{Outcome, PipelineError, ProcessOutcome};
