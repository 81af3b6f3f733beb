//! # Utility Functions for Round Snapshots
//!
//! General helpers used throughout the pipeline.
//!
//! ## Submodules
//!
//! - **digest**: SHA-256 digest calculation for inbound snapshot content.

mod digest;

pub use digest::compute_snapshot_digest;
