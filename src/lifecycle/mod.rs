//! # On-Disk Snapshot Lifecycle
//!
//! This module owns the three durable snapshot states — pending, processed,
//! failed — and performs the state-transition moves between them. It is the
//! sole writer path for these directories: no other component renames or
//! deletes files in them. Moves are plain renames, atomic within a
//! filesystem, so a file is never visible in two directories and a failed
//! move leaves the source in place.
//!
//! ## Submodules
//!
//! - **manager**: The `LifecycleManager` transition implementation.

mod manager;

pub use manager::LifecycleManager;
