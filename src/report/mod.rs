//! # Parsing Decoded Round Reports into Snapshots
//!
//! This module turns a decoded JSON mapping into a structured [`Snapshot`]
//! value: the reporting server's identity fields, map metadata, the ordered
//! player list, and the content-derived canonical filename used when the file
//! is archived after processing. Missing or ill-typed required fields fail
//! with a descriptive "incomplete snapshot data" condition; callers never see
//! a raw key-lookup fault.
//!
//! ## Submodules
//!
//! - **parser**: Field extraction and coercion logic.
//! - **types**: The `Snapshot` and `PlayerRecord` data structures.

mod parser;
mod types;

pub use parser::{parse_snapshot, IncompleteData};
pub use types::{PlayerRecord, Snapshot};
