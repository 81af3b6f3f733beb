//! # Scanning the Pending Directory for Operator Listings
//!
//! This module produces a lightweight, read-only listing of the pending
//! directory: each JSON file is decoded independently and reduced to its
//! display fields (identity, map, ip/port, player count, formatted end
//! time). A corrupt pending file is logged and skipped — one bad file never
//! blanks the listing. Nothing here mutates files or database state.
//!
//! ## Submodules
//!
//! - **summary**: The directory scan and row extraction.

mod summary;

pub use summary::{scan_pending, SummaryRow};
