//! Round Snapshots Library
//!
//! This library ingests round-report files produced by remote game servers,
//! validates and authorizes them, commits round and player data to a
//! PostgreSQL stats store, and moves each file through its on-disk lifecycle
//! (pending, processed, failed).
//!

pub mod authorize;
pub mod config;
pub mod decode;
pub mod lifecycle;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod store;
pub mod utils;
