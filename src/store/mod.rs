//! # Persistence Boundary for Round and Failure Data
//!
//! This module defines the [`StatsStore`] trait — the only operations the
//! pipeline needs from the stats database — together with the record types
//! that cross the boundary. Round and player writes are transactional per
//! round: a partially written round must never become visible to the
//! idempotency check.
//!
//! ## Submodules
//!
//! - **postgres**: The PostgreSQL backend used in production.
//! - **memory**: An in-memory backend for tests and dry runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::report::Snapshot;
use anyhow::Result as AnyhowResult;

/// A known reporting server, identified by its authId/ip/port triple.
#[derive(Debug, Clone)]
pub struct ServerRecord {
    /// Primary key in the stats store.
    pub id: i32,
    /// Credential/identity string the server reports with.
    pub auth_id: String,
    /// IP address of the server.
    pub ip: String,
    /// Game port of the server.
    pub port: u16,
    /// Whether the server may submit rounds automatically.
    pub authorized: bool,
}

/// A persisted processing failure, attributable to a known server.
///
/// Created only by the failure recorder and deleted only by an explicit
/// operator action together with the corresponding file in the failed
/// directory.
#[derive(Debug, Clone)]
pub struct FailedSnapshotRecord {
    /// Primary key in the failure table.
    pub id: i32,
    /// Resolved server id, absent when authorization never resolved one.
    pub server_id: Option<i32>,
    /// Epoch seconds at which the failure occurred (not the round end).
    pub failed_at: i64,
    /// Base filename of the failed snapshot, without extension.
    pub filename: String,
    /// Failure reason, truncated to the recorder's budget.
    pub reason: String,
}

/// The read/write operations the pipeline needs from the stats store.
///
/// Implementations must make `write_round` transactional per round and
/// idempotent-safe, so `find_existing_round` only ever observes fully
/// committed rounds.
#[allow(async_fn_in_trait)]
pub trait StatsStore {
    /// Looks up a server by its identity triple.
    async fn find_server(
        &self,
        auth_id: &str,
        ip: &str,
        port: u16,
    ) -> AnyhowResult<Option<ServerRecord>>;

    /// Creates a server record and returns its id. Safe to call for an
    /// already-known triple; the existing id is returned unchanged.
    async fn create_server(
        &self,
        auth_id: &str,
        ip: &str,
        port: u16,
        authorized: bool,
    ) -> AnyhowResult<i32>;

    /// Whether a round with this content-derived key is already committed.
    async fn find_existing_round(
        &self,
        server_id: i32,
        map_name: &str,
        map_end: i64,
    ) -> AnyhowResult<bool>;

    /// Commits the round and its player rows in one transaction.
    async fn write_round(&self, snapshot: &Snapshot) -> AnyhowResult<()>;

    /// Inserts a failure record and returns its id.
    async fn insert_failure(
        &self,
        server_id: Option<i32>,
        failed_at: i64,
        filename: &str,
        reason: &str,
    ) -> AnyhowResult<i32>;

    /// Lists failure records, newest first.
    async fn list_failures(&self) -> AnyhowResult<Vec<FailedSnapshotRecord>>;

    /// Deletes a failure record; returns whether a row was removed.
    async fn delete_failure(&self, id: i32) -> AnyhowResult<bool>;
}
