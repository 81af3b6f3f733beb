use super::{FailedSnapshotRecord, ServerRecord, StatsStore};
use crate::report::Snapshot;
use anyhow::{anyhow, Result as AnyhowResult};
use std::sync::{Mutex, PoisonError};

/// A committed round as the in-memory store keeps it.
#[derive(Debug, Clone)]
struct RoundRow {
    server_id: i32,
    map_name: String,
    map_end: i64,
    player_count: usize,
    digest: String,
}

#[derive(Debug, Default)]
struct Inner {
    servers: Vec<ServerRecord>,
    rounds: Vec<RoundRow>,
    failures: Vec<FailedSnapshotRecord>,
    next_server_id: i32,
    next_failure_id: i32,
    fail_round_writes: bool,
}

/// In-memory stats store.
///
/// Backs the pipeline in tests and dry runs. Writes are committed-or-not
/// under a single lock, matching the visibility guarantee the pipeline
/// expects from the PostgreSQL backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a server directly, returning its id. Test and dry-run setup
    /// helper; production registration goes through the authorization
    /// resolver.
    pub fn add_server(&self, auth_id: &str, ip: &str, port: u16, authorized: bool) -> i32 {
        let mut inner = self.lock();
        inner.next_server_id += 1;
        let id = inner.next_server_id;
        inner.servers.push(ServerRecord {
            id,
            auth_id: auth_id.to_string(),
            ip: ip.to_string(),
            port,
            authorized,
        });
        id
    }

    /// Number of committed rounds.
    pub fn round_count(&self) -> usize {
        self.lock().rounds.len()
    }

    /// Number of known servers.
    pub fn server_count(&self) -> usize {
        self.lock().servers.len()
    }

    /// Player count and content digest of a committed round, if present.
    pub fn round_details(
        &self,
        server_id: i32,
        map_name: &str,
        map_end: i64,
    ) -> Option<(usize, String)> {
        let inner = self.lock();
        inner
            .rounds
            .iter()
            .find(|r| r.server_id == server_id && r.map_name == map_name && r.map_end == map_end)
            .map(|r| (r.player_count, r.digest.clone()))
    }

    /// Makes subsequent `write_round` calls fail, for exercising the failure
    /// recording path.
    pub fn fail_round_writes(&self, fail: bool) {
        self.lock().fail_round_writes = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatsStore for MemoryStore {
    async fn find_server(
        &self,
        auth_id: &str,
        ip: &str,
        port: u16,
    ) -> AnyhowResult<Option<ServerRecord>> {
        let inner = self.lock();
        Ok(inner
            .servers
            .iter()
            .find(|s| s.auth_id == auth_id && s.ip == ip && s.port == port)
            .cloned())
    }

    async fn create_server(
        &self,
        auth_id: &str,
        ip: &str,
        port: u16,
        authorized: bool,
    ) -> AnyhowResult<i32> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .servers
            .iter()
            .find(|s| s.auth_id == auth_id && s.ip == ip && s.port == port)
        {
            return Ok(existing.id);
        }
        inner.next_server_id += 1;
        let id = inner.next_server_id;
        inner.servers.push(ServerRecord {
            id,
            auth_id: auth_id.to_string(),
            ip: ip.to_string(),
            port,
            authorized,
        });
        Ok(id)
    }

    async fn find_existing_round(
        &self,
        server_id: i32,
        map_name: &str,
        map_end: i64,
    ) -> AnyhowResult<bool> {
        let inner = self.lock();
        Ok(inner
            .rounds
            .iter()
            .any(|r| r.server_id == server_id && r.map_name == map_name && r.map_end == map_end))
    }

    async fn write_round(&self, snapshot: &Snapshot) -> AnyhowResult<()> {
        let mut inner = self.lock();
        if inner.fail_round_writes {
            return Err(anyhow!("round write rejected by test configuration"));
        }
        let duplicate = inner.rounds.iter().any(|r| {
            r.server_id == snapshot.server_id
                && r.map_name == snapshot.map_name
                && r.map_end == snapshot.map_end
        });
        if !duplicate {
            inner.rounds.push(RoundRow {
                server_id: snapshot.server_id,
                map_name: snapshot.map_name.clone(),
                map_end: snapshot.map_end,
                player_count: snapshot.players.len(),
                digest: snapshot.digest.clone(),
            });
        }
        Ok(())
    }

    async fn insert_failure(
        &self,
        server_id: Option<i32>,
        failed_at: i64,
        filename: &str,
        reason: &str,
    ) -> AnyhowResult<i32> {
        let mut inner = self.lock();
        inner.next_failure_id += 1;
        let id = inner.next_failure_id;
        inner.failures.push(FailedSnapshotRecord {
            id,
            server_id,
            failed_at,
            filename: filename.to_string(),
            reason: reason.to_string(),
        });
        Ok(id)
    }

    async fn list_failures(&self) -> AnyhowResult<Vec<FailedSnapshotRecord>> {
        let inner = self.lock();
        let mut failures = inner.failures.clone();
        failures.sort_by(|a, b| b.failed_at.cmp(&a.failed_at).then(b.id.cmp(&a.id)));
        Ok(failures)
    }

    async fn delete_failure(&self, id: i32) -> AnyhowResult<bool> {
        let mut inner = self.lock();
        let before = inner.failures.len();
        inner.failures.retain(|f| f.id != id);
        Ok(inner.failures.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(server_id: i32, map_end: i64) -> Snapshot {
        Snapshot {
            auth_id: "A1".to_string(),
            server_name: "s".to_string(),
            server_ip: "10.0.0.5".to_string(),
            game_port: 14567,
            map_name: "berlin".to_string(),
            map_end,
            players: Vec::new(),
            server_id,
            source_filename: "10-0-0-5_14567_0.json".to_string(),
            digest: "0".repeat(64),
        }
    }

    #[tokio::test]
    async fn test_round_visibility_after_write() {
        let store = MemoryStore::new();
        let id = store.add_server("A1", "10.0.0.5", 14567, true);
        assert!(!store.find_existing_round(id, "berlin", 1).await.unwrap());
        store.write_round(&snapshot(id, 1)).await.unwrap();
        assert!(store.find_existing_round(id, "berlin", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_server_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.create_server("A1", "10.0.0.5", 14567, false).await.unwrap();
        let b = store.create_server("A1", "10.0.0.5", 14567, false).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.server_count(), 1);
    }

    #[tokio::test]
    async fn test_list_failures_newest_first() {
        let store = MemoryStore::new();
        store.insert_failure(None, 100, "old", "r").await.unwrap();
        store.insert_failure(None, 200, "new", "r").await.unwrap();
        let failures = store.list_failures().await.unwrap();
        assert_eq!(failures[0].filename, "new");
        assert_eq!(failures[1].filename, "old");
    }
}
