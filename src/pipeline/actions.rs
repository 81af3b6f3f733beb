use super::locks::FileLocks;
use super::processor::process_snapshot;
use super::types::{Outcome, PipelineError, ProcessOutcome};
use crate::config::PipelineConfig;
use crate::lifecycle::LifecycleManager;
use crate::scan::{scan_pending, SummaryRow};
use crate::store::{FailedSnapshotRecord, StatsStore};
use anyhow::Result as AnyhowResult;
use futures::future::join_all;
use log::{error, warn};

/// Lists pending snapshots with display metadata. Read-only.
pub fn list_pending(config: &PipelineConfig) -> AnyhowResult<Vec<SummaryRow>> {
    scan_pending(config)
}

/// Accepts one pending snapshot: process it and move the file to its
/// terminal directory.
///
/// Holds the per-filename lock across the whole sequence, so a concurrent
/// accept of the same filename observes not-found after this one's move. On
/// success (or on an already-committed duplicate) the file is promoted under
/// the snapshot's canonical filename. On failure the file is moved to the
/// failed directory best-effort; server-attributed failures were already
/// recorded by the processor's failure recording.
///
/// # Arguments
///
/// * `store` - The stats store.
/// * `config` - Pipeline directories and policy.
/// * `locks` - Shared per-filename lock registry.
/// * `filename` - Name of the file in the pending directory.
/// * `ignore_authorization` - Administrative override for manual imports.
pub async fn accept_pending<S: StatsStore>(
    store: &S,
    config: &PipelineConfig,
    locks: &FileLocks,
    filename: &str,
    ignore_authorization: bool,
) -> Outcome {
    let lock = locks.for_file(filename);
    let _guard = lock.lock().await;

    let lifecycle = LifecycleManager::new(config);
    let path = lifecycle.pending_path(filename);

    let outcome = process_snapshot(
        store,
        &lifecycle,
        config.unknown_servers,
        &path,
        ignore_authorization,
    )
    .await;

    match outcome {
        Ok(ProcessOutcome::Processed { source_filename }) => {
            promote(&lifecycle, filename, &source_filename, "Snapshot was processed successfully.")
        }
        Ok(ProcessOutcome::AlreadyProcessed { source_filename }) => {
            promote(&lifecycle, filename, &source_filename, "Snapshot was already processed.")
        }
        Err(error) => {
            match &error {
                // The recorder already inserted the record and moved the file.
                PipelineError::Persistence(_) => {}
                // Nothing on disk to move.
                PipelineError::NotFound(_) => {}
                // Decode, parse, and authorization failures have no server to
                // attribute; the file still goes to failed, best-effort.
                _ => {
                    if let Err(move_error) = lifecycle.demote(filename) {
                        warn!(
                            "Could not move rejected snapshot {} to the failed directory: {}",
                            filename, move_error
                        );
                    }
                }
            }
            Outcome::failure(error.to_string())
        }
    }
}

/// A move failure after successful processing is a reportable inconsistency,
/// never silently swallowed.
fn promote(
    lifecycle: &LifecycleManager,
    filename: &str,
    canonical_name: &str,
    message: &str,
) -> Outcome {
    match lifecycle.promote(filename, canonical_name) {
        Ok(()) => Outcome::success(message),
        Err(error) => {
            error!(
                "Snapshot {} was committed but could not be archived: {}",
                filename, error
            );
            Outcome::failure(format!(
                "Snapshot was processed but the file could not be archived: {}",
                error
            ))
        }
    }
}

/// Deletes a batch of pending snapshots, best-effort.
///
/// Per-file errors are aggregated into the outcome; one failure never aborts
/// the remaining deletions.
pub async fn delete_pending(
    config: &PipelineConfig,
    locks: &FileLocks,
    filenames: &[String],
) -> Outcome {
    let lifecycle = LifecycleManager::new(config);
    let deletions = filenames.iter().map(|filename| {
        let lifecycle = lifecycle.clone();
        async move {
            let lock = locks.for_file(filename);
            let _guard = lock.lock().await;
            lifecycle
                .discard(filename)
                .map_err(|error| (filename.clone(), error))
        }
    });

    let mut deleted = 0;
    let mut failures = Vec::new();
    for result in join_all(deletions).await {
        match result {
            Ok(()) => deleted += 1,
            Err((filename, error)) => failures.push(format!("{} ({})", filename, error)),
        }
    }

    if failures.is_empty() {
        Outcome::success(format!("Deleted {} pending snapshot(s)", deleted))
    } else {
        Outcome::failure(format!(
            "Deleted {} pending snapshot(s); {} could not be deleted: {}",
            deleted,
            failures.len(),
            failures.join(", ")
        ))
    }
}

/// Lists failure records, newest first.
pub async fn list_failed_records<S: StatsStore>(
    store: &S,
) -> AnyhowResult<Vec<FailedSnapshotRecord>> {
    store.list_failures().await
}

/// Deletes a failure record together with its file in the failed directory.
///
/// The record and the file are one logical unit. The file is deleted first,
/// the row second, so an undeletable file never leaves an orphaned row
/// pointing at nothing. A file that is already missing does not block the
/// row delete; operator cleanup must not get stuck.
pub async fn delete_failed_record<S: StatsStore>(
    store: &S,
    config: &PipelineConfig,
    id: i32,
) -> Outcome {
    let lifecycle = LifecycleManager::new(config);

    let record = match store.list_failures().await {
        Ok(records) => records.into_iter().find(|r| r.id == id),
        Err(error) => return Outcome::failure(format!("Could not read failure records: {}", error)),
    };
    let Some(record) = record else {
        return Outcome::failure(format!("Failed record {} not found", id));
    };

    let filename = format!("{}.json", record.filename);
    match lifecycle.remove_failed(&filename) {
        Ok(true) => {}
        Ok(false) => warn!(
            "Failed snapshot file {} was already missing; deleting the record anyway",
            filename
        ),
        Err(error) => {
            return Outcome::failure(format!(
                "Could not delete failed snapshot file {}: {}",
                filename, error
            ))
        }
    }

    match store.delete_failure(id).await {
        Ok(true) => Outcome::success(format!("Deleted failed record {}", id)),
        Ok(false) => Outcome::failure(format!("Failed record {} not found", id)),
        Err(error) => {
            // The file is gone but the row remains; report the inconsistency.
            error!(
                "Failed snapshot file {} was deleted but its record {} remains: {}",
                filename, id, error
            );
            Outcome::failure(format!(
                "Snapshot file was deleted but the record could not be removed: {}",
                error
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownServerPolicy;
    use crate::store::MemoryStore;
    use std::fs;

    const VALID: &str = r#"{
        "authId": "A1",
        "serverName": "Test Server",
        "serverIp": "10.0.0.5",
        "gamePort": 14567,
        "mapName": "berlin",
        "mapEnd": 1700000000,
        "players": []
    }"#;

    fn fixture() -> (tempfile::TempDir, PipelineConfig) {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_base_dir(tmp.path(), UnknownServerPolicy::Register);
        config.ensure_directories().unwrap();
        (tmp, config)
    }

    fn seed(config: &PipelineConfig, name: &str, content: &str) {
        fs::write(config.pending_dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_accept_pending_success_scenario() {
        let (tmp, config) = fixture();
        let store = MemoryStore::new();
        store.add_server("A1", "10.0.0.5", 14567, true);
        seed(&config, "foo.json", VALID);
        let locks = FileLocks::new();

        let outcome = accept_pending(&store, &config, &locks, "foo.json", false).await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Snapshot was processed successfully.");
        assert!(!config.pending_dir.join("foo.json").exists());
        assert!(tmp
            .path()
            .join("processed/10-0-0-5_14567_1700000000.json")
            .exists());
    }

    /// The second accept of the same filename must observe not-found, never
    /// double-process.
    #[tokio::test]
    async fn test_accept_pending_twice_observes_not_found() {
        let (_tmp, config) = fixture();
        let store = MemoryStore::new();
        store.add_server("A1", "10.0.0.5", 14567, true);
        seed(&config, "foo.json", VALID);
        let locks = FileLocks::new();

        let first = accept_pending(&store, &config, &locks, "foo.json", false).await;
        assert!(first.success);

        let second = accept_pending(&store, &config, &locks, "foo.json", false).await;
        assert!(!second.success);
        assert!(second.message.contains("not found"));
        assert_eq!(store.round_count(), 1);
    }

    /// A replanted duplicate of a committed round is archived without a
    /// second store write.
    #[tokio::test]
    async fn test_accept_pending_duplicate_round() {
        let (_tmp, config) = fixture();
        let store = MemoryStore::new();
        store.add_server("A1", "10.0.0.5", 14567, true);
        seed(&config, "foo.json", VALID);
        let locks = FileLocks::new();
        accept_pending(&store, &config, &locks, "foo.json", false).await;

        seed(&config, "replanted.json", VALID);
        let outcome = accept_pending(&store, &config, &locks, "replanted.json", false).await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Snapshot was already processed.");
        assert!(!config.pending_dir.join("replanted.json").exists());
        assert_eq!(store.round_count(), 1);
    }

    /// Unauthorized snapshots go to the failed directory without a failure
    /// record: no server id was ever vouched for.
    #[tokio::test]
    async fn test_accept_pending_unauthorized_moves_to_failed() {
        let (tmp, config) = fixture();
        let store = MemoryStore::new();
        store.add_server("A1", "10.0.0.5", 14567, false);
        seed(&config, "foo.json", VALID);
        let locks = FileLocks::new();

        let outcome = accept_pending(&store, &config, &locks, "foo.json", false).await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("not authorized"));
        assert!(tmp.path().join("failed/foo.json").exists());
        assert!(store.list_failures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_pending_override_resolves_unknown_server() {
        let (_tmp, config) = fixture();
        let store = MemoryStore::new();
        seed(&config, "foo.json", VALID);
        let locks = FileLocks::new();

        let outcome = accept_pending(&store, &config, &locks, "foo.json", true).await;

        assert!(outcome.success);
        assert_eq!(store.round_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_pending_is_best_effort() {
        let (_tmp, config) = fixture();
        seed(&config, "a.json", VALID);
        seed(&config, "c.json", VALID);
        let locks = FileLocks::new();

        let names = vec!["a.json".to_string(), "b.json".to_string(), "c.json".to_string()];
        let outcome = delete_pending(&config, &locks, &names).await;

        // b.json was missing, but a and c were still deleted.
        assert!(!outcome.success);
        assert!(outcome.message.contains("Deleted 2"));
        assert!(outcome.message.contains("b.json"));
        assert!(!config.pending_dir.join("a.json").exists());
        assert!(!config.pending_dir.join("c.json").exists());
    }

    #[tokio::test]
    async fn test_delete_failed_record_removes_file_and_row() {
        let (tmp, config) = fixture();
        let store = MemoryStore::new();
        let id = store.insert_failure(Some(1), 100, "bad", "reason").await.unwrap();
        fs::write(tmp.path().join("failed/bad.json"), b"{}").unwrap();

        let outcome = delete_failed_record(&store, &config, id).await;

        assert!(outcome.success);
        assert!(!tmp.path().join("failed/bad.json").exists());
        assert!(store.list_failures().await.unwrap().is_empty());
    }

    /// Operator cleanup must not get stuck on an already-missing file.
    #[tokio::test]
    async fn test_delete_failed_record_with_missing_file() {
        let (_tmp, config) = fixture();
        let store = MemoryStore::new();
        let id = store.insert_failure(Some(1), 100, "gone", "reason").await.unwrap();

        let outcome = delete_failed_record(&store, &config, id).await;

        assert!(outcome.success);
        assert!(store.list_failures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failed_record_unknown_id() {
        let (_tmp, config) = fixture();
        let store = MemoryStore::new();
        let outcome = delete_failed_record(&store, &config, 42).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("not found"));
    }
}
