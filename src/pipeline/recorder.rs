use super::types::PipelineError;
use crate::lifecycle::LifecycleManager;
use crate::store::StatsStore;
use chrono::Utc;
use log::{error, info, warn};

/// Maximum stored length of a failure reason, in characters.
pub const REASON_BUDGET: usize = 128;

/// Truncates a failure reason to the storage budget, on a character boundary.
pub fn truncate_reason(reason: &str) -> String {
    reason.chars().take(REASON_BUDGET).collect()
}

/// Persists a failure record for a server-attributed processing error and
/// moves the file to the failed directory.
///
/// Called only once authorization has resolved a server id (> 0); earlier
/// failures have no server to attribute and are the caller's to handle. Both
/// the insert and the move are best-effort: a secondary failure here is
/// logged and swallowed so the primary error stays the one surfaced to the
/// caller.
///
/// # Arguments
///
/// * `store` - The stats store holding the failure table.
/// * `lifecycle` - Manager performing the move to failed.
/// * `server_id` - The resolved server id the failure is attributed to.
/// * `pending_name` - Inbound filename of the snapshot in the pending directory.
/// * `error` - The primary processing error.
pub async fn record_failure<S: StatsStore>(
    store: &S,
    lifecycle: &LifecycleManager,
    server_id: i32,
    pending_name: &str,
    error: &PipelineError,
) {
    let base_name = pending_name.strip_suffix(".json").unwrap_or(pending_name);
    let reason = truncate_reason(&error.to_string());

    match store
        .insert_failure(Some(server_id), Utc::now().timestamp(), base_name, &reason)
        .await
    {
        Ok(record_id) => info!(
            "Recorded failure {} for snapshot {} (server {})",
            record_id, pending_name, server_id
        ),
        Err(e) => warn!(
            "Could not record failure for snapshot {}: {:?}",
            pending_name, e
        ),
    }

    if let Err(e) = lifecycle.demote(pending_name) {
        error!(
            "Could not move failed snapshot {} to the failed directory: {}",
            pending_name, e
        );
    }
}
