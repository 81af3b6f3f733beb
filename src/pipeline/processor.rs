use super::recorder::record_failure;
use super::types::{PipelineError, ProcessOutcome};
use crate::authorize::resolve_server;
use crate::config::UnknownServerPolicy;
use crate::decode::decode_report;
use crate::lifecycle::LifecycleManager;
use crate::report::parse_snapshot;
use crate::store::StatsStore;
use anyhow::anyhow;
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Processes one pending snapshot file against the stats store.
///
/// Orchestration only; the file move itself is the caller's explicit next
/// step, driven by the returned [`ProcessOutcome`].
///
/// 1. Read, decode, and parse the file. Failures propagate unchanged — no
///    store write has happened and no server is attributed.
/// 2. Idempotency: if the identity triple matches a known server and a round
///    with the same server/map/end-time key is committed, return
///    [`ProcessOutcome::AlreadyProcessed`] with no further side effects.
/// 3. Resolve authorization; an unauthorized server propagates with a zero
///    server id.
/// 4. Commit the round. An error after the server id resolved is recorded
///    via the failure recorder (insert plus best-effort move to failed) and
///    then re-raised.
///
/// # Arguments
///
/// * `store` - The stats store.
/// * `lifecycle` - Lifecycle manager, used only by the failure recorder here.
/// * `policy` - Unknown-server policy from configuration.
/// * `path` - Path of the pending snapshot file.
/// * `ignore_authorization` - Administrative override flag.
///
/// # Returns
///
/// * `Ok(ProcessOutcome)` - Committed now, or already committed earlier; both
///   carry the canonical destination filename.
/// * `Err(PipelineError)` - The classified processing failure.
pub async fn process_snapshot<S: StatsStore>(
    store: &S,
    lifecycle: &LifecycleManager,
    policy: UnknownServerPolicy,
    path: &Path,
    ignore_authorization: bool,
) -> Result<ProcessOutcome, PipelineError> {
    let pending_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PipelineError::NotFound(pending_name))
        }
        Err(e) => {
            return Err(PipelineError::FileSystem(
                anyhow!(e).context(format!("Failed to read snapshot {}", path.display())),
            ))
        }
    };

    let map = decode_report(&raw, path)?;
    let mut snapshot = parse_snapshot(&map, &raw)?;
    debug!(
        "Parsed snapshot {} from {}:{} ({} players)",
        pending_name,
        snapshot.server_ip,
        snapshot.game_port,
        snapshot.players.len()
    );

    // Idempotency check, keyed on content (server + map + end time), not on
    // the inbound filename. The lookup does not gate on authorization: an
    // unknown server cannot have committed rounds.
    let known = store
        .find_server(&snapshot.auth_id, &snapshot.server_ip, snapshot.game_port)
        .await
        .map_err(PipelineError::Persistence)?;
    if let Some(server) = known {
        let committed = store
            .find_existing_round(server.id, &snapshot.map_name, snapshot.map_end)
            .await
            .map_err(PipelineError::Persistence)?;
        if committed {
            info!(
                "Snapshot {} already committed for server {} (map {}, end {})",
                pending_name, server.id, snapshot.map_name, snapshot.map_end
            );
            return Ok(ProcessOutcome::AlreadyProcessed {
                source_filename: snapshot.source_filename,
            });
        }
    }

    let server_id = resolve_server(
        store,
        &snapshot.auth_id,
        &snapshot.server_ip,
        snapshot.game_port,
        ignore_authorization,
        policy,
    )
    .await?;
    snapshot.server_id = server_id;

    if let Err(e) = store.write_round(&snapshot).await {
        let error = PipelineError::Persistence(e);
        record_failure(store, lifecycle, server_id, &pending_name, &error).await;
        return Err(error);
    }

    info!(
        "Committed round for server {}: map {}, {} players",
        server_id,
        snapshot.map_name,
        snapshot.players.len()
    );
    Ok(ProcessOutcome::Processed {
        source_filename: snapshot.source_filename,
    })
}
