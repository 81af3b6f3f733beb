use crate::config::UnknownServerPolicy;
use crate::pipeline::PipelineError;
use crate::store::StatsStore;
use log::{debug, info, warn};

/// Resolves the server id for a snapshot's identity triple.
///
/// With `ignore_authorization` set, identity verification is bypassed and the
/// server record is resolved or created unconditionally (operator-approved
/// manual imports only). Otherwise a known, authorized server resolves to
/// its id; a known-but-unauthorized or unknown server fails with
/// [`PipelineError::Unauthorized`]. Under the `Register` policy an unknown
/// server is first recorded as unauthorized-by-default so an operator can
/// authorize it later.
///
/// Repeated calls with the same identity and no intervening state change
/// return the same id.
///
/// # Arguments
///
/// * `store` - The stats store holding server records.
/// * `auth_id` - Credential/identity string from the snapshot.
/// * `ip` - Reported server IP address.
/// * `port` - Reported game port.
/// * `ignore_authorization` - Administrative override flag.
/// * `policy` - What to do with previously unseen servers.
///
/// # Returns
///
/// * `Ok(i32)` - The resolved server id (> 0).
/// * `Err(PipelineError::Unauthorized)` - The server may not submit rounds;
///   `server_id` is 0, since authorization never vouched for an id.
/// * `Err(PipelineError::Persistence)` - The store lookup or insert failed.
pub async fn resolve_server<S: StatsStore>(
    store: &S,
    auth_id: &str,
    ip: &str,
    port: u16,
    ignore_authorization: bool,
    policy: UnknownServerPolicy,
) -> Result<i32, PipelineError> {
    let existing = store
        .find_server(auth_id, ip, port)
        .await
        .map_err(PipelineError::Persistence)?;

    if ignore_authorization {
        let id = match existing {
            Some(record) => record.id,
            None => store
                .create_server(auth_id, ip, port, true)
                .await
                .map_err(PipelineError::Persistence)?,
        };
        info!(
            "Authorization override for server {}:{} (authId {}), id {}",
            ip, port, auth_id, id
        );
        return Ok(id);
    }

    match existing {
        Some(record) if record.authorized => {
            debug!("Server {}:{} authorized, id {}", ip, port, record.id);
            Ok(record.id)
        }
        Some(_) => {
            warn!("Server {}:{} (authId {}) is not authorized", ip, port, auth_id);
            Err(PipelineError::Unauthorized { server_id: 0 })
        }
        None => {
            if policy == UnknownServerPolicy::Register {
                // Registration on first contact; the current attempt still
                // fails authorization.
                store
                    .create_server(auth_id, ip, port, false)
                    .await
                    .map_err(PipelineError::Persistence)?;
                info!("Registered unknown server {}:{} as unauthorized", ip, port);
            } else {
                warn!("Rejected snapshot from unknown server {}:{}", ip, port);
            }
            Err(PipelineError::Unauthorized { server_id: 0 })
        }
    }
}
