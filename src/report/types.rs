use std::fmt::Debug;

/// One player's line in a round report.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    /// Player display name.
    pub name: String,
    /// Numeric rank at round end.
    pub rank: i64,
    /// Round score; 0 when the report omits it.
    pub score: i64,
    /// Kills in the round; 0 when the report omits it.
    pub kills: i64,
    /// Deaths in the round; 0 when the report omits it.
    pub deaths: i64,
}

/// The parsed representation of one round-report file.
///
/// Constructed in memory from a decoded mapping and never mutated after
/// authorization and processing complete. `server_id` stays 0 unless
/// authorization succeeded or was overridden; a snapshot with
/// `server_id <= 0` is never attributed to a server in the failure store.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Credential/identity string of the reporting server.
    pub auth_id: String,
    /// Display name of the reporting server.
    pub server_name: String,
    /// IP address the server reports for itself.
    pub server_ip: String,
    /// Game port of the reporting server.
    pub game_port: u16,
    /// Name of the map the round was played on.
    pub map_name: String,
    /// Epoch seconds at which the round ended.
    pub map_end: i64,
    /// Players present at round end, in report order.
    pub players: Vec<PlayerRecord>,
    /// Resolved server foreign key; 0 until authorization resolves it.
    pub server_id: i32,
    /// Canonical filename to archive the file under on success, derived from
    /// content rather than from the inbound filename.
    pub source_filename: String,
    /// SHA-256 hex digest of the raw file content.
    pub digest: String,
}
