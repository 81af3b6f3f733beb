use super::types::{PlayerRecord, Snapshot};
use crate::utils::compute_snapshot_digest;
use serde_json::{Map, Value};
use thiserror::Error;

/// A required snapshot field is missing or ill-typed.
#[derive(Debug, Error)]
#[error("Incomplete snapshot data: {0}")]
pub struct IncompleteData(pub String);

/// Parses a decoded round-report mapping into a [`Snapshot`].
///
/// Required top-level keys: `authId`, `serverName`, `serverIp`, `gamePort`,
/// `mapName`, `mapEnd`, and `players`. Integer fields accept JSON numbers or
/// numeric strings, since some legacy game servers quote them; anything else
/// is an [`IncompleteData`] failure naming the offending field. The canonical
/// `source_filename` and the raw-content digest are derived here.
///
/// # Arguments
///
/// * `map` - The decoded ordered mapping of the report.
/// * `raw_content` - The raw file bytes, used for the content digest.
///
/// # Returns
///
/// * `Ok(Snapshot)` - The parsed snapshot with `server_id` still unresolved (0).
/// * `Err(IncompleteData)` - A required field is missing or malformed.
pub fn parse_snapshot(map: &Map<String, Value>, raw_content: &[u8]) -> Result<Snapshot, IncompleteData> {
    let auth_id = string_field(map, "authId")?;
    let server_name = string_field(map, "serverName")?;
    let server_ip = string_field(map, "serverIp")?;
    let game_port = port_field(map, "gamePort")?;
    let map_name = string_field(map, "mapName")?;
    let map_end = integer_field(map, "mapEnd")?;
    let players = player_list(map)?;

    let source_filename = canonical_filename(&server_ip, game_port, map_end);
    let digest = compute_snapshot_digest(raw_content);

    Ok(Snapshot {
        auth_id,
        server_name,
        server_ip,
        game_port,
        map_name,
        map_end,
        players,
        server_id: 0,
        source_filename,
        digest,
    })
}

/// Derives the canonical destination filename from snapshot content.
///
/// The inbound filename cannot be trusted (operator-submitted files may be
/// renamed before acceptance), so the archive name is built from the identity
/// and end-time fields instead.
fn canonical_filename(server_ip: &str, game_port: u16, map_end: i64) -> String {
    let ip = server_ip.replace(['.', ':'], "-");
    format!("{}_{}_{}.json", ip, game_port, map_end)
}

fn required<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a Value, IncompleteData> {
    map.get(key)
        .ok_or_else(|| IncompleteData(format!("missing field '{}'", key)))
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<String, IncompleteData> {
    match required(map, key)? {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(IncompleteData(format!("field '{}' must be a non-empty string", key))),
    }
}

/// Coerces a field to an integer, accepting JSON numbers and numeric strings.
fn integer_field(map: &Map<String, Value>, key: &str) -> Result<i64, IncompleteData> {
    coerce_integer(required(map, key)?)
        .ok_or_else(|| IncompleteData(format!("field '{}' must be an integer", key)))
}

fn port_field(map: &Map<String, Value>, key: &str) -> Result<u16, IncompleteData> {
    let value = integer_field(map, key)?;
    u16::try_from(value)
        .map_err(|_| IncompleteData(format!("field '{}' is not a valid port", key)))
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Extracts the ordered player list. Each entry needs a name and a numeric
/// rank; the remaining stats default to 0 when absent.
fn player_list(map: &Map<String, Value>) -> Result<Vec<PlayerRecord>, IncompleteData> {
    let entries = match required(map, "players")? {
        Value::Array(entries) => entries,
        _ => return Err(IncompleteData("field 'players' must be an array".to_string())),
    };

    let mut players = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let player = entry
            .as_object()
            .ok_or_else(|| IncompleteData(format!("player entry {} must be an object", i)))?;
        let name = string_field(player, "name")
            .map_err(|_| IncompleteData(format!("player entry {} is missing a name", i)))?;
        let rank = integer_field(player, "rank")
            .map_err(|_| IncompleteData(format!("player entry {} is missing a numeric rank", i)))?;
        players.push(PlayerRecord {
            name,
            rank,
            score: optional_integer(player, "score"),
            kills: optional_integer(player, "kills"),
            deaths: optional_integer(player, "deaths"),
        });
    }
    Ok(players)
}

fn optional_integer(map: &Map<String, Value>, key: &str) -> i64 {
    map.get(key).and_then(coerce_integer).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_report;
    use std::path::Path;

    fn parse(raw: &[u8]) -> Result<Snapshot, IncompleteData> {
        let map = decode_report(raw, Path::new("test.json")).unwrap();
        parse_snapshot(&map, raw)
    }

    const VALID: &[u8] = br#"{
        "authId": "A1",
        "serverName": "Test Server",
        "serverIp": "10.0.0.5",
        "gamePort": 14567,
        "mapName": "berlin",
        "mapEnd": 1700000000,
        "players": [
            {"name": "alpha", "rank": 3, "score": 42, "kills": 5, "deaths": 1},
            {"name": "bravo", "rank": 1}
        ]
    }"#;

    /// Tests parsing a fully populated round report.
    #[test]
    fn test_parse_valid_snapshot() {
        let snapshot = parse(VALID).unwrap();
        assert_eq!(snapshot.auth_id, "A1");
        assert_eq!(snapshot.server_name, "Test Server");
        assert_eq!(snapshot.server_ip, "10.0.0.5");
        assert_eq!(snapshot.game_port, 14567);
        assert_eq!(snapshot.map_name, "berlin");
        assert_eq!(snapshot.map_end, 1700000000);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].score, 42);
        assert_eq!(snapshot.players[1].rank, 1);
        assert_eq!(snapshot.players[1].score, 0);
        assert_eq!(snapshot.server_id, 0);
        assert_eq!(snapshot.digest.len(), 64);
    }

    #[test]
    fn test_canonical_filename_derived_from_content() {
        let snapshot = parse(VALID).unwrap();
        assert_eq!(snapshot.source_filename, "10-0-0-5_14567_1700000000.json");
    }

    /// A missing required field names the field instead of surfacing a raw
    /// lookup fault.
    #[test]
    fn test_missing_field_is_descriptive() {
        let err = parse(br#"{"authId": "A1"}"#).unwrap_err();
        assert!(err.to_string().starts_with("Incomplete snapshot data:"));
        assert!(err.to_string().contains("serverName"));
    }

    /// Legacy servers quote numeric fields; the parser coerces them.
    #[test]
    fn test_map_end_accepts_numeric_string() {
        let raw = br#"{
            "authId": "A1", "serverName": "s", "serverIp": "10.0.0.5",
            "gamePort": "14567", "mapName": "berlin", "mapEnd": "1700000000",
            "players": []
        }"#;
        let snapshot = parse(raw).unwrap();
        assert_eq!(snapshot.map_end, 1700000000);
        assert_eq!(snapshot.game_port, 14567);
    }

    #[test]
    fn test_map_end_rejects_non_numeric() {
        let raw = br#"{
            "authId": "A1", "serverName": "s", "serverIp": "10.0.0.5",
            "gamePort": 14567, "mapName": "berlin", "mapEnd": "yesterday",
            "players": []
        }"#;
        let err = parse(raw).unwrap_err();
        assert!(err.to_string().contains("mapEnd"));
    }

    #[test]
    fn test_player_without_rank_fails() {
        let raw = br#"{
            "authId": "A1", "serverName": "s", "serverIp": "10.0.0.5",
            "gamePort": 14567, "mapName": "berlin", "mapEnd": 1700000000,
            "players": [{"name": "alpha"}]
        }"#;
        let err = parse(raw).unwrap_err();
        assert!(err.to_string().contains("rank"));
    }

    #[test]
    fn test_empty_player_list_is_valid() {
        let raw = br#"{
            "authId": "A1", "serverName": "s", "serverIp": "10.0.0.5",
            "gamePort": 14567, "mapName": "berlin", "mapEnd": 1700000000,
            "players": []
        }"#;
        let snapshot = parse(raw).unwrap();
        assert!(snapshot.players.is_empty());
    }
}
