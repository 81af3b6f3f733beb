use crate::config::PipelineConfig;
use crate::decode::decode_report;
use crate::report::parse_snapshot;
use anyhow::{Context, Result as AnyhowResult};
use chrono::DateTime;
use log::warn;
use std::fs;
use std::path::Path;

/// Display metadata for one pending snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    /// Filename in the pending directory (the display/delete identity).
    pub filename: String,
    /// Reported server name.
    pub server_name: String,
    /// Map the round was played on.
    pub map_name: String,
    /// Reported server IP.
    pub server_ip: String,
    /// Reported game port.
    pub game_port: u16,
    /// Number of players in the report.
    pub player_count: usize,
    /// Round end time, formatted for display.
    pub ended_at: String,
}

/// Lists pending snapshots with extracted display metadata.
///
/// Scans the pending directory for `*.json` files and decodes each one
/// independently. Files that fail to decode or parse are skipped with a
/// warning; the listing is sorted by filename for a stable display order.
///
/// # Arguments
///
/// * `config` - Pipeline configuration naming the pending directory.
///
/// # Returns
///
/// * `Ok(Vec<SummaryRow>)` - One row per readable pending snapshot.
/// * `Err(anyhow::Error)` - The pending directory itself could not be read.
pub fn scan_pending(config: &PipelineConfig) -> AnyhowResult<Vec<SummaryRow>> {
    let entries = fs::read_dir(&config.pending_dir).with_context(|| {
        format!(
            "Failed to read pending directory: {}",
            config.pending_dir.display()
        )
    })?;

    let mut rows = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read pending directory entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match summarize(&path) {
            Some(row) => rows.push(row),
            None => warn!("Skipping unreadable pending snapshot: {}", path.display()),
        }
    }

    rows.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(rows)
}

/// Reduces one pending file to its display row; `None` if it cannot be read
/// or parsed.
fn summarize(path: &Path) -> Option<SummaryRow> {
    let raw = fs::read(path).ok()?;
    let map = decode_report(&raw, path).ok()?;
    let snapshot = parse_snapshot(&map, &raw).ok()?;

    Some(SummaryRow {
        filename: path.file_name()?.to_string_lossy().into_owned(),
        server_name: snapshot.server_name,
        map_name: snapshot.map_name,
        server_ip: snapshot.server_ip,
        game_port: snapshot.game_port,
        player_count: snapshot.players.len(),
        ended_at: format_end_time(snapshot.map_end),
    })
}

/// Formats an epoch-seconds end time for display; out-of-range values fall
/// back to the raw number.
fn format_end_time(map_end: i64) -> String {
    DateTime::from_timestamp(map_end, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| map_end.to_string())
}
