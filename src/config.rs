//! Pipeline configuration.
//!
//! All path and policy knobs live in an explicit [`PipelineConfig`] value that
//! is constructed once (in `main`, from CLI arguments or environment
//! variables) and passed into each component. No component reads global
//! mutable state.

use anyhow::{Context, Result as AnyhowResult};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};

/// Policy for a reporting server that has never been seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnknownServerPolicy {
    /// Create an unauthorized-by-default server record on first contact so an
    /// operator can authorize it later. The triggering snapshot still fails
    /// authorization.
    Register,
    /// Reject the snapshot without creating any server record.
    Reject,
}

/// Directories and policy flags the pipeline operates with.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding inbound snapshots awaiting acceptance.
    pub pending_dir: PathBuf,
    /// Terminal directory for successfully committed snapshots.
    pub processed_dir: PathBuf,
    /// Terminal directory for snapshots that failed processing.
    pub failed_dir: PathBuf,
    /// What to do with snapshots from previously unseen servers.
    pub unknown_servers: UnknownServerPolicy,
}

impl PipelineConfig {
    /// Builds a configuration rooted at `base_dir`, using the conventional
    /// `pending`, `processed`, and `failed` subdirectories.
    pub fn from_base_dir(base_dir: &Path, unknown_servers: UnknownServerPolicy) -> Self {
        Self {
            pending_dir: base_dir.join("pending"),
            processed_dir: base_dir.join("processed"),
            failed_dir: base_dir.join("failed"),
            unknown_servers,
        }
    }

    /// Creates the three lifecycle directories if they do not already exist.
    pub fn ensure_directories(&self) -> AnyhowResult<()> {
        for dir in [&self.pending_dir, &self.processed_dir, &self.failed_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base_dir_layout() {
        let config = PipelineConfig::from_base_dir(Path::new("/srv/snapshots"), UnknownServerPolicy::Register);
        assert_eq!(config.pending_dir, Path::new("/srv/snapshots/pending"));
        assert_eq!(config.processed_dir, Path::new("/srv/snapshots/processed"));
        assert_eq!(config.failed_dir, Path::new("/srv/snapshots/failed"));
    }

    #[test]
    fn test_ensure_directories_creates_all_three() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_base_dir(tmp.path(), UnknownServerPolicy::Reject);
        config.ensure_directories().unwrap();
        assert!(config.pending_dir.is_dir());
        assert!(config.processed_dir.is_dir());
        assert!(config.failed_dir.is_dir());
    }
}
