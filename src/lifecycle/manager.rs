use crate::config::PipelineConfig;
use crate::pipeline::PipelineError;
use anyhow::anyhow;
use log::info;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Performs the pending → processed | failed | deleted transitions.
///
/// A successful processing run promotes the file under the snapshot's own
/// canonical filename, decoupled from the inbound name; a failure demotes it
/// under the original name. A missing source maps to
/// [`PipelineError::NotFound`], which is what the loser of a concurrent
/// accept race observes after the winner's move.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    pending_dir: PathBuf,
    processed_dir: PathBuf,
    failed_dir: PathBuf,
}

impl LifecycleManager {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            pending_dir: config.pending_dir.clone(),
            processed_dir: config.processed_dir.clone(),
            failed_dir: config.failed_dir.clone(),
        }
    }

    /// Full path of a pending snapshot by filename.
    pub fn pending_path(&self, filename: &str) -> PathBuf {
        self.pending_dir.join(filename)
    }

    /// Moves a pending snapshot to the processed directory under its
    /// canonical filename.
    pub fn promote(&self, pending_name: &str, canonical_name: &str) -> Result<(), PipelineError> {
        check_filename(pending_name)?;
        check_filename(canonical_name)?;
        let destination = self.processed_dir.join(canonical_name);
        self.transition(pending_name, destination, "processed")
    }

    /// Moves a pending snapshot to the failed directory under its original
    /// filename.
    pub fn demote(&self, pending_name: &str) -> Result<(), PipelineError> {
        check_filename(pending_name)?;
        let destination = self.failed_dir.join(pending_name);
        self.transition(pending_name, destination, "failed")
    }

    /// Removes a pending snapshot without processing it (operator delete).
    pub fn discard(&self, pending_name: &str) -> Result<(), PipelineError> {
        check_filename(pending_name)?;
        let source = self.pending_path(pending_name);
        match fs::remove_file(&source) {
            Ok(()) => {
                info!("Deleted pending snapshot {}", pending_name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PipelineError::NotFound(pending_name.to_string()))
            }
            Err(e) => Err(PipelineError::FileSystem(
                anyhow!(e).context(format!("Failed to delete pending snapshot {}", pending_name)),
            )),
        }
    }

    /// Removes a file from the failed directory, as part of deleting a
    /// failure record. Returns whether a file was present.
    pub fn remove_failed(&self, filename: &str) -> Result<bool, PipelineError> {
        check_filename(filename)?;
        let path = self.failed_dir.join(filename);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PipelineError::FileSystem(
                anyhow!(e).context(format!("Failed to delete failed snapshot {}", filename)),
            )),
        }
    }

    fn transition(
        &self,
        pending_name: &str,
        destination: PathBuf,
        state: &str,
    ) -> Result<(), PipelineError> {
        let source = self.pending_path(pending_name);
        match fs::rename(&source, &destination) {
            Ok(()) => {
                info!("Moved {} to {} as {}", pending_name, state, destination.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PipelineError::NotFound(pending_name.to_string()))
            }
            Err(e) => Err(PipelineError::FileSystem(anyhow!(e).context(format!(
                "Failed to move {} to the {} directory",
                pending_name, state
            )))),
        }
    }
}

/// Rejects names that would escape the lifecycle directories.
fn check_filename(name: &str) -> Result<(), PipelineError> {
    if name.is_empty() || name == ".." || name.contains(['/', '\\']) {
        return Err(PipelineError::FileSystem(anyhow!(
            "invalid snapshot filename: {:?}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownServerPolicy;

    fn fixture() -> (tempfile::TempDir, LifecycleManager) {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_base_dir(tmp.path(), UnknownServerPolicy::Register);
        config.ensure_directories().unwrap();
        let manager = LifecycleManager::new(&config);
        (tmp, manager)
    }

    fn seed(manager: &LifecycleManager, name: &str) {
        fs::write(manager.pending_path(name), b"{}").unwrap();
    }

    #[test]
    fn test_promote_uses_canonical_name() {
        let (tmp, manager) = fixture();
        seed(&manager, "upload-7.json");
        manager.promote("upload-7.json", "10-0-0-5_14567_1700000000.json").unwrap();
        assert!(!manager.pending_path("upload-7.json").exists());
        assert!(tmp
            .path()
            .join("processed/10-0-0-5_14567_1700000000.json")
            .exists());
    }

    #[test]
    fn test_promote_missing_source_is_not_found() {
        let (_tmp, manager) = fixture();
        let err = manager.promote("ghost.json", "canonical.json").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn test_demote_keeps_original_name() {
        let (tmp, manager) = fixture();
        seed(&manager, "upload-7.json");
        manager.demote("upload-7.json").unwrap();
        assert!(tmp.path().join("failed/upload-7.json").exists());
    }

    #[test]
    fn test_discard_removes_pending_file() {
        let (_tmp, manager) = fixture();
        seed(&manager, "upload-7.json");
        manager.discard("upload-7.json").unwrap();
        assert!(!manager.pending_path("upload-7.json").exists());
        let err = manager.discard("upload-7.json").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn test_remove_failed_tolerates_missing_file() {
        let (tmp, manager) = fixture();
        assert!(!manager.remove_failed("gone.json").unwrap());
        fs::write(tmp.path().join("failed/here.json"), b"{}").unwrap();
        assert!(manager.remove_failed("here.json").unwrap());
    }

    #[test]
    fn test_path_escaping_names_are_rejected() {
        let (_tmp, manager) = fixture();
        assert!(manager.demote("../escape.json").is_err());
        assert!(manager.discard("..").is_err());
    }
}
