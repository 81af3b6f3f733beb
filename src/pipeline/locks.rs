use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Per-filename mutual exclusion for accept and delete actions.
///
/// Two concurrent accepts of the same pending filename must not both
/// succeed: the registry hands out one async lock per filename, held across
/// the whole process-and-move sequence, so the loser runs only after the
/// winner's move and observes not-found. Different filenames are fully
/// independent.
#[derive(Debug, Default)]
pub struct FileLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for a filename, created on first use.
    pub fn for_file(&self, filename: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(filename.to_string()).or_default().clone()
    }
}
