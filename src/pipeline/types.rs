use crate::decode::DecodeError;
use crate::report::IncompleteData;
use thiserror::Error;

/// Everything that can go wrong while processing a snapshot.
///
/// Decode and incomplete-data failures occur before a server is resolved and
/// are never recorded against one. `AlreadyProcessed` is deliberately not an
/// error; it is a success-shaped [`ProcessOutcome`] variant.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The file could not be decoded as JSON; carries the classified fault.
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// A required snapshot field is missing or malformed.
    #[error("{0}")]
    Incomplete(#[from] IncompleteData),

    /// The reporting server may not submit rounds automatically.
    #[error("Server is not authorized to submit snapshots")]
    Unauthorized {
        /// Resolved server id, 0 when authorization never vouched for one.
        server_id: i32,
    },

    /// The stats store rejected a read or write.
    #[error("Stats store operation failed: {0}")]
    Persistence(anyhow::Error),

    /// A lifecycle move or delete failed.
    #[error("File operation failed: {0}")]
    FileSystem(anyhow::Error),

    /// The named pending snapshot does not exist (already moved or deleted).
    #[error("Pending snapshot not found: {0}")]
    NotFound(String),
}

/// Result of one successful processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The round was committed; the file should be promoted under the
    /// snapshot's canonical filename.
    Processed {
        /// Canonical destination filename derived from content.
        source_filename: String,
    },
    /// The round was already committed earlier; nothing was written.
    AlreadyProcessed {
        /// Canonical destination filename derived from content.
        source_filename: String,
    },
}

/// Operator-visible result of an action: a success flag plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
