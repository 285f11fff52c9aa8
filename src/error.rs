use std::io;
use std::path::PathBuf;

/// Errors surfaced by the workflow core.
///
/// The taxonomy mirrors how each failure is recovered:
/// - `Validation` is re-prompted locally and never changes workflow state
/// - `Capture` and `SaveFailed` drive the machine into its error state with
///   the session preserved for an operator-initiated retry
/// - `StorageUnavailable` is fatal for the internal target and merely
///   degrades the save when it is the USB backup that vanished
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("camera capture failed: {0}")]
    Capture(String),

    #[error("storage target unavailable: {}", .0.display())]
    StorageUnavailable(PathBuf),

    #[error("failed to save {}: {source}", .path.display())]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Shorthand for validation failures built from formatted strings.
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
