//! Unified error type for blocktrack.
//!
//! Internal layers keep their own error enums; this is the one type
//! callers see at the facade.

use blocktrack_core::ConfigError;
use blocktrack_durability::CheckpointError;
use thiserror::Error;

/// All blocktrack errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Tracking is disabled; change queries cannot be answered. Check
    /// [`Tracker::is_enabled`](crate::Tracker::is_enabled) first.
    #[error("changed-block tracking is disabled")]
    Disabled,

    /// Invalid configuration, surfaced at open time.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O failure during checkpoint, load, or artifact removal.
    /// Transient for checkpoints (the next cycle retries); fatal for
    /// startup loads.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A checkpoint cycle failed for a non-I/O reason.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

/// Result type for blocktrack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<CheckpointError> for Error {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::Io(io) => Error::Io(io),
            other => Error::Checkpoint(other.to_string()),
        }
    }
}

impl Error {
    /// True when the operation may succeed if simply retried later
    /// (checkpoint-cycle failures).
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Checkpoint(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_io_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err: Error = CheckpointError::Io(io).into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_disabled_is_not_transient() {
        assert!(!Error::Disabled.is_transient());
    }
}
