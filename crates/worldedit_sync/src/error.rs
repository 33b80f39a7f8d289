//! Error types for remote synchronization.

use thiserror::Error;
use worldedit_world::WorldError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while shipping history to the remote store.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote store answered with a non-success status.
    #[error("remote rejected batch with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Invalid synchronizer configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] WorldError),

    /// The outbound queue has shut down.
    #[error("upload queue closed")]
    QueueClosed,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// Server-side failures (5xx) are retried; a 4xx means the batch itself
    /// is bad and resending it cannot help.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
