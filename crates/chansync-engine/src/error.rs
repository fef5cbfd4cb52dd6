//! Engine error types.

use chansync_core::SyncError;
use thiserror::Error;

/// Errors returned by [`crate::EngineHandle`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine loop has stopped.
    #[error("engine is not running")]
    Closed,

    /// The registry rejected the operation before anything was sent.
    #[error(transparent)]
    Rejected(#[from] SyncError),
}
