//! Error types for replica synchronization.

use boxgraph_core::{Checksum, CodecError};
use boxgraph_engine::GraphError;
use thiserror::Error;

/// Synchronization failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The mirror graph rejected a task
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// A message could not be decoded
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Mirror content differs from the source
    #[error("checksum mismatch: expected {expected}, actual {actual}")]
    ChecksumMismatch {
        /// Checksum reported by the source
        expected: Checksum,
        /// Checksum of the local mirror
        actual: Checksum,
    },

    /// The other side of the transport is gone
    #[error("peer disconnected")]
    Disconnected,
}

/// Result type for synchronization.
pub type SyncResult<T> = Result<T, SyncError>;
