//! Error types for the write-ahead log.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::record::RecordError;

/// Result type for WAL operations
pub type WalResult<T> = Result<T, WalError>;

/// Failures of the write-ahead log file
#[derive(Debug, Error)]
pub enum WalError {
    /// The WAL file could not be created or opened
    #[error("failed to open WAL file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A record write did not complete
    #[error("WAL append failed: {0}")]
    Append(#[source] io::Error),

    /// fsync after an append failed; the record cannot be considered
    /// durable
    #[error("WAL fsync failed: {0}")]
    Sync(#[source] io::Error),

    /// Resetting the WAL to empty failed
    #[error("WAL truncation failed: {0}")]
    Truncate(#[source] io::Error),

    /// The record could not be encoded for appending
    #[error(transparent)]
    Record(#[from] RecordError),
}
