//! Error types for the store engine: the error surface application
//! code sees.

use std::io;
use thiserror::Error;

use crate::record::RecordError;
use crate::wal::WalError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Unified error for the public store API
#[derive(Debug, Error)]
pub enum StoreError {
    /// An underlying filesystem operation failed. Never retried; the
    /// store stays in its last consistent state.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `delete` on a key that is not present. An expected outcome, not
    /// a crash condition.
    #[error("key not found")]
    KeyNotFound,

    /// The main store file holds a record that cannot be fully read.
    /// Fatal at startup; the main store is assumed never to be torn
    /// except by failures outside this system's control.
    #[error("main store file corrupt at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// Record encoding or decoding failed
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The write-ahead log failed
    #[error(transparent)]
    Wal(#[from] WalError),

    /// A lock was poisoned by a panicking operation
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Builds a corruption error for a record at `offset`.
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            offset,
            reason: reason.into(),
        }
    }
}
