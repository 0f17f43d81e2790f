//! Error types for record encoding and decoding.

use std::io;
use thiserror::Error;

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors produced by the record codec and the streaming reader
#[derive(Debug, Error)]
pub enum RecordError {
    /// Underlying byte source failed while reading a record
    #[error("I/O error while reading record: {0}")]
    Io(#[from] io::Error),

    /// Keys must be non-empty
    #[error("record key is empty")]
    EmptyKey,

    /// Key length does not fit in the 32-bit length field
    #[error("record key of {len} bytes exceeds the encodable maximum")]
    KeyTooLarge { len: usize },

    /// Value length does not fit in the 32-bit length field
    #[error("record value of {len} bytes exceeds the encodable maximum")]
    ValueTooLarge { len: usize },

    /// End of input struck inside a record: a torn write.
    ///
    /// This is distinct from clean end-of-stream at a record boundary,
    /// which readers report as `Ok(None)`.
    #[error("truncated record at offset {offset}: incomplete {section}")]
    Truncated { offset: u64, section: &'static str },

    /// Key or value bytes are not valid UTF-8
    #[error("record at offset {offset} holds invalid UTF-8 in its {section}")]
    InvalidUtf8 { offset: u64, section: &'static str },
}

impl RecordError {
    /// Whether this error marks a torn record (crash mid-append)
    /// rather than an encoding or I/O failure.
    pub fn is_truncation(&self) -> bool {
        matches!(self, RecordError::Truncated { .. })
    }
}
