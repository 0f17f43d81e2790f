//! Record type and its fixed binary layout.
//!
//! The on-disk format, in order, little-endian:
//!
//! ```text
//! +-----------------+
//! | Tombstone Flag  | (u8: 0 = live, 1 = deleted)
//! +-----------------+
//! | Key Length      | (u32 LE)
//! +-----------------+
//! | Key Bytes       |
//! +-----------------+
//! | Value Length    | (u32 LE)
//! +-----------------+
//! | Value Bytes     |
//! +-----------------+
//! ```
//!
//! Total encoded size = 1 + 4 + key_len + 4 + val_len. The layout is
//! shared verbatim by the WAL and the main store file.

use super::errors::{RecordError, RecordResult};

/// Flag byte + key length field. A reader that gets zero bytes here is
/// at a clean record boundary; anything short of it is a torn record.
pub const HEADER_LEN: usize = 1 + 4;

/// Width of each length field.
const LEN_FIELD: usize = 4;

/// A single key-value mutation, live or tombstone.
///
/// Records are immutable once written. An update appends a new live
/// record for the key; a delete appends a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Key, non-empty
    pub key: String,
    /// Value; empty and meaningless for tombstones
    pub value: String,
    /// Tombstone marker
    pub deleted: bool,
}

impl Record {
    /// Creates a live record.
    pub fn live(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            deleted: false,
        }
    }

    /// Creates a tombstone for a deleted key.
    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            deleted: true,
        }
    }

    /// Exact size of this record once encoded.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.key.len() + LEN_FIELD + self.value.len()
    }

    /// Serializes the record to its binary layout.
    ///
    /// # Errors
    ///
    /// - `RecordError::EmptyKey` — keys must be non-empty
    /// - `RecordError::KeyTooLarge` / `RecordError::ValueTooLarge` —
    ///   the length does not fit in the u32 length field
    pub fn encode(&self) -> RecordResult<Vec<u8>> {
        if self.key.is_empty() {
            return Err(RecordError::EmptyKey);
        }
        if self.key.len() > u32::MAX as usize {
            return Err(RecordError::KeyTooLarge {
                len: self.key.len(),
            });
        }
        if self.value.len() > u32::MAX as usize {
            return Err(RecordError::ValueTooLarge {
                len: self.value.len(),
            });
        }

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(u8::from(self.deleted));
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.value.as_bytes());

        Ok(buf)
    }

    /// Deserializes one record from the start of `data`.
    ///
    /// Returns the record and the exact number of bytes consumed, so
    /// callers can keep byte-accurate offset bookkeeping.
    ///
    /// # Errors
    ///
    /// `RecordError::Truncated` when fewer bytes are available than the
    /// declared lengths require; `RecordError::InvalidUtf8` when the
    /// key or value bytes are not valid UTF-8; `RecordError::EmptyKey`
    /// when the declared key length is zero — no writer produces such a
    /// record, so a zeroed region never decodes as one.
    pub fn decode(data: &[u8]) -> RecordResult<(Self, usize)> {
        if data.len() < HEADER_LEN {
            return Err(RecordError::Truncated {
                offset: data.len() as u64,
                section: "record header",
            });
        }

        let deleted = data[0] != 0;
        let key_len = u32::from_le_bytes([data[1], data[2], data[3], data[4]]) as usize;
        if key_len == 0 {
            return Err(RecordError::EmptyKey);
        }

        let key_end = HEADER_LEN + key_len;
        if data.len() < key_end {
            return Err(RecordError::Truncated {
                offset: data.len() as u64,
                section: "key bytes",
            });
        }

        let val_len_end = key_end + LEN_FIELD;
        if data.len() < val_len_end {
            return Err(RecordError::Truncated {
                offset: data.len() as u64,
                section: "value length",
            });
        }
        let val_len = u32::from_le_bytes([
            data[key_end],
            data[key_end + 1],
            data[key_end + 2],
            data[key_end + 3],
        ]) as usize;

        let val_end = val_len_end + val_len;
        if data.len() < val_end {
            return Err(RecordError::Truncated {
                offset: data.len() as u64,
                section: "value bytes",
            });
        }

        let key = std::str::from_utf8(&data[HEADER_LEN..key_end])
            .map_err(|_| RecordError::InvalidUtf8 {
                offset: HEADER_LEN as u64,
                section: "key",
            })?
            .to_owned();
        let value = std::str::from_utf8(&data[val_len_end..val_end])
            .map_err(|_| RecordError::InvalidUtf8 {
                offset: val_len_end as u64,
                section: "value",
            })?
            .to_owned();

        Ok((
            Self {
                key,
                value,
                deleted,
            },
            val_end,
        ))
    }
}
