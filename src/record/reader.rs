//! Streaming record reader over any byte source.
//!
//! Drives the codec against an `io::Read`, tracking the running byte
//! offset by the exact size of each decoded record. Three outcomes per
//! read:
//!
//! - `Ok(Some(record))` — one record, offset advanced
//! - `Ok(None)` — clean end-of-stream at a record boundary
//! - `Err(..)` — torn record (EOF mid-record) or I/O failure
//!
//! The distinction between the last two matters: a torn record marks a
//! crash mid-append and callers decide whether that is fatal (main
//! store file) or the discardable tail of the WAL.

use std::io::{self, Read};

use super::codec::{Record, HEADER_LEN};
use super::errors::{RecordError, RecordResult};

/// Width of the value-length field that follows the key bytes.
const LEN_FIELD: usize = 4;

/// Sequential record decoder with byte-accurate offset tracking.
pub struct RecordReader<R: Read> {
    inner: R,
    offset: u64,
}

impl<R: Read> RecordReader<R> {
    /// Wraps a byte source positioned at a record boundary.
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Byte offset of the next record boundary.
    ///
    /// Calling this before `read_next` yields the offset of the record
    /// about to be read; after, the offset one past it.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads exactly one record.
    ///
    /// # Errors
    ///
    /// `RecordError::Truncated` if the source ends inside a record,
    /// `RecordError::Io` if the source fails outright.
    pub fn read_next(&mut self) -> RecordResult<Option<Record>> {
        let mut header = [0u8; HEADER_LEN];
        let n = read_full(&mut self.inner, &mut header)?;
        if n == 0 {
            // Zero bytes at a record boundary: normal termination.
            return Ok(None);
        }
        if n < HEADER_LEN {
            return Err(RecordError::Truncated {
                offset: self.offset,
                section: "record header",
            });
        }

        let deleted = header[0] != 0;
        let key_len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if key_len == 0 {
            // No writer emits empty keys; a zeroed region is not a
            // record.
            return Err(RecordError::EmptyKey);
        }

        let key_buf = read_capped(&mut self.inner, key_len)?;
        if key_buf.len() < key_len {
            return Err(RecordError::Truncated {
                offset: self.offset,
                section: "key bytes",
            });
        }

        let mut val_len_buf = [0u8; LEN_FIELD];
        if read_full(&mut self.inner, &mut val_len_buf)? < LEN_FIELD {
            return Err(RecordError::Truncated {
                offset: self.offset,
                section: "value length",
            });
        }
        let val_len = u32::from_le_bytes(val_len_buf) as usize;

        let val_buf = read_capped(&mut self.inner, val_len)?;
        if val_buf.len() < val_len {
            return Err(RecordError::Truncated {
                offset: self.offset,
                section: "value bytes",
            });
        }

        let key = String::from_utf8(key_buf).map_err(|_| RecordError::InvalidUtf8 {
            offset: self.offset,
            section: "key",
        })?;
        let value = String::from_utf8(val_buf).map_err(|_| RecordError::InvalidUtf8 {
            offset: self.offset,
            section: "value",
        })?;

        self.offset += (HEADER_LEN + key_len + LEN_FIELD + val_len) as u64;

        Ok(Some(Record {
            key,
            value,
            deleted,
        }))
    }
}

/// Upper bound on a single buffer growth step. Declared lengths come
/// from untrusted bytes, so a corrupt length field must not demand
/// gigabytes of allocation before the truncation is noticed.
const READ_CHUNK: usize = 64 * 1024;

/// Reads up to `len` bytes, growing the buffer chunk by chunk.
///
/// A result shorter than `len` means EOF; the caller decides whether
/// that is a torn record.
fn read_capped<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(READ_CHUNK));
    while buf.len() < len {
        let chunk = (len - buf.len()).min(READ_CHUNK);
        let start = buf.len();
        buf.resize(start + chunk, 0);
        let n = read_full(reader, &mut buf[start..])?;
        buf.truncate(start + n);
        if n < chunk {
            break;
        }
    }
    Ok(buf)
}

/// Fills `buf` as far as the source allows.
///
/// Returns the number of bytes read; short counts mean EOF. Transient
/// interruptions are retried, all other I/O errors propagate.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Iterator adapter over a `RecordReader`.
///
/// Lazy and finite: stops at clean end-of-stream, or on the first
/// error, which is retained for inspection via [`Records::into_error`].
pub struct Records<R: Read> {
    reader: RecordReader<R>,
    error: Option<RecordError>,
}

impl<R: Read> Records<R> {
    /// Returns the error that terminated iteration, if any.
    pub fn error(&self) -> Option<&RecordError> {
        self.error.as_ref()
    }

    /// Consumes the iterator, yielding the terminating error if any.
    pub fn into_error(self) -> Option<RecordError> {
        self.error
    }

    /// Byte offset of the next record boundary.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }
}

impl<R: Read> Iterator for Records<R> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        match self.reader.read_next() {
            Ok(Some(record)) => Some(record),
            Ok(None) => None,
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

impl<R: Read> IntoIterator for RecordReader<R> {
    type Item = Record;
    type IntoIter = Records<R>;

    fn into_iter(self) -> Self::IntoIter {
        Records {
            reader: self,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_all(records: &[Record]) -> Vec<u8> {
        let mut buf = Vec::new();
        for record in records {
            buf.extend_from_slice(&record.encode().unwrap());
        }
        buf
    }

    #[test]
    fn test_empty_stream_is_clean_eof() {
        let mut reader = RecordReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_next().unwrap().is_none());
        assert_eq!(reader.offset(), 0);
    }

    #[test]
    fn test_reads_records_in_order() {
        let records = vec![
            Record::live("alpha", "one"),
            Record::tombstone("alpha"),
            Record::live("beta", "two"),
        ];
        let mut reader = RecordReader::new(Cursor::new(encode_all(&records)));

        for expected in &records {
            assert_eq!(reader.read_next().unwrap().as_ref(), Some(expected));
        }
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_offset_advances_by_exact_encoded_size() {
        let first = Record::live("alpha", "one");
        let second = Record::live("beta", "two");
        let mut reader = RecordReader::new(Cursor::new(encode_all(&[
            first.clone(),
            second.clone(),
        ])));

        assert_eq!(reader.offset(), 0);
        reader.read_next().unwrap();
        assert_eq!(reader.offset(), first.encoded_len() as u64);
        reader.read_next().unwrap();
        assert_eq!(
            reader.offset(),
            (first.encoded_len() + second.encoded_len()) as u64
        );
    }

    #[test]
    fn test_torn_record_is_an_error_not_eof() {
        let mut bytes = encode_all(&[Record::live("alpha", "one")]);
        bytes.truncate(bytes.len() - 2);

        let mut reader = RecordReader::new(Cursor::new(bytes));
        let err = reader.read_next().unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_torn_record_after_complete_records() {
        let complete = Record::live("alpha", "one");
        let mut bytes = encode_all(&[complete.clone()]);
        let partial = Record::live("beta", "two").encode().unwrap();
        bytes.extend_from_slice(&partial[..3]); // header cut short

        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_next().unwrap(), Some(complete.clone()));

        let err = reader.read_next().unwrap_err();
        assert!(err.is_truncation());
        // Offset still points at the boundary before the torn tail.
        assert_eq!(reader.offset(), complete.encoded_len() as u64);
    }

    #[test]
    fn test_zeroed_bytes_are_not_a_record() {
        let mut reader = RecordReader::new(Cursor::new(vec![0u8; 32]));
        let err = reader.read_next().unwrap_err();
        assert!(matches!(err, RecordError::EmptyKey));
        assert!(!err.is_truncation());
    }

    #[test]
    fn test_huge_declared_key_length_is_truncation() {
        // Header claims a 4 GiB key; only a few bytes follow. The read
        // must hit EOF and report a torn record, not fill the claim.
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(b"short");

        let mut reader = RecordReader::new(Cursor::new(bytes));
        let err = reader.read_next().unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_record_larger_than_one_chunk() {
        let record = Record::live("big", "v".repeat(READ_CHUNK * 2 + 17));
        let mut reader = RecordReader::new(Cursor::new(record.encode().unwrap()));

        assert_eq!(reader.read_next().unwrap(), Some(record));
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_iterator_yields_all_records() {
        let records = vec![Record::live("a", "1"), Record::live("b", "2")];
        let reader = RecordReader::new(Cursor::new(encode_all(&records)));

        let collected: Vec<_> = reader.into_iter().collect();
        assert_eq!(collected, records);
    }

    #[test]
    fn test_iterator_captures_terminating_error() {
        let mut bytes = encode_all(&[Record::live("a", "1")]);
        bytes.push(1); // lone flag byte, torn header

        let mut iter = RecordReader::new(Cursor::new(bytes)).into_iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.into_error().unwrap().is_truncation());
    }

    #[test]
    fn test_restartable_over_same_bytes() {
        let bytes = encode_all(&[Record::live("a", "1"), Record::live("b", "2")]);

        let first_pass: Vec<_> = RecordReader::new(Cursor::new(bytes.clone()))
            .into_iter()
            .collect();
        let second_pass: Vec<_> = RecordReader::new(Cursor::new(bytes)).into_iter().collect();

        assert_eq!(first_pass, second_pass);
    }
}
