//! Record subsystem: the binary record codec and the streaming reader.
//!
//! A record is the atomic unit of mutation. The same fixed layout is
//! written to both the write-ahead log and the main store file, so any
//! encoded record can be transplanted between the two without
//! re-encoding.
//!
//! # Design Principles
//!
//! - Records are immutable once written; updates and deletes append
//!   new records for the same key
//! - Byte-exact layout: no per-record header, checksum, or footer
//! - Clean end-of-stream is never conflated with a torn record

mod codec;
mod errors;
mod reader;

pub use codec::{Record, HEADER_LEN};
pub use errors::{RecordError, RecordResult};
pub use reader::{RecordReader, Records};
