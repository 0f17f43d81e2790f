//! Store subsystem: the main store file, the in-memory index, and the
//! engine that orchestrates them.
//!
//! The main store file is the authoritative append-only history of all
//! applied mutations; the index is derived state mapping each live key
//! to the offset of its most recent record, rebuilt from scratch on
//! every open.
//!
//! # Design Principles
//!
//! - Append-only, no in-place updates; compaction rewrites wholesale
//! - Log before data: the WAL sees every mutation first
//! - Positioned reads, never a shared cursor, so readers can run
//!   concurrently
//! - A torn record in the main store file is fatal at startup; the
//!   store does not auto-repair

mod engine;
mod errors;
mod file;
mod index;

pub use engine::Store;
pub use errors::{StoreError, StoreResult};
pub use file::StoreFile;
pub use index::KeyIndex;
