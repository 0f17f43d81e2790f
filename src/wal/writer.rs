//! WAL writer with fsync enforcement.
//!
//! An append is durable only once both the write and the fsync have
//! succeeded; the engine must not touch the main store file before
//! that point.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalResult};
use crate::record::Record;

/// Append-only handle on the WAL file.
///
/// The WAL never needs read access during normal operation; startup
/// replay opens its own sequential reader on the same path.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    /// Opens or creates the WAL file at `path`.
    pub fn open(path: &Path) -> WalResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| WalError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encodes and appends one record, fsyncing before returning.
    ///
    /// # Errors
    ///
    /// - `WalError::Record` if the record cannot be encoded
    /// - `WalError::Append` if the write fails
    /// - `WalError::Sync` if the fsync fails; the record must not be
    ///   treated as durable
    pub fn append(&mut self, record: &Record) -> WalResult<()> {
        let bytes = record.encode()?;
        self.append_encoded(&bytes)
    }

    /// Appends pre-encoded record bytes, fsyncing before returning.
    ///
    /// The record layout is shared verbatim with the main store file,
    /// so the engine encodes each mutation once and hands the same
    /// bytes to both appends.
    pub fn append_encoded(&mut self, bytes: &[u8]) -> WalResult<()> {
        self.file.write_all(bytes).map_err(WalError::Append)?;
        self.file.sync_all().map_err(WalError::Sync)?;
        Ok(())
    }

    /// Resets the WAL to zero length.
    ///
    /// Only the engine calls this, and only after every WAL record has
    /// been applied to the main store file and that file synced.
    pub fn truncate(&mut self) -> WalResult<()> {
        self.file.set_len(0).map_err(WalError::Truncate)?;
        self.file.sync_all().map_err(WalError::Sync)?;
        Ok(())
    }

    /// Flushes pending writes to disk.
    pub fn sync(&self) -> WalResult<()> {
        self.file.sync_all().map_err(WalError::Sync)
    }
}
