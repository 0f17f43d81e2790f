//! Main store file: append-only writes, positioned reads, and the
//! atomic replacement used by compaction.
//!
//! Reads take an explicit byte offset and go through a pread-style
//! primitive. Two readers can therefore overlap freely; a seek on a
//! shared cursor could interleave with another reader's read and
//! return the wrong record's bytes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::errors::{StoreError, StoreResult};
use crate::record::{Record, RecordError, HEADER_LEN};

/// Handle on the append-only main store file.
#[derive(Debug)]
pub struct StoreFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl StoreFile {
    /// Opens or creates the store file at `path`, keeping its existing
    /// contents.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
        })
    }

    /// Creates an empty store file at `path`, discarding any leftover
    /// contents (a replacement file from an interrupted compaction).
    pub fn create(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len: 0,
        })
    }

    /// Returns the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file holds no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends encoded record bytes.
    ///
    /// Returns the offset of the record just written: end-of-file
    /// before the write, which is what the index must remember.
    ///
    /// A failed `write_all` can still have landed a prefix of the
    /// record under O_APPEND. The cached length is resynchronized from
    /// the filesystem on that path, so the offsets reported for later
    /// appends keep matching where the bytes actually go.
    pub fn append(&mut self, bytes: &[u8]) -> StoreResult<u64> {
        let offset = self.len;
        if let Err(e) = self.file.write_all(bytes) {
            self.resync_len()?;
            return Err(StoreError::Io(e));
        }
        self.len += bytes.len() as u64;
        Ok(offset)
    }

    /// Re-reads the cached length from file metadata.
    fn resync_len(&mut self) -> StoreResult<()> {
        self.len = self.file.metadata()?.len();
        Ok(())
    }

    /// Reads and decodes exactly one record at `offset`.
    ///
    /// Positioned reads only; the shared cursor is neither consulted
    /// nor moved, so this is safe under a shared lock.
    ///
    /// # Errors
    ///
    /// `StoreError::Corrupt` if the bytes at `offset` do not form a
    /// complete record.
    pub fn read_record_at(&self, offset: u64) -> StoreResult<Record> {
        let mut header = [0u8; HEADER_LEN];
        self.read_exact_at(&mut header, offset)
            .map_err(|e| map_read_err(e, offset, "record header"))?;

        let key_len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as u64;
        let total = HEADER_LEN as u64 + key_len + 4;

        // Value length sits after the key; one more positioned read
        // tells us the full record size.
        let mut val_len_buf = [0u8; 4];
        self.read_exact_at(&mut val_len_buf, offset + HEADER_LEN as u64 + key_len)
            .map_err(|e| map_read_err(e, offset, "value length"))?;
        let val_len = u32::from_le_bytes(val_len_buf) as u64;

        // Length fields are untrusted bytes off disk. Bound the
        // declared record size by what the file actually holds before
        // allocating for it.
        let record_len = total + val_len;
        if record_len > self.len.saturating_sub(offset) {
            return Err(StoreError::corrupt(offset, "record exceeds file length"));
        }

        let mut buf = vec![0u8; record_len as usize];
        self.read_exact_at(&mut buf, offset)
            .map_err(|e| map_read_err(e, offset, "record body"))?;

        let (record, _) = Record::decode(&buf).map_err(|e| match e {
            RecordError::Io(io_err) => StoreError::Io(io_err),
            other => StoreError::corrupt(offset, other.to_string()),
        })?;

        Ok(record)
    }

    /// Flushes file contents to disk.
    pub fn sync(&self) -> StoreResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Atomically replaces this file with a fully-built one.
    ///
    /// The replacement is renamed over the live path (the commit
    /// point), the directory entry is synced, and the handle reopened
    /// on the new contents. A crash before the rename leaves the
    /// original untouched.
    pub fn install(&mut self, replacement: &Path) -> StoreResult<()> {
        fs::rename(replacement, &self.path)?;
        sync_parent_dir(&self.path)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        self.len = file.metadata()?.len();
        self.file = file;
        Ok(())
    }

    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.file.seek_read(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "failed to fill whole buffer",
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Distinguishes running off the end of the file (a bad or stale
/// offset: corruption) from an outright I/O failure.
fn map_read_err(e: io::Error, offset: u64, section: &'static str) -> StoreError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        StoreError::corrupt(offset, format!("incomplete {section}"))
    } else {
        StoreError::Io(e)
    }
}

/// Syncs the directory entry so a rename survives a crash.
fn sync_parent_dir(path: &Path) -> StoreResult<()> {
    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}
