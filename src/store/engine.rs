//! Store engine: startup recovery, runtime operations, compaction.
//!
//! # Startup sequence (strict order)
//!
//! 1. Open/create the main store file and the WAL inside the data
//!    directory; any failure is fatal to open
//! 2. Rebuild the index by scanning the main store file from offset 0
//! 3. Compact if the main store file exceeds the configured threshold
//! 4. Replay the WAL into the main store file, discard a torn trailing
//!    record if one exists, sync the store file, truncate the WAL
//!
//! # Write path
//!
//! Log before data: a mutation is appended (and fsynced) to the WAL
//! first, then appended to the main store file, then indexed. If the
//! WAL append fails the main store file is never touched.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::RwLock;

use super::errors::{StoreError, StoreResult};
use super::file::StoreFile;
use super::index::KeyIndex;
use crate::config::StoreConfig;
use crate::observability::{Logger, Severity};
use crate::record::{Record, RecordError, RecordReader};
use crate::wal::Wal;

const STORE_FILENAME: &str = "store.data";
const WAL_FILENAME: &str = "wal.log";
const COMPACT_FILENAME: &str = "store.data.compact";

/// The embedded key-value store.
///
/// # Concurrency
///
/// All state sits behind one `RwLock`. `set`, `delete` and `compact`
/// take the write lock: they mutate the index and the on-disk layout
/// together and must be externally atomic. `get` takes the read lock
/// only — it performs a positioned read at an indexed offset and never
/// touches a shared cursor, so any number of readers may overlap.
#[derive(Debug)]
pub struct Store {
    inner: RwLock<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    config: StoreConfig,
    data: StoreFile,
    wal: Wal,
    index: KeyIndex,
}

impl Store {
    /// Opens (or creates) the store described by `config`, running the
    /// full recovery sequence.
    ///
    /// # Errors
    ///
    /// Any I/O failure, or a torn record in the main store file
    /// (`StoreError::Corrupt`), aborts the open.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let data = StoreFile::open(&config.data_dir.join(STORE_FILENAME))?;
        let wal = Wal::open(&config.data_dir.join(WAL_FILENAME))?;

        let mut inner = StoreInner {
            config,
            data,
            wal,
            index: KeyIndex::new(),
        };

        inner.rebuild_index()?;
        if inner.data.len() > inner.config.compaction_threshold {
            inner.compact()?;
        }
        inner.replay_wal()?;

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Opens the store at `data_dir` with default configuration.
    pub fn open_path(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(StoreConfig::new(data_dir.as_ref()))
    }

    /// Returns the value for `key`, or `None` if the key is absent or
    /// deleted.
    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.read_lock()?;

        let offset = match inner.index.get(key) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let record = inner.data.read_record_at(offset)?;
        if record.deleted {
            // Tombstones are never indexed; treat one here as absence
            // rather than trusting a corrupt index entry.
            return Ok(None);
        }
        Ok(Some(record.value))
    }

    /// Sets `key` to `value`.
    ///
    /// # Errors
    ///
    /// `StoreError::Record` for unencodable keys/values (empty key,
    /// length beyond the 32-bit field); `StoreError::Wal` or
    /// `StoreError::Io` if an append fails. On failure the index is
    /// untouched.
    pub fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let record = Record::live(key, value);
        let bytes = record.encode()?;

        let mut inner = self.write_lock()?;
        inner.wal.append_encoded(&bytes)?;
        let offset = inner.data.append(&bytes)?;
        inner.index.apply(&record, offset);
        Ok(())
    }

    /// Deletes `key`.
    ///
    /// # Errors
    ///
    /// `StoreError::KeyNotFound` if the key is not currently live — an
    /// expected outcome, not a crash condition.
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.write_lock()?;

        if !inner.index.contains(key) {
            return Err(StoreError::KeyNotFound);
        }

        let record = Record::tombstone(key);
        let bytes = record.encode()?;

        inner.wal.append_encoded(&bytes)?;
        let offset = inner.data.append(&bytes)?;
        inner.index.apply(&record, offset);
        Ok(())
    }

    /// Rewrites the main store file to hold only live records,
    /// reclaiming the space of superseded and deleted history.
    pub fn compact(&self) -> StoreResult<()> {
        self.write_lock()?.compact()
    }

    /// Number of live keys.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.index.len())
    }

    /// Whether no keys are live.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_lock()?.index.is_empty())
    }

    /// Closes the store: syncs the main store file, truncates the WAL
    /// (every acknowledged mutation is in the now-durable store file),
    /// and releases both handles.
    ///
    /// Consuming `self` makes double-close unrepresentable. A store
    /// dropped without `close` keeps its WAL, which the next open
    /// replays — slower, never lossy.
    pub fn close(self) -> StoreResult<()> {
        let mut inner = self
            .inner
            .into_inner()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        inner.data.sync()?;
        inner.wal.truncate()?;
        Ok(())
    }

    fn read_lock(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, StoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_lock(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, StoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl StoreInner {
    /// Rebuilds the index by scanning the main store file from offset
    /// 0, applying each record at the offset it was observed at.
    ///
    /// A torn record anywhere in this file is fatal: the main store is
    /// assumed never to be torn except by failures outside the store's
    /// control, and it is not auto-repaired.
    fn rebuild_index(&mut self) -> StoreResult<()> {
        self.index.clear();

        let file = File::open(self.data.path())?;
        let mut reader = RecordReader::new(BufReader::new(file));

        loop {
            let offset = reader.offset();
            match reader.read_next() {
                Ok(Some(record)) => self.index.apply(&record, offset),
                Ok(None) => break,
                Err(RecordError::Truncated { offset, section }) => {
                    return Err(StoreError::corrupt(
                        offset,
                        format!("incomplete {section}"),
                    ));
                }
                Err(RecordError::Io(e)) => return Err(StoreError::Io(e)),
                Err(e) => return Err(StoreError::corrupt(offset, e.to_string())),
            }
        }

        Ok(())
    }

    /// Replays the WAL into the main store file.
    ///
    /// Each replayed record is appended at the current end of the main
    /// store file and indexed at that offset, exactly as a runtime
    /// mutation would be. A torn trailing record marks a crash
    /// mid-append: the partial tail is discarded and everything before
    /// it still counts. Afterwards the store file is synced and the
    /// WAL truncated to empty.
    fn replay_wal(&mut self) -> StoreResult<()> {
        let file = File::open(self.wal.path())?;
        let mut reader = RecordReader::new(BufReader::new(file));

        let mut replayed = 0u64;
        let mut torn_tail = false;

        loop {
            match reader.read_next() {
                Ok(Some(record)) => {
                    let bytes = record.encode()?;
                    let offset = self.data.append(&bytes)?;
                    self.index.apply(&record, offset);
                    replayed += 1;
                }
                Ok(None) => break,
                Err(e) if e.is_truncation() => {
                    // Crash boundary: the append never finished, so the
                    // mutation was never acknowledged. Drop the tail.
                    torn_tail = true;
                    break;
                }
                Err(RecordError::Io(e)) => return Err(StoreError::Io(e)),
                Err(e) => return Err(e.into()),
            }
        }

        if replayed > 0 || torn_tail {
            // The store file must be durable before the WAL forgets.
            self.data.sync()?;
            Logger::log(
                if torn_tail { Severity::Warn } else { Severity::Info },
                "wal_replay",
                &[
                    ("records_replayed", &replayed.to_string()),
                    ("torn_tail_discarded", if torn_tail { "true" } else { "false" }),
                ],
            );
        }

        self.wal.truncate()?;
        Ok(())
    }

    /// Builds a replacement store file holding one live record per
    /// indexed key, installs it via atomic rename, and rebuilds the
    /// index from the new file (every offset has changed).
    ///
    /// Tombstones and superseded versions are unreachable through the
    /// index and are never copied. The WAL is not touched. A crash
    /// before the rename leaves the original file intact.
    fn compact(&mut self) -> StoreResult<()> {
        let bytes_before = self.data.len();
        let replacement_path = self.config.data_dir.join(COMPACT_FILENAME);

        let mut replacement = StoreFile::create(&replacement_path)?;
        for (_key, offset) in self.index.iter() {
            let record = self.data.read_record_at(offset)?;
            if record.deleted {
                // Unreachable through the index; skip rather than
                // carry a stray tombstone into the fresh file.
                continue;
            }
            let bytes = record.encode()?;
            replacement.append(&bytes)?;
        }
        replacement.sync()?;
        drop(replacement);

        self.data.install(&replacement_path)?;
        self.rebuild_index()?;

        Logger::log(
            Severity::Info,
            "compaction",
            &[
                ("bytes_before", &bytes_before.to_string()),
                ("bytes_after", &self.data.len().to_string()),
                ("live_keys", &self.index.len().to_string()),
            ],
        );

        Ok(())
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // Best-effort flush for stores that go out of scope without
        // close. A failure here loses nothing: the WAL still holds
        // every mutation and the next open replays it.
        let _ = self.data.sync();
    }
}
