//! Store configuration.

use std::path::PathBuf;

/// Main store file size above which startup triggers a compaction.
pub const DEFAULT_COMPACTION_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Configuration for opening a [`Store`](crate::Store).
///
/// The data directory is the single source of truth for every file
/// path the store touches; nothing else names a path.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the main store file and the WAL
    pub data_dir: PathBuf,

    /// Main store file size, in bytes, above which the store compacts
    /// during startup. Checked only at startup.
    pub compaction_threshold: u64,
}

impl StoreConfig {
    /// Configuration for `data_dir` with default tuning.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
        }
    }

    /// Overrides the startup compaction threshold.
    pub fn compaction_threshold(mut self, bytes: u64) -> Self {
        self.compaction_threshold = bytes;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("./data")
    }
}
