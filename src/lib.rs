//! # tinykv
//!
//! A minimal embedded log-structured key-value store.
//!
//! String keys map to string values. Every mutation is appended to a
//! write-ahead log and fsynced before it touches the main store file,
//! so an acknowledged write survives a crash at any point. Reads are
//! served from an in-memory index of key offsets rebuilt on every
//! open.
//!
//! ## Design Principles
//!
//! - Append-only data files; old versions are reclaimed by compaction,
//!   never overwritten in place
//! - Log before data: the WAL is the durability boundary
//! - Derived state (the index) is always rebuilt, never persisted
//! - Crash recovery is the ordinary startup path, not a special mode
//!
//! ## Example
//!
//! ```no_run
//! use tinykv::Store;
//!
//! let store = Store::open_path("./data")?;
//! store.set("name", "Prashant")?;
//! assert_eq!(store.get("name")?, Some("Prashant".to_string()));
//! store.delete("name")?;
//! store.close()?;
//! # Ok::<(), tinykv::StoreError>(())
//! ```

pub mod config;
pub mod observability;
pub mod record;
pub mod store;
pub mod wal;

pub use config::{StoreConfig, DEFAULT_COMPACTION_THRESHOLD};
pub use record::{Record, RecordError};
pub use store::{Store, StoreError, StoreResult};
pub use wal::{Wal, WalError};
