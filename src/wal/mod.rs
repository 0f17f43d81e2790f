//! Write-Ahead Log subsystem.
//!
//! Every mutation is appended (and fsynced) here before it touches the
//! main store file, so a crash between the two writes can be repaired
//! by replaying the WAL at the next startup.
//!
//! # Design Principles
//!
//! - Durability over throughput: fsync after every append
//! - Append-only during normal operation; read only at startup replay
//! - Truncated to empty only by the engine, only after every record is
//!   confirmed applied (and synced) to the main store file

mod errors;
mod writer;

pub use errors::{WalError, WalResult};
pub use writer::Wal;
