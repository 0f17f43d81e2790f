//! Observability: the structured logger the engine reports recovery
//! and compaction events through.

mod logger;

pub use logger::{Logger, Severity};
