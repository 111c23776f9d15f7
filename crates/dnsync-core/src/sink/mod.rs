// # Sync Log Implementations
//
// This module provides implementations of the SyncLog trait for
// different sinks.

pub mod memory;
pub mod tracing_log;

pub use memory::MemorySyncLog;
pub use tracing_log::TracingSyncLog;
