// # dnsync-core
//
// Core library for the periodic DNS record synchronizer.
//
// ## Architecture Overview
//
// This library provides everything except the provider-specific plumbing:
// - **SyncConfig**: Environment-driven configuration, validated at startup
// - **DnsProvider**: Trait for applying record updates through a provider
// - **ValueSource**: Trait for resolving the value a record should hold
// - **SyncLog**: Trait for the sink every attempt outcome is written to
// - **Synchronizer**: Runs one attempt and folds it into a SyncResult
// - **Scheduler**: Single timer loop driving the synchronizer
// - **ProviderRegistry**: Plugin-based registry for providers and sources
//
// ## Design Principles
//
// 1. **One timer**: Attempts never overlap; a slow attempt delays the next tick
// 2. **No hidden retries**: The next tick is the only retry
// 3. **Fail fast on config**: Bad configuration stops the process before the first tick
// 4. **Failures are data**: A failed attempt is logged, never propagated
// 5. **Library-First**: The daemon is a thin wrapper over this crate

pub mod config;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod synchronizer;
pub mod traits;

// Re-export core types for convenience
pub use config::{
    Backend, Credentials, LogFormat, LogLevel, ProviderConfig, RecordSpec, RecordType,
    SyncConfig, ValueConfig,
};
pub use error::{Error, Result, SyncFailure};
pub use registry::ProviderRegistry;
pub use scheduler::Scheduler;
pub use sink::{MemorySyncLog, TracingSyncLog};
pub use synchronizer::{SyncResult, SyncStatus, Synchronizer};
pub use traits::{DnsProvider, ProviderRecord, StaticValue, SyncLog, UpdateOutcome, ValueSource};
