//! Core traits for the synchronizer
//!
//! This module defines the seams between the scheduler and the outside world.
//!
//! - [`DnsProvider`]: Apply record updates through a provider
//! - [`ValueSource`]: Resolve the value a record should hold
//! - [`SyncLog`]: Record the outcome of each attempt

pub mod dns_provider;
pub mod sync_log;
pub mod value_source;

pub use dns_provider::{DnsProvider, DnsProviderFactory, ProviderRecord, UpdateOutcome};
pub use sync_log::SyncLog;
pub use value_source::{StaticValue, ValueSource, ValueSourceFactory};
