//! Plugin-based provider registry
//!
//! The registry maps backend names to factories so the daemon can build its
//! collaborators from configuration without hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnsync_core::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! dnsync_provider_lexicon::register(&registry);
//! dnsync_ip_http::register(&registry);
//!
//! let provider = registry.create_provider(&config.provider)?;
//! let source = registry.create_value_source(&config.value, config.record.record_type)?;
//! ```
//!
//! ## Registration
//!
//! Plugin crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("lexicon", Box::new(LexiconFactory));
//! }
//! ```

use crate::config::{ProviderConfig, RecordType, ValueConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory, StaticValue, ValueSource, ValueSourceFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry key of the built-in static value source
pub const STATIC_VALUE_SOURCE: &str = "static";

/// Registry key of the public-IP value source
pub const PUBLIC_IP_VALUE_SOURCE: &str = "public_ip";

/// Provider registry for plugin-based construction
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
pub struct ProviderRegistry {
    /// Registered DNS provider factories, keyed by backend name
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered value source factories
    value_sources: RwLock<HashMap<String, Box<dyn ValueSourceFactory>>>,
}

impl ProviderRegistry {
    /// Create a registry with the built-in static value source
    pub fn new() -> Self {
        let registry = Self {
            providers: RwLock::new(HashMap::new()),
            value_sources: RwLock::new(HashMap::new()),
        };
        registry.register_value_source(STATIC_VALUE_SOURCE, Box::new(StaticValueFactory));
        registry
    }

    fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
        lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
        lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a DNS provider factory under a backend name
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        Self::write(&self.providers).insert(name.into(), factory);
    }

    /// Register a value source factory
    pub fn register_value_source(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ValueSourceFactory>,
    ) {
        Self::write(&self.value_sources).insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If the backend is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let backend = config.backend_name();
        let providers = Self::read(&self.providers);

        let factory = providers
            .get(backend)
            .ok_or_else(|| Error::config(format!("Unknown provider backend: {}", backend)))?;

        factory.create(config)
    }

    /// Create a value source from configuration
    pub fn create_value_source(
        &self,
        config: &ValueConfig,
        record_type: RecordType,
    ) -> Result<Box<dyn ValueSource>> {
        let source_type = match config {
            ValueConfig::Static { .. } => STATIC_VALUE_SOURCE,
            ValueConfig::PublicIp { .. } => PUBLIC_IP_VALUE_SOURCE,
        };

        let sources = Self::read(&self.value_sources);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown value source type: {}", source_type)))?;

        factory.create(config, record_type)
    }

    /// List all registered provider backends
    pub fn list_providers(&self) -> Vec<String> {
        Self::read(&self.providers).keys().cloned().collect()
    }

    /// List all registered value sources
    pub fn list_value_sources(&self) -> Vec<String> {
        Self::read(&self.value_sources).keys().cloned().collect()
    }

    /// Check if a provider backend is registered
    pub fn has_provider(&self, name: &str) -> bool {
        Self::read(&self.providers).contains_key(name)
    }

    /// Check if a value source is registered
    pub fn has_value_source(&self, name: &str) -> bool {
        Self::read(&self.value_sources).contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for [`StaticValue`]
struct StaticValueFactory;

impl ValueSourceFactory for StaticValueFactory {
    fn create(&self, config: &ValueConfig, _record_type: RecordType) -> Result<Box<dyn ValueSource>> {
        match config {
            ValueConfig::Static { content } => Ok(Box::new(StaticValue::new(content.clone()))),
            _ => Err(Error::config("Invalid config for static value source")),
        }
    }
}
