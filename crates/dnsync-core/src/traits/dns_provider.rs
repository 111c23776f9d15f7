// # DNS Provider Trait
//
// Defines the capability "apply record update for (name, type, value) under
// the configured credentials". The provider owns talking to the DNS host;
// the scheduler owns timing. Neither retries.
//
// ## Implementations
//
// - lexicon CLI delegation: `dnsync-provider-lexicon` crate
// - Dry run (log only): `dnsync-provider-lexicon` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::{DnsProvider, RecordSpec, RecordType};
//
// let record = RecordSpec::new("example.com", "home.example.com", RecordType::A);
// let outcome = provider.apply(&record, "192.0.2.10").await?;
// ```

use crate::config::RecordSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a successful record update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Record did not exist and was created
    Created {
        /// The new value
        content: String,
    },
    /// Record existed with another value and was changed
    Updated {
        /// The value before the change, when the provider reported it
        previous: Option<String>,
        /// The new value
        content: String,
    },
    /// Record already had the requested value (no write)
    Unchanged {
        /// The current value
        content: String,
    },
}

impl UpdateOutcome {
    /// Short label for log lines
    pub fn label(&self) -> &'static str {
        match self {
            UpdateOutcome::Created { .. } => "created",
            UpdateOutcome::Updated { .. } => "updated",
            UpdateOutcome::Unchanged { .. } => "unchanged",
        }
    }

    /// The value the record holds after the operation
    pub fn content(&self) -> &str {
        match self {
            UpdateOutcome::Created { content }
            | UpdateOutcome::Updated { content, .. }
            | UpdateOutcome::Unchanged { content } => content,
        }
    }
}

/// A record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Provider-specific identifier
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type, as the provider spells it
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record value
    pub content: String,
    /// Time-to-live, if reported
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// Trait for DNS provider implementations
///
/// A provider executes the update it is asked for and reports what happened.
/// It must not retry, sleep or spawn background work: a failed attempt is
/// returned as an error and the next scheduled tick is the only retry.
///
/// Implementations must be thread-safe and usable across async tasks.
/// Credentials must never appear in logs or error messages.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Make `record` hold `value`
    ///
    /// - No record with that name and type: create it
    /// - A record already holding `value`: [`UpdateOutcome::Unchanged`]
    /// - Otherwise: replace the value
    ///
    /// This method must be idempotent.
    async fn apply(&self, record: &RecordSpec, value: &str) -> Result<UpdateOutcome, crate::Error>;

    /// List the records matching the name and type of `record`
    async fn list(&self, record: &RecordSpec) -> Result<Vec<ProviderRecord>, crate::Error>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
