//! One synchronization attempt
//!
//! The [`Synchronizer`] resolves the value the record should hold and hands
//! it to the provider, exactly once. Whatever happens is folded into a
//! [`SyncResult`]; nothing is retried and nothing is propagated.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::RecordSpec;
use crate::error::SyncFailure;
use crate::traits::{DnsProvider, UpdateOutcome, ValueSource};

/// Status of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failure,
}

/// Outcome of one synchronization attempt
///
/// Created by the synchronizer and consumed immediately by the log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Success or failure
    pub status: SyncStatus,
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
    /// Provider the attempt went to
    pub provider: String,
    /// Record the attempt was about (`name TYPE`)
    pub record: String,
    /// What the provider did, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<UpdateOutcome>,
    /// Error message, on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncResult {
    /// A successful attempt, timestamped now
    pub fn success(
        provider: impl Into<String>,
        record: impl Into<String>,
        outcome: UpdateOutcome,
    ) -> Self {
        Self {
            status: SyncStatus::Success,
            timestamp: Utc::now(),
            provider: provider.into(),
            record: record.into(),
            outcome: Some(outcome),
            message: None,
        }
    }

    /// A failed attempt, timestamped now
    pub fn failure(
        provider: impl Into<String>,
        record: impl Into<String>,
        failure: SyncFailure,
    ) -> Self {
        Self {
            status: SyncStatus::Failure,
            timestamp: Utc::now(),
            provider: provider.into(),
            record: record.into(),
            outcome: None,
            message: Some(failure.message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }

    /// The failure carried by this result, if any
    pub fn failure_reason(&self) -> Option<SyncFailure> {
        match self.status {
            SyncStatus::Success => None,
            SyncStatus::Failure => Some(SyncFailure::new(
                self.message.clone().unwrap_or_default(),
            )),
        }
    }
}

/// Runs single synchronization attempts for one record
pub struct Synchronizer {
    provider: Box<dyn DnsProvider>,
    source: Box<dyn ValueSource>,
    record: RecordSpec,
}

impl Synchronizer {
    pub fn new(
        provider: Box<dyn DnsProvider>,
        source: Box<dyn ValueSource>,
        record: RecordSpec,
    ) -> Self {
        Self {
            provider,
            source,
            record,
        }
    }

    /// The record this synchronizer manages
    pub fn record(&self) -> &RecordSpec {
        &self.record
    }

    /// Name of the provider behind this synchronizer
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Run one attempt and report its outcome
    pub async fn sync(&self) -> SyncResult {
        let provider = self.provider.provider_name();
        let record = self.record.to_string();

        match self.attempt().await {
            Ok(outcome) => SyncResult::success(provider, record, outcome),
            Err(failure) => SyncResult::failure(provider, record, failure),
        }
    }

    async fn attempt(&self) -> Result<UpdateOutcome, SyncFailure> {
        let value = self.source.current().await.map_err(|e| {
            SyncFailure::new(format!(
                "Could not resolve value from {}: {}",
                self.source.describe(),
                e
            ))
        })?;

        debug!("Applying {} -> {}", self.record, value);

        self.provider
            .apply(&self.record, &value)
            .await
            .map_err(SyncFailure::from)
    }
}
