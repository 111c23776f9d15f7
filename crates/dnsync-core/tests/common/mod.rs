//! Test doubles and common utilities for scheduler contract tests
//!
//! These doubles stand in for the provider so the contracts can be checked
//! on a paused tokio clock without any I/O.

#![allow(dead_code)]

use async_trait::async_trait;
use dnsync_core::error::{Error, Result};
use dnsync_core::sink::MemorySyncLog;
use dnsync_core::traits::{DnsProvider, ProviderRecord, StaticValue, UpdateOutcome};
use dnsync_core::{RecordSpec, RecordType, Scheduler, Synchronizer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Shared observations of a [`CountingProvider`]
#[derive(Default)]
pub struct CallTracker {
    calls: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// (start, end) of every apply() call
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl CallTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of apply() calls started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of apply() calls that ran to completion
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Highest number of apply() calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Start and end instants of every completed apply() call
    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        self.spans.lock().unwrap().clone()
    }
}

/// A provider that succeeds after an optional delay and records timing
pub struct CountingProvider {
    tracker: Arc<CallTracker>,
    delay: Duration,
}

impl CountingProvider {
    pub fn new(tracker: Arc<CallTracker>) -> Self {
        Self {
            tracker,
            delay: Duration::ZERO,
        }
    }

    /// Make every apply() take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl DnsProvider for CountingProvider {
    async fn apply(&self, _record: &RecordSpec, value: &str) -> Result<UpdateOutcome> {
        let start = Instant::now();
        self.tracker.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.tracker.completed.fetch_add(1, Ordering::SeqCst);
        self.tracker.spans.lock().unwrap().push((start, Instant::now()));

        Ok(UpdateOutcome::Unchanged {
            content: value.to_string(),
        })
    }

    async fn list(&self, _record: &RecordSpec) -> Result<Vec<ProviderRecord>> {
        Ok(Vec::new())
    }

    fn provider_name(&self) -> &str {
        "counting"
    }
}

/// A provider that fails the first `failures` calls with `message`, then succeeds
pub struct FailingProvider {
    message: String,
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl FailingProvider {
    /// Fail every call
    pub fn always(message: impl Into<String>) -> Self {
        Self::times(message, usize::MAX)
    }

    /// Fail the first `failures` calls
    pub fn times(message: impl Into<String>, failures: usize) -> Self {
        Self {
            message: message.into(),
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl DnsProvider for FailingProvider {
    async fn apply(&self, _record: &RecordSpec, value: &str) -> Result<UpdateOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(Error::Other(self.message.clone()));
        }

        Ok(UpdateOutcome::Updated {
            previous: None,
            content: value.to_string(),
        })
    }

    async fn list(&self, _record: &RecordSpec) -> Result<Vec<ProviderRecord>> {
        Ok(Vec::new())
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

/// The record every contract test synchronizes
pub fn test_record() -> RecordSpec {
    RecordSpec::new("example.com", "home.example.com", RecordType::A)
}

/// Build a scheduler around `provider` with a static value
pub fn scheduler_with(
    provider: Box<dyn DnsProvider>,
    interval: Duration,
    log: &MemorySyncLog,
) -> Scheduler {
    let synchronizer = Synchronizer::new(
        provider,
        Box::new(StaticValue::new("192.0.2.10")),
        test_record(),
    );

    Scheduler::new(synchronizer, Arc::new(log.clone()), interval)
        .expect("scheduler construction succeeds")
}

/// A shutdown future that resolves after `after` on the tokio clock
pub async fn shutdown_after(after: Duration) {
    tokio::time::sleep(after).await;
}
