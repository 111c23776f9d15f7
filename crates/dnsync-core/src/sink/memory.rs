// # Memory Sync Log
//
// In-memory implementation of SyncLog.
//
// Keeps every recorded result in order. Useful for tests and for embedders
// that want to inspect outcomes after the fact. Nothing survives a restart.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::synchronizer::{SyncResult, SyncStatus};
use crate::traits::SyncLog;

/// In-memory sync log
///
/// Clones share the same underlying buffer, so a test can keep one handle
/// and give another to the scheduler.
///
/// # Example
///
/// ```rust
/// use dnsync_core::sink::MemorySyncLog;
///
/// let log = MemorySyncLog::new();
/// assert!(log.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySyncLog {
    inner: Arc<Mutex<Vec<SyncResult>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MemorySyncLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<SyncResult>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All recorded results, oldest first
    pub fn results(&self) -> Vec<SyncResult> {
        self.entries().clone()
    }

    /// Number of recorded results
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Number of recorded results with the given status
    pub fn count(&self, status: SyncStatus) -> usize {
        self.entries().iter().filter(|r| r.status == status).count()
    }

    /// Failure messages, oldest first
    pub fn failure_messages(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter_map(|r| r.message.clone())
            .collect()
    }

    /// How many times the log was flushed
    pub fn flush_count(&self) -> usize {
        *self.flushes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SyncLog for MemorySyncLog {
    fn record(&self, result: &SyncResult) {
        self.entries().push(result.clone());
    }

    fn flush(&self) -> Result<(), crate::Error> {
        *self.flushes.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncFailure;
    use crate::traits::UpdateOutcome;

    #[test]
    fn test_memory_log_records_in_order() {
        let log = MemorySyncLog::new();
        let shared = log.clone();

        shared.record(&SyncResult::success(
            "hetzner",
            "home.example.com A",
            UpdateOutcome::Unchanged {
                content: "192.0.2.1".to_string(),
            },
        ));
        shared.record(&SyncResult::failure(
            "hetzner",
            "home.example.com A",
            SyncFailure::new("boom"),
        ));

        assert_eq!(log.len(), 2);
        assert_eq!(log.count(SyncStatus::Success), 1);
        assert_eq!(log.count(SyncStatus::Failure), 1);
        assert_eq!(log.failure_messages(), vec!["boom".to_string()]);
        assert!(log.results()[0].is_success());
    }

    #[test]
    fn test_memory_log_counts_flushes() {
        let log = MemorySyncLog::new();
        assert_eq!(log.flush_count(), 0);
        log.flush().unwrap();
        assert_eq!(log.flush_count(), 1);
    }
}
