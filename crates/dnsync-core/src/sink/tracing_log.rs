// # Tracing Sync Log
//
// Writes one structured `tracing` event per attempt. Where the line ends up
// (stdout text, JSON, a syslog forwarder reading stdout) is decided by the
// subscriber the daemon installs.

use std::io::Write;

use tracing::{error, info};

use crate::synchronizer::{SyncResult, SyncStatus};
use crate::traits::SyncLog;

/// Sync log backed by the global `tracing` subscriber
///
/// Successes are logged at INFO, failures at ERROR. Every line carries the
/// attempt timestamp, provider and record so a failure can be diagnosed
/// from the log alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSyncLog;

impl TracingSyncLog {
    pub fn new() -> Self {
        Self
    }
}

impl SyncLog for TracingSyncLog {
    fn record(&self, result: &SyncResult) {
        let timestamp = result.timestamp.to_rfc3339();

        match result.status {
            SyncStatus::Success => {
                let outcome = result.outcome.as_ref().map(|o| o.label()).unwrap_or("-");
                let content = result.outcome.as_ref().map(|o| o.content()).unwrap_or("-");
                info!(
                    %timestamp,
                    status = "success",
                    provider = %result.provider,
                    record = %result.record,
                    outcome,
                    content,
                    "sync attempt succeeded"
                );
            }
            SyncStatus::Failure => {
                let reason = result.message.as_deref().unwrap_or("unknown error");
                error!(
                    %timestamp,
                    status = "failure",
                    provider = %result.provider,
                    record = %result.record,
                    error = reason,
                    "sync attempt failed"
                );
            }
        }
    }

    fn flush(&self) -> Result<(), crate::Error> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }
}
