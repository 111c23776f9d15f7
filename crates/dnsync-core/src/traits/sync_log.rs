// # Sync Log Trait
//
// The sink every attempt outcome is written to. It is passed explicitly to
// the scheduler: acquired once at startup, flushed once at shutdown.
//
// ## Implementations
//
// - `TracingSyncLog`: one structured `tracing` event per attempt
// - `MemorySyncLog`: keeps results in memory (tests, embedding)

use crate::synchronizer::SyncResult;

/// Trait for attempt log sinks
///
/// Recording is best effort and must not block on the network or fail the
/// attempt; a sink that cannot write drops the line.
pub trait SyncLog: Send + Sync {
    /// Append one line for `result`
    fn record(&self, result: &SyncResult);

    /// Push out anything buffered
    ///
    /// Called once when the scheduler stops.
    fn flush(&self) -> Result<(), crate::Error> {
        Ok(())
    }
}
