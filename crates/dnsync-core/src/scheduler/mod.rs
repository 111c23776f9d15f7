//! Periodic scheduler
//!
//! The Scheduler owns the single timer of the process. On every tick it runs
//! one synchronization attempt to completion and records the result before
//! looking at the timer again.
//!
//! ## Tick Flow
//!
//! ```text
//!   interval tick ──▶ Synchronizer::sync() ──▶ SyncLog::record()
//!        ▲                                            │
//!        └────────────── next tick (delayed) ◀────────┘
//! ```
//!
//! ## Timing Rules
//!
//! 1. The first tick fires immediately
//! 2. Later ticks fire every `interval`, measured between starts
//! 3. An attempt that outlives the interval delays the next tick; ticks are
//!    never dropped into parallel execution
//! 4. Shutdown is only observed between attempts, so an in-flight attempt is
//!    always awaited and logged
//! 5. The log sink is flushed once after the loop stops

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::synchronizer::{SyncResult, Synchronizer};
use crate::traits::{DnsProvider, SyncLog, ValueSource};

/// Periodic synchronization scheduler
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`] or [`Scheduler::from_config()`]
/// 2. Start with [`Scheduler::run()`] or [`Scheduler::run_until()`]
/// 3. The loop runs until the shutdown future resolves
/// 4. The log sink is flushed and the number of completed ticks returned
///
/// ## Threading
///
/// All attempts run on the caller's task, one after the other. Nothing is
/// spawned.
pub struct Scheduler {
    /// Runs the actual attempt
    synchronizer: Synchronizer,

    /// Where every result goes
    log: Arc<dyn SyncLog>,

    /// Time between the starts of two attempts
    interval: Duration,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// Fails with a configuration error if `interval` is zero.
    pub fn new(
        synchronizer: Synchronizer,
        log: Arc<dyn SyncLog>,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::config("Update interval must be greater than zero"));
        }

        Ok(Self {
            synchronizer,
            log,
            interval,
        })
    }

    /// Create a scheduler from a loaded configuration and its collaborators
    pub fn from_config(
        config: &SyncConfig,
        provider: Box<dyn DnsProvider>,
        source: Box<dyn ValueSource>,
        log: Arc<dyn SyncLog>,
    ) -> Result<Self> {
        config.validate()?;

        let synchronizer = Synchronizer::new(provider, source, config.record.clone());
        Self::new(synchronizer, log, config.schedule.interval())
    }

    /// The configured tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run exactly one attempt and log it
    pub async fn run_once(&self) -> SyncResult {
        let result = self.synchronizer.sync().await;
        self.log.record(&result);
        result
    }

    /// Run until SIGTERM or SIGINT
    ///
    /// Both handlers are installed before the first tick, so a signal that
    /// arrives during the first attempt still stops the loop afterwards.
    ///
    /// # Returns
    ///
    /// - `Ok(ticks)`: Clean shutdown after `ticks` attempts
    /// - `Err(Error)`: Signal handlers could not be installed, or the log
    ///   sink could not be flushed
    #[cfg(unix)]
    pub async fn run(&self) -> Result<u64> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        self.run_until(async move {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            info!("Received shutdown signal: {}", name);
        })
        .await
    }

    /// Run until CTRL-C
    #[cfg(not(unix))]
    pub async fn run(&self) -> Result<u64> {
        self.run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal: CTRL-C"),
                Err(e) => {
                    tracing::error!("Failed to listen for CTRL-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
    }

    /// Run until `shutdown` resolves
    ///
    /// The shutdown future is polled only between attempts: once it resolves
    /// no new tick starts, and an attempt already running is finished and
    /// logged first.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(timer);

        tokio::pin!(shutdown);

        info!(
            "Scheduler started: {} via {} every {}s",
            self.synchronizer.record(),
            self.synchronizer.provider_name(),
            self.interval.as_secs()
        );

        let mut completed: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(_) = ticks.next() => {
                    completed += 1;
                    debug!("Tick {} started", completed);

                    let result = self.run_once().await;
                    debug!("Tick {} finished: {:?}", completed, result.status);
                }
            }
        }

        self.log.flush()?;
        info!("Log flushed, scheduler stopped after {} tick(s)", completed);

        Ok(completed)
    }
}
