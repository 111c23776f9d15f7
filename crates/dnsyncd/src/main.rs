// # dnsyncd - DNS record sync daemon
//
// A thin integration layer over dnsync-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers and value sources
// 4. Running the scheduler until SIGTERM/SIGINT (or once, in run-once mode)
//
// No DNS logic lives here.
//
// ## Configuration
//
// ### Provider
// - `DDNS_PROVIDER`: Provider name as lexicon knows it (hetzner, scaleway, ...)
// - `DDNS_AUTH_TOKEN`: API token or secret key
// - `DDNS_AUTH_USERNAME`: Account name, for providers that need one
// - `DDNS_LEXICON_BIN`: lexicon executable (default: `lexicon`)
// - `DDNS_COMMAND_TIMEOUT_SECONDS`: Per-invocation timeout (default: 60)
// - `DDNS_DRY_RUN`: Log intended changes only
//
// ### Record
// - `DDNS_RECORD_NAME`: Fully qualified record name
// - `DDNS_RECORD_TYPE`: Record type (default: A)
// - `DDNS_DOMAIN`: Zone (default: derived from the record name)
// - `DDNS_RECORD_CONTENT`: Static value; when unset the public IP is used
// - `DDNS_IP_SOURCE_URL`: Public IP echo service
// - `DDNS_TTL`: Record TTL
//
// ### Schedule and logging
// - `DDNS_UPDATE_INTERVAL_SECONDS`: Seconds between attempts (default: 300)
// - `DDNS_RUN_ONCE`: Run one attempt and exit
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `DDNS_LOG_FORMAT`: text or json (default: text)
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER=hetzner
// export DDNS_AUTH_TOKEN=your_token
// export DDNS_RECORD_NAME=home.example.com
// export DDNS_UPDATE_INTERVAL_SECONDS=300
//
// dnsyncd
// ```

use anyhow::{Context, Result};
use dnsync_core::config::LoggingConfig;
use dnsync_core::{LogFormat, ProviderRegistry, Scheduler, SyncConfig, SyncLog, TracingSyncLog};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (including a failed run-once attempt)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DnsyncExitCode> for ExitCode {
    fn from(code: DnsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Tracing is not up yet, so configuration errors go straight to stderr.
    let config = match SyncConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DnsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    info!("Starting dnsyncd {}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Install the global subscriber for the configured level and format
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::from(logging.level))
        .with_ansi(std::io::stdout().is_terminal());

    let installed = match logging.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    installed.context("global subscriber already set")
}

/// Run the daemon
async fn run_daemon(config: SyncConfig) -> DnsyncExitCode {
    let registry = ProviderRegistry::new();
    dnsync_provider_lexicon::register(&registry);

    #[cfg(feature = "http")]
    {
        dnsync_ip_http::register(&registry);
    }

    #[cfg(not(feature = "http"))]
    if matches!(config.value, dnsync_core::ValueConfig::PublicIp { .. }) {
        tracing::warn!("Built without the http feature; set DDNS_RECORD_CONTENT");
    }

    let log: Arc<dyn SyncLog> = Arc::new(TracingSyncLog::new());

    let scheduler = match build_scheduler(&registry, &config, Arc::clone(&log)) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DnsyncExitCode::ConfigError;
        }
    };

    info!(
        "Managing {} in zone {} via {} ({})",
        config.record,
        config.record.domain,
        config.provider.name,
        config.provider.backend_name()
    );

    if config.schedule.run_once {
        info!("Run-once mode: performing a single attempt");
        let result = scheduler.run_once().await;
        if let Err(e) = log.flush() {
            error!("Failed to flush log: {}", e);
        }
        return if result.is_success() {
            DnsyncExitCode::CleanShutdown
        } else {
            DnsyncExitCode::RuntimeError
        };
    }

    match scheduler.run().await {
        Ok(ticks) => {
            info!("Shutting down daemon after {} attempt(s)", ticks);
            DnsyncExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            DnsyncExitCode::RuntimeError
        }
    }
}

/// Build the provider, value source and scheduler from configuration
fn build_scheduler(
    registry: &ProviderRegistry,
    config: &SyncConfig,
    log: Arc<dyn SyncLog>,
) -> Result<Scheduler> {
    let provider = registry
        .create_provider(&config.provider)
        .context("creating DNS provider")?;
    let source = registry
        .create_value_source(&config.value, config.record.record_type)
        .context("creating value source")?;

    Ok(Scheduler::from_config(config, provider, source, log)?)
}
