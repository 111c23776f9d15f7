// # Lexicon DNS Provider
//
// This crate applies record updates by running the `lexicon` command-line
// tool, which already knows how to talk to each DNS host (hetzner, scaleway,
// devnomads and many more). One attempt is one `list` call followed by at
// most one `create` or `update` call.
//
// ## Invocation
//
// ```text
// lexicon <provider> list   <domain> <TYPE> --name=<name> --output=JSON
// lexicon <provider> create <domain> <TYPE> --name=<name> --content=<value> [--ttl=<ttl>]
// lexicon <provider> update <domain> <TYPE> --identifier=<id> --name=<name> --content=<value> [--ttl=<ttl>]
// ```
//
// Option values are joined to their flag so a value starting with `-` is
// never read as another option.
//
// ## Security Requirements
//
// - Credentials are passed through `LEXICON_<PROVIDER>_<OPTION>` environment
//   variables of the child process, never on its command line
// - Credentials never appear in logs or error messages; tool output is
//   scrubbed before it is quoted
//
// ## Failure Mapping
//
// | Condition                                  | Error                   |
// |--------------------------------------------|-------------------------|
// | Binary missing / not executable            | `Error::Io`             |
// | Output mentions 401, 403, Unauthorized     | `Error::Authentication` |
// | Any other non-zero exit                    | `Error::Provider`       |
// | Invocation exceeds the timeout             | `Error::Provider`       |
//
// No failure is retried here; the next scheduled tick is the retry.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use dnsync_core::config::{Backend, Credentials, ProviderConfig, RecordSpec, RecordType};
use dnsync_core::traits::{DnsProvider, DnsProviderFactory, ProviderRecord, UpdateOutcome};
use dnsync_core::{Error, ProviderRegistry, Result};
use serde_json::Value;
use tokio::process::Command;

/// Registry key of the lexicon backend
pub const LEXICON_BACKEND: &str = "lexicon";

/// Registry key of the dry-run backend
pub const DRY_RUN_BACKEND: &str = "dry_run";

/// Markers on the final line of tool output that mean the provider refused
/// the credentials
const AUTH_FAILURE_MARKERS: &[&str] = &[
    "401 Client Error",
    "403 Client Error",
    "Unauthorized",
    "Forbidden",
    "AuthenticationError",
];

/// DNS provider that delegates every call to the lexicon CLI
///
/// The Debug implementation does NOT expose the credentials.
pub struct LexiconProvider {
    /// Provider name as lexicon knows it (e.g. "hetzner")
    provider: String,

    /// ⚠️ NEVER log the token
    credentials: Credentials,

    /// Executable to run
    binary: String,

    /// Upper bound for a single invocation
    timeout: Duration,
}

impl fmt::Debug for LexiconProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexiconProvider")
            .field("provider", &self.provider)
            .field("credentials", &self.credentials)
            .field("binary", &self.binary)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LexiconProvider {
    /// Create a new lexicon-backed provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider name, token or binary
    /// is empty, or if `timeout` is zero.
    pub fn new(
        provider: impl Into<String>,
        credentials: Credentials,
        binary: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let provider = provider.into();
        let binary = binary.into();

        if provider.is_empty() {
            return Err(Error::config("Provider name cannot be empty"));
        }
        if credentials.token.is_empty() {
            return Err(Error::config(format!(
                "Credentials for provider '{}' cannot be empty",
                provider
            )));
        }
        if binary.is_empty() {
            return Err(Error::config("Lexicon binary cannot be empty"));
        }
        if timeout.is_zero() {
            return Err(Error::config("Lexicon timeout must be greater than zero"));
        }

        Ok(Self {
            provider,
            credentials,
            binary,
            timeout,
        })
    }

    /// Environment handed to the child process
    ///
    /// Scaleway authenticates with a secret key, every other provider with a
    /// token.
    fn credential_env(&self) -> Vec<(String, String)> {
        let prefix = format!(
            "LEXICON_{}_",
            self.provider.to_ascii_uppercase().replace('-', "_")
        );

        let secret_option = match self.provider.as_str() {
            "scaleway" => "AUTH_SECRET_KEY",
            _ => "AUTH_TOKEN",
        };

        let mut env = vec![(
            format!("{}{}", prefix, secret_option),
            self.credentials.token.clone(),
        )];

        if let Some(ref username) = self.credentials.username {
            env.push((format!("{}AUTH_USERNAME", prefix), username.clone()));
        }

        env
    }

    /// Replace credential values in tool output before quoting it
    fn scrub(&self, text: &str) -> String {
        let mut scrubbed = text.to_string();
        if !self.credentials.token.is_empty() {
            scrubbed = scrubbed.replace(&self.credentials.token, "<REDACTED>");
        }
        scrubbed
    }

    /// Run one lexicon action and return its stdout
    async fn run(&self, action: &str, args: Vec<String>) -> Result<String> {
        tracing::debug!("Running {} {} {} {:?}", self.binary, self.provider, action, args);

        let mut command = Command::new(&self.binary);
        command
            .arg(&self.provider)
            .arg(action)
            .args(&args)
            .envs(self.credential_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to run {}: {}", self.binary, e),
            ))
        })?;

        // Dropping the child on timeout kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::provider(
                    &self.provider,
                    format!(
                        "lexicon {} timed out after {}s",
                        action,
                        self.timeout.as_secs_f64()
                    ),
                )
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout
            } else {
                stderr
            };
            return Err(self.classify_failure(action, output.status.code(), &detail));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn classify_failure(&self, action: &str, code: Option<i32>, detail: &str) -> Error {
        let detail = self.scrub(detail);
        let summary = last_line(&detail).unwrap_or("no output");

        if is_auth_failure(summary) {
            return Error::auth(format!(
                "{} rejected the credentials: {}",
                self.provider, summary
            ));
        }

        let status = code
            .map(|c| format!("exit code {}", c))
            .unwrap_or_else(|| "a signal".to_string());

        Error::provider(
            &self.provider,
            format!("lexicon {} failed with {}: {}", action, status, summary),
        )
    }

    async fn create(&self, record: &RecordSpec, value: &str) -> Result<()> {
        let mut args = vec![
            record.domain.clone(),
            record.record_type.to_string(),
            format!("--name={}", record.name),
            format!("--content={}", value),
        ];
        push_ttl(&mut args, record);

        self.run("create", args).await?;
        Ok(())
    }

    async fn update(&self, record: &RecordSpec, identifier: &str, value: &str) -> Result<()> {
        let mut args = vec![
            record.domain.clone(),
            record.record_type.to_string(),
            format!("--identifier={}", identifier),
            format!("--name={}", record.name),
            format!("--content={}", value),
        ];
        push_ttl(&mut args, record);

        self.run("update", args).await?;
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for LexiconProvider {
    async fn apply(&self, record: &RecordSpec, value: &str) -> Result<UpdateOutcome> {
        let existing = self.list(record).await?;

        if existing
            .iter()
            .any(|r| same_content(&r.content, value, record.record_type))
        {
            tracing::debug!("{} already holds {}", record, value);
            return Ok(UpdateOutcome::Unchanged {
                content: value.to_string(),
            });
        }

        match existing.first() {
            None => {
                tracing::info!("Creating {} -> {} at {}", record, value, self.provider);
                self.create(record, value).await?;
                Ok(UpdateOutcome::Created {
                    content: value.to_string(),
                })
            }
            Some(current) => {
                if existing.len() > 1 {
                    tracing::warn!(
                        "{} matches {} records at {}, updating {}",
                        record,
                        existing.len(),
                        self.provider,
                        current.id
                    );
                }

                tracing::info!(
                    "Updating {} {} -> {} at {}",
                    record,
                    current.content,
                    value,
                    self.provider
                );
                self.update(record, &current.id, value).await?;
                Ok(UpdateOutcome::Updated {
                    previous: Some(current.content.clone()),
                    content: value.to_string(),
                })
            }
        }
    }

    async fn list(&self, record: &RecordSpec) -> Result<Vec<ProviderRecord>> {
        let args = vec![
            record.domain.clone(),
            record.record_type.to_string(),
            format!("--name={}", record.name),
            "--output=JSON".to_string(),
        ];

        let stdout = self.run("list", args).await?;
        parse_listing(&stdout).map_err(|e| {
            Error::provider(
                &self.provider,
                format!("could not read list output: {}", self.scrub(&e.to_string())),
            )
        })
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}

/// Provider that logs the intended change and touches nothing
///
/// Every apply reports an update, so a dry run shows what a live run with
/// an out-of-date record would do.
#[derive(Debug, Clone)]
pub struct DryRunProvider {
    provider: String,
}

impl DryRunProvider {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

#[async_trait]
impl DnsProvider for DryRunProvider {
    async fn apply(&self, record: &RecordSpec, value: &str) -> Result<UpdateOutcome> {
        tracing::warn!(
            "DRY-RUN: would set {} -> {} at {}",
            record,
            value,
            self.provider
        );

        Ok(UpdateOutcome::Updated {
            previous: None,
            content: value.to_string(),
        })
    }

    async fn list(&self, record: &RecordSpec) -> Result<Vec<ProviderRecord>> {
        tracing::warn!("DRY-RUN: not listing {} at {}", record, self.provider);
        Ok(Vec::new())
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}

/// Parse the JSON printed by `lexicon ... list --output JSON`
///
/// Identifiers are strings for most providers and integers for a few; both
/// are accepted. Empty output means no records.
pub fn parse_listing(stdout: &str) -> Result<Vec<ProviderRecord>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<Value> = serde_json::from_str(trimmed)?;

    entries
        .iter()
        .map(|entry| {
            let field = |key: &str| -> Option<String> {
                match entry.get(key)? {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }
            };

            Ok(ProviderRecord {
                id: field("id")
                    .ok_or_else(|| Error::Other(format!("record without id: {}", entry)))?,
                name: field("name").unwrap_or_default(),
                record_type: field("type").unwrap_or_default(),
                content: field("content").unwrap_or_default(),
                ttl: entry
                    .get("ttl")
                    .and_then(Value::as_u64)
                    .and_then(|ttl| u32::try_from(ttl).ok()),
            })
        })
        .collect()
}

/// Compare record contents the way providers report them
///
/// TXT values may come back quoted and names may carry a trailing dot.
/// Everything except TXT is compared case-insensitively, since hostnames and
/// IPv6 hex digits may be reported in either case.
fn same_content(reported: &str, wanted: &str, record_type: RecordType) -> bool {
    fn normalize(s: &str) -> &str {
        s.trim().trim_matches('"').trim_end_matches('.')
    }

    let (reported, wanted) = (normalize(reported), normalize(wanted));
    match record_type {
        RecordType::Txt => reported == wanted,
        _ => reported.eq_ignore_ascii_case(wanted),
    }
}

fn push_ttl(args: &mut Vec<String>, record: &RecordSpec) {
    if let Some(ttl) = record.ttl {
        args.push(format!("--ttl={}", ttl));
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Whether the final line of tool output reports rejected credentials
///
/// Only the last line is the error itself; earlier lines are traceback
/// frames whose line numbers may contain any digits.
fn is_auth_failure(last_line: &str) -> bool {
    AUTH_FAILURE_MARKERS
        .iter()
        .any(|marker| last_line.contains(marker))
}

/// Factory for creating lexicon providers
pub struct LexiconFactory;

impl DnsProviderFactory for LexiconFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match &config.backend {
            Backend::Lexicon {
                binary,
                timeout_secs,
            } => Ok(Box::new(LexiconProvider::new(
                config.name.clone(),
                config.credentials.clone(),
                binary.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config("Invalid config for lexicon provider")),
        }
    }
}

/// Factory for creating dry-run providers
pub struct DryRunFactory;

impl DnsProviderFactory for DryRunFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config.backend {
            Backend::DryRun => {
                tracing::warn!(
                    "Provider {} running in DRY-RUN mode - no changes will be made",
                    config.name
                );
                Ok(Box::new(DryRunProvider::new(config.name.clone())))
            }
            _ => Err(Error::config("Invalid config for dry-run provider")),
        }
    }
}

/// Register the lexicon and dry-run backends with a registry
///
/// # Example
///
/// ```rust
/// use dnsync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dnsync_provider_lexicon::register(&registry);
/// assert!(registry.has_provider("lexicon"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(LEXICON_BACKEND, Box::new(LexiconFactory));
    registry.register_provider(DRY_RUN_BACKEND, Box::new(DryRunFactory));
}
