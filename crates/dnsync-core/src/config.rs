//! Configuration types and the environment loader
//!
//! All configuration comes from environment variables. [`SyncConfig::from_env`]
//! reads them once at startup; any missing or malformed value is a fatal
//! [`Error::Config`]. The loaded configuration is immutable afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

pub const ENV_PROVIDER: &str = "DDNS_PROVIDER";
pub const ENV_AUTH_TOKEN: &str = "DDNS_AUTH_TOKEN";
pub const ENV_AUTH_USERNAME: &str = "DDNS_AUTH_USERNAME";
pub const ENV_RECORD_NAME: &str = "DDNS_RECORD_NAME";
pub const ENV_RECORD_TYPE: &str = "DDNS_RECORD_TYPE";
pub const ENV_DOMAIN: &str = "DDNS_DOMAIN";
pub const ENV_RECORD_CONTENT: &str = "DDNS_RECORD_CONTENT";
pub const ENV_IP_SOURCE_URL: &str = "DDNS_IP_SOURCE_URL";
pub const ENV_TTL: &str = "DDNS_TTL";
pub const ENV_UPDATE_INTERVAL: &str = "DDNS_UPDATE_INTERVAL_SECONDS";
pub const ENV_LEXICON_BIN: &str = "DDNS_LEXICON_BIN";
pub const ENV_COMMAND_TIMEOUT: &str = "DDNS_COMMAND_TIMEOUT_SECONDS";
pub const ENV_DRY_RUN: &str = "DDNS_DRY_RUN";
pub const ENV_RUN_ONCE: &str = "DDNS_RUN_ONCE";
pub const ENV_LOG_LEVEL: &str = "DDNS_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "DDNS_LOG_FORMAT";

/// Default tick interval (5 minutes)
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;

/// Default timeout for one invocation of the update tool
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Default update tool binary, resolved through `PATH`
pub const DEFAULT_LEXICON_BIN: &str = "lexicon";

/// Public IP echo services used when no static content is configured
pub const DEFAULT_IPV4_SOURCE_URL: &str = "https://api.ipify.org";
pub const DEFAULT_IPV6_SOURCE_URL: &str = "https://api6.ipify.org";

/// Second-level labels that sit under a two-letter country TLD
/// (`example.co.uk`, `example.com.au`)
const COUNTRY_SECOND_LEVELS: &[&str] = &["ac", "co", "com", "edu", "gov", "ne", "net", "or", "org"];

/// Complete synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Which provider to talk to, and how
    pub provider: ProviderConfig,

    /// The record being kept in sync
    pub record: RecordSpec,

    /// Where the record value comes from
    pub value: ValueConfig,

    /// Tick settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Log sink settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    ///
    /// Values that are set but blank are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let provider_name = env.required(ENV_PROVIDER)?.to_lowercase();
        let credentials = Credentials {
            token: env.required(ENV_AUTH_TOKEN)?,
            username: env.optional(ENV_AUTH_USERNAME),
        };

        let backend = if env.flag(ENV_DRY_RUN, false)? {
            Backend::DryRun
        } else {
            Backend::Lexicon {
                binary: env
                    .optional(ENV_LEXICON_BIN)
                    .unwrap_or_else(|| DEFAULT_LEXICON_BIN.to_string()),
                timeout_secs: env.positive(ENV_COMMAND_TIMEOUT, DEFAULT_COMMAND_TIMEOUT_SECS)?,
            }
        };

        let record_type = match env.optional(ENV_RECORD_TYPE) {
            Some(raw) => raw.parse::<RecordType>()?,
            None => RecordType::A,
        };

        let name = normalize_name(&env.required(ENV_RECORD_NAME)?);
        let domain = match env.optional(ENV_DOMAIN) {
            Some(domain) => normalize_name(&domain),
            None => derive_zone(&name)?,
        };

        let ttl = env
            .optional_positive(ENV_TTL)?
            .map(|ttl| {
                u32::try_from(ttl)
                    .map_err(|_| Error::config(format!("{} is out of range. Got: {}", ENV_TTL, ttl)))
            })
            .transpose()?;

        let default_url = match record_type {
            RecordType::Aaaa => DEFAULT_IPV6_SOURCE_URL,
            _ => DEFAULT_IPV4_SOURCE_URL,
        };
        let value = match env.optional(ENV_RECORD_CONTENT) {
            Some(content) => ValueConfig::Static { content },
            None => ValueConfig::PublicIp {
                url: env
                    .optional(ENV_IP_SOURCE_URL)
                    .unwrap_or_else(|| default_url.to_string()),
            },
        };

        let schedule = ScheduleConfig {
            interval_secs: env.positive(ENV_UPDATE_INTERVAL, DEFAULT_UPDATE_INTERVAL_SECS)?,
            run_once: env.flag(ENV_RUN_ONCE, false)?,
        };

        let logging = LoggingConfig {
            level: match env.optional(ENV_LOG_LEVEL) {
                Some(raw) => raw.parse()?,
                None => LogLevel::default(),
            },
            format: match env.optional(ENV_LOG_FORMAT) {
                Some(raw) => raw.parse()?,
                None => LogFormat::default(),
            },
        };

        let config = Self {
            provider: ProviderConfig {
                name: provider_name,
                credentials,
                backend,
            },
            record: RecordSpec {
                domain,
                name,
                record_type,
                ttl,
            },
            value,
            schedule,
            logging,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;
        self.record.validate()?;
        self.value.validate(self.record.record_type)?;
        self.schedule.validate()?;
        Ok(())
    }
}

/// Thin wrapper over a variable lookup that produces config errors
struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| {
            Error::config(format!(
                "{} is required. Set it via: export {}=...",
                key, key
            ))
        })
    }

    fn optional_positive(&self, key: &str) -> Result<Option<u64>> {
        let Some(raw) = self.optional(key) else {
            return Ok(None);
        };

        match raw.parse::<u64>() {
            Ok(0) | Err(_) => Err(Error::config(format!(
                "{} must be a positive integer. Got: {}",
                key, raw
            ))),
            Ok(value) => Ok(Some(value)),
        }
    }

    fn positive(&self, key: &str, default: u64) -> Result<u64> {
        Ok(self.optional_positive(key)?.unwrap_or(default))
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };

        match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(Error::config(format!(
                "{} must be a boolean (true/false). Got: {}",
                key, raw
            ))),
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider identifier understood by the update tool (e.g. "hetzner")
    pub name: String,

    /// Credentials handed to the provider
    pub credentials: Credentials,

    /// How the provider is reached
    #[serde(default)]
    pub backend: Backend,
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config(format!("{} cannot be empty", ENV_PROVIDER)));
        }

        // The name is the first positional argument of the update tool, so
        // it must not look like a flag.
        if !self.name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(Error::config(format!(
                "{} '{}' must start with a letter or digit",
                ENV_PROVIDER, self.name
            )));
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::config(format!(
                "{} '{}' contains invalid characters. Valid: alphanumeric, '_' and '-'",
                ENV_PROVIDER, self.name
            )));
        }

        if self.credentials.token.is_empty() {
            return Err(Error::config(format!("{} cannot be empty", ENV_AUTH_TOKEN)));
        }

        if let Backend::Lexicon {
            binary,
            timeout_secs,
        } = &self.backend
        {
            if binary.is_empty() {
                return Err(Error::config(format!("{} cannot be empty", ENV_LEXICON_BIN)));
            }
            if *timeout_secs == 0 {
                return Err(Error::config(format!(
                    "{} must be a positive integer",
                    ENV_COMMAND_TIMEOUT
                )));
            }
        }

        Ok(())
    }

    /// Name of the registered backend factory for this configuration
    pub fn backend_name(&self) -> &'static str {
        self.backend.type_name()
    }
}

/// Provider credentials
///
/// `Debug` and `Serialize` never expose the secret. A serialized config reads
/// back with an empty token, which `validate()` rejects until one is supplied.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// API token or secret key
    #[serde(skip_serializing, default)]
    pub token: String,

    /// Optional account or user name
    #[serde(default)]
    pub username: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<REDACTED>")
            .field("username", &self.username)
            .finish()
    }
}

/// Mechanism used to reach the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backend {
    /// Delegate to the `lexicon` command-line tool
    Lexicon {
        /// Path or name of the executable
        binary: String,
        /// Per-invocation timeout in seconds
        timeout_secs: u64,
    },

    /// Log the intended change without touching the provider
    DryRun,
}

impl Backend {
    /// Registry key of this backend
    pub fn type_name(&self) -> &'static str {
        match self {
            Backend::Lexicon { .. } => "lexicon",
            Backend::DryRun => "dry_run",
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Lexicon {
            binary: DEFAULT_LEXICON_BIN.to_string(),
            timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

/// The DNS record kept in sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    /// Zone the record belongs to (e.g. "example.com")
    pub domain: String,

    /// Fully qualified record name (e.g. "home.example.com")
    pub name: String,

    /// Record type
    #[serde(default)]
    pub record_type: RecordType,

    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl RecordSpec {
    pub fn new(domain: impl Into<String>, name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            record_type,
            ttl: None,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Validate the record specification
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.name)?;
        validate_domain_name(&self.domain)?;

        if self.name != self.domain && !self.name.ends_with(&format!(".{}", self.domain)) {
            return Err(Error::config(format!(
                "{} '{}' is not inside {} '{}'",
                ENV_RECORD_NAME, self.name, ENV_DOMAIN, self.domain
            )));
        }

        if self.ttl == Some(0) {
            return Err(Error::config(format!("{} must be a positive integer", ENV_TTL)));
        }

        Ok(())
    }
}

impl fmt::Display for RecordSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.record_type)
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    #[default]
    A,
    /// IPv6 address
    Aaaa,
    Cname,
    Txt,
    Mx,
    Ns,
    Srv,
    Caa,
}

impl RecordType {
    /// Wire name of the type, as the update tool expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
        }
    }

    /// Whether the record holds an IP address
    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa)
    }

    /// Whether `ip` belongs to the family this type holds
    ///
    /// Non-address types accept nothing.
    pub fn accepts(&self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
            _ => false,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "TXT" => Ok(RecordType::Txt),
            "MX" => Ok(RecordType::Mx),
            "NS" => Ok(RecordType::Ns),
            "SRV" => Ok(RecordType::Srv),
            "CAA" => Ok(RecordType::Caa),
            _ => Err(Error::config(format!(
                "{} '{}' is not supported. \
                Supported types: A, AAAA, CNAME, TXT, MX, NS, SRV, CAA",
                ENV_RECORD_TYPE, s
            ))),
        }
    }
}

/// Where the record value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueConfig {
    /// A fixed value
    Static {
        /// Record content
        content: String,
    },

    /// The host's public IP as reported by an echo service
    PublicIp {
        /// URL returning the caller's address as plain text
        url: String,
    },
}

impl ValueConfig {
    /// Validate the value source against the record type
    pub fn validate(&self, record_type: RecordType) -> Result<()> {
        match self {
            ValueConfig::Static { content } => {
                if content.is_empty() {
                    return Err(Error::config(format!(
                        "{} cannot be empty",
                        ENV_RECORD_CONTENT
                    )));
                }

                if record_type.is_address() {
                    let ip: IpAddr = content.parse().map_err(|_| {
                        Error::config(format!(
                            "{} '{}' is not a valid IP address for a {} record",
                            ENV_RECORD_CONTENT, content, record_type
                        ))
                    })?;

                    if !record_type.accepts(&ip) {
                        return Err(Error::config(format!(
                            "{} '{}' does not match record type {}",
                            ENV_RECORD_CONTENT, content, record_type
                        )));
                    }
                }

                Ok(())
            }
            ValueConfig::PublicIp { url } => {
                if !record_type.is_address() {
                    return Err(Error::config(format!(
                        "{} is required for {} records",
                        ENV_RECORD_CONTENT, record_type
                    )));
                }

                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(Error::config(format!(
                        "{} must use HTTP or HTTPS scheme. Got: {}",
                        ENV_IP_SOURCE_URL, url
                    )));
                }

                Ok(())
            }
        }
    }
}

/// Tick settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between the starts of two consecutive attempts
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run a single attempt and exit
    #[serde(default)]
    pub run_once: bool,
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::config(format!(
                "{} must be a positive integer",
                ENV_UPDATE_INTERVAL
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_once: false,
        }
    }
}

fn default_interval_secs() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

/// Log sink settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
}

/// Maximum log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(Error::config(format!(
                "{} '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                ENV_LOG_LEVEL, s
            ))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(Error::config(format!(
                "{} '{}' is not valid. Valid formats: text, json",
                ENV_LOG_FORMAT, s
            ))),
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

/// Derive the zone a record name most likely belongs to
///
/// Takes the last two labels, or the last three under a country TLD with a
/// generic second level (`home.example.co.uk` -> `example.co.uk`).
pub fn derive_zone(name: &str) -> Result<String> {
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(Error::config(format!(
            "Cannot derive the zone of '{}'. Set {} explicitly",
            name, ENV_DOMAIN
        )));
    }

    let n = labels.len();
    let tld = labels[n - 1];
    let second = labels[n - 2];
    let keep = if n >= 3 && tld.len() == 2 && COUNTRY_SECOND_LEVELS.contains(&second) {
        3
    } else {
        2
    };

    Ok(labels[n - keep..].join("."))
}

/// Validate that a string is a plausible DNS name
///
/// Basic RFC 1035 checks, relaxed for `_service` labels and a leading
/// wildcard.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for (index, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if index == 0 && label == "*" {
            continue;
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
