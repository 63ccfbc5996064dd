//! Job configuration: parsing, normalization, and environment overrides.
//!
//! The configuration is a TOML file with four tables:
//! - `[source]`: the upstream price endpoint (URL, cookie, timeout, site URL)
//! - `[storage]`: where the history, digest and published dataset live
//! - `[digest]`: which weekday triggers the weekly digest
//! - `[mail]`: optional SMTP settings; without it notifications go to the log
//!
//! Secrets (cookie, SMTP password) are held as [`SecretString`] from the moment
//! they are parsed. They may also come from the process environment through
//! [`EnvOverrides`], which only the binary reads.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Weekday;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use shared_utils::env::{InvalidEnvVarError, get_env_var_opt, parse_env_var};
use thiserror::Error;

/// Default upstream request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding `source.cookie`.
pub const COOKIE_ENV: &str = "PRICE_MONITOR_COOKIE";
/// Environment variable overriding `mail.user`.
pub const SMTP_USER_ENV: &str = "SMTP_USER";
/// Environment variable overriding `mail.password`.
pub const SMTP_PASS_ENV: &str = "SMTP_PASS";
/// Environment variable overriding `mail.port`.
pub const SMTP_PORT_ENV: &str = "SMTP_PORT";

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Env(#[from] InvalidEnvVarError),
}

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub source: SourceCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub digest: DigestCfg,
    #[serde(default)]
    pub mail: Option<MailCfg>,
}

/// Upstream price endpoint.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceCfg {
    /// URL answering the price list request.
    pub endpoint: String,
    /// Session cookie forwarded verbatim.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub cookie: Option<SecretString>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Public page of the shop; linked from change mails and sent as `Referer`.
    #[serde(default)]
    pub site_url: Option<String>,
}

impl SourceCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Locations of the persisted records, relative to `root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StorageCfg {
    pub root: PathBuf,
    pub history: String,
    pub digest: String,
    pub export: String,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            history: "data/price-history.json".into(),
            digest: "data/weekly-report.json".into(),
            export: "docs/price-data.json".into(),
        }
    }
}

/// Weekly digest scheduling.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DigestCfg {
    /// Weekday on which a run also builds the digest (`"Mon"`, `"monday"`, ...).
    pub weekday: Weekday,
}

impl Default for DigestCfg {
    fn default() -> Self {
        Self {
            weekday: Weekday::Mon,
        }
    }
}

/// SMTP settings for mail notifications.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailCfg {
    pub from: String,
    pub to: Vec<String>,
    pub host: String,
    /// Defaults to 465 when `secure`, 587 otherwise.
    #[serde(default)]
    pub port: Option<u16>,
    /// Implicit TLS when true; STARTTLS otherwise.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
}

impl MailCfg {
    pub fn port(&self) -> u16 {
        match (self.port, self.secure) {
            (Some(p), _) => p,
            (None, true) => 465,
            (None, false) => 587,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn deserialize_secret<'de, D>(d: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.map(|s| SecretString::new(s.into())))
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Recipients removed because they repeated an earlier one.
    pub recipients_deduped: usize,
}

/// Normalize a configuration in-place.
///
/// - Trims the endpoint, site URL and storage keys; a blank site URL becomes `None`
/// - Trims mail addresses and de-duplicates recipients, preserving order
///
/// Errors:
/// - Empty endpoint, zero timeout, or empty storage keys
/// - A mail table without sender, host or recipients
pub fn normalize_config(cfg: &mut MonitorConfig) -> Result<NormalizationReport, ConfigError> {
    let mut report = NormalizationReport::default();

    cfg.source.endpoint = cfg.source.endpoint.trim().to_string();
    if cfg.source.endpoint.is_empty() {
        return Err(ConfigError::Invalid("source.endpoint cannot be empty".into()));
    }
    if cfg.source.timeout_secs == 0 {
        return Err(ConfigError::Invalid("source.timeout_secs must be positive".into()));
    }
    cfg.source.site_url = cfg
        .source
        .site_url
        .take()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    for (name, key) in [
        ("storage.history", &mut cfg.storage.history),
        ("storage.digest", &mut cfg.storage.digest),
        ("storage.export", &mut cfg.storage.export),
    ] {
        *key = key.trim().to_string();
        if key.is_empty() {
            return Err(ConfigError::Invalid(format!("{name} cannot be empty")));
        }
    }

    if let Some(mail) = cfg.mail.as_mut() {
        mail.from = mail.from.trim().to_string();
        mail.host = mail.host.trim().to_string();
        if mail.from.is_empty() {
            return Err(ConfigError::Invalid("mail.from cannot be empty".into()));
        }
        if mail.host.is_empty() {
            return Err(ConfigError::Invalid("mail.host cannot be empty".into()));
        }
        mail.user = mail
            .user
            .take()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let before_len = mail.to.len();
        let mut seen = HashSet::new();
        let mut recipients = Vec::with_capacity(before_len);
        for addr in std::mem::take(&mut mail.to) {
            let addr = addr.trim().to_string();
            if addr.is_empty() {
                continue;
            }
            if seen.insert(addr.to_lowercase()) {
                recipients.push(addr);
            } else {
                report.recipients_deduped += 1;
            }
        }
        if recipients.is_empty() {
            return Err(ConfigError::Invalid("mail.to needs at least one recipient".into()));
        }
        mail.to = recipients;
    }

    Ok(report)
}

/// Parse and normalize a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> Result<MonitorConfig, ConfigError> {
    let mut cfg: MonitorConfig = toml::from_str(toml_str)?;
    let report = normalize_config(&mut cfg)?;
    if report.recipients_deduped > 0 {
        tracing::debug!(deduped = report.recipients_deduped, "duplicate mail recipients dropped");
    }
    Ok(cfg)
}

/// Read a configuration file from disk, parse, and normalize it.
pub fn load_config_path(path: impl AsRef<Path>) -> Result<MonitorConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_str(&text)
}

/// Secret and port overrides taken from the process environment.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub cookie: Option<SecretString>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub smtp_port: Option<u16>,
}

impl EnvOverrides {
    /// Reads [`COOKIE_ENV`], [`SMTP_USER_ENV`], [`SMTP_PASS_ENV`] and [`SMTP_PORT_ENV`].
    ///
    /// Unset and blank variables are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cookie: get_env_var_opt(COOKIE_ENV).map(|s| SecretString::new(s.into())),
            smtp_user: get_env_var_opt(SMTP_USER_ENV),
            smtp_password: get_env_var_opt(SMTP_PASS_ENV).map(|s| SecretString::new(s.into())),
            smtp_port: parse_env_var(SMTP_PORT_ENV)?,
        })
    }
}

impl MonitorConfig {
    /// Apply environment overrides; set values win over the file.
    ///
    /// SMTP overrides only take effect when a `[mail]` table is configured.
    pub fn apply_overrides(&mut self, env: EnvOverrides) {
        if env.cookie.is_some() {
            self.source.cookie = env.cookie;
        }
        if let Some(mail) = self.mail.as_mut() {
            if env.smtp_user.is_some() {
                mail.user = env.smtp_user;
            }
            if env.smtp_password.is_some() {
                mail.password = env.smtp_password;
            }
            if env.smtp_port.is_some() {
                mail.port = env.smtp_port;
            }
        }
    }
}
