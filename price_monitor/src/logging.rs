//! Structured logging setup for the binary.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Crates whose logs are capped at `warn` regardless of the chosen level.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "lettre"];

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("unknown log level {0:?}")]
    InvalidLevel(String),

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Parse a level name (`trace`, `debug`, `info`, `warn`/`warning`, `error`).
pub fn parse_level(level: &str) -> Result<Level, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(LoggingError::InvalidLevel(level.to_string())),
    }
}

/// Filter directives for `level`: the level itself plus the quiet targets.
pub fn default_directives(level: Level) -> String {
    let mut directives = level.as_str().to_ascii_lowercase();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. `json` switches to one JSON object
/// per line.
pub fn init_tracing(level: &str, json: bool) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let installed = if json {
        tracing_subscriber::fmt()
            .json()
            .with_target(true)
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_target(true)
            .with_env_filter(filter)
            .try_init()
    };
    installed.map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::debug!(level = %level, json, "logging initialized");
    Ok(())
}
