//! Runtime for the price monitor job.
//!
//! - [`config`]: TOML configuration and environment overrides
//! - [`providers`]: where the current prices come from
//! - [`notify`]: where change alerts and the weekly digest go
//! - [`run`]: the orchestrator tying them to the [`price_history`] core

pub mod config;
#[cfg(feature = "cli")]
pub mod logging;
pub mod notify;
pub mod providers;
pub mod run;
