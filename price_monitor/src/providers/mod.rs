//! Snapshot providers: where the current prices come from.
//!
//! [`SnapshotProvider`] is the single interface the run orchestrator depends on.
//! A provider returns one [`Snapshot`] per call; every quote in it carries the
//! same observation time. Implementations must not retry: a failed fetch is
//! reported to the caller, which aborts the run before touching any record.
//!
//! The trait is async and object safe, so the orchestrator can hold a
//! `Box<dyn SnapshotProvider>` chosen at runtime.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use price_history::models::Snapshot;
//! use price_monitor::providers::{ProviderError, SnapshotProvider};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl SnapshotProvider for Empty {
//!     async fn fetch(&self) -> Result<Snapshot, ProviderError> {
//!         Ok(Snapshot::new())
//!     }
//! }
//! ```

pub mod shop_rest;

use async_trait::async_trait;
use price_history::models::{Snapshot, SnapshotError};
use snafu::{Backtrace, Snafu};

/// Source of the current price snapshot.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Fetches the current prices of every listed product.
    async fn fetch(&self) -> Result<Snapshot, ProviderError>;
}

#[async_trait]
impl<P: SnapshotProvider + ?Sized> SnapshotProvider for Box<P> {
    async fn fetch(&self) -> Result<Snapshot, ProviderError> {
        (**self).fetch().await
    }
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// A configured header value (cookie, referer) contains invalid characters.
    #[snafu(display("Invalid value for header {header}: {source}"))]
    InvalidHeader {
        header: &'static str,
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `SnapshotProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// Network failure, timeout, or an undecodable body.
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The endpoint answered with a non-success HTTP status.
    #[snafu(display("API returned HTTP {status}: {body}"))]
    HttpStatus {
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The endpoint reported an application-level error.
    #[snafu(display("API error (code {code}): {message}"))]
    Api {
        code: i64,
        message: String,
        backtrace: Backtrace,
    },

    /// A listed product could not be turned into a quote.
    #[snafu(display("Malformed product entry {index}: {message}"))]
    Malformed {
        index: usize,
        message: String,
        backtrace: Backtrace,
    },

    /// A parsed quote failed snapshot validation.
    #[snafu(display("Invalid product entry {index}: {source}"))]
    InvalidQuote {
        index: usize,
        source: SnapshotError,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl From<ProviderInitError> for ProviderError {
    fn from(source: ProviderInitError) -> Self {
        ProviderError::Init { source }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(source: reqwest::Error) -> Self {
        ProviderError::Reqwest {
            source,
            backtrace: Backtrace::capture(),
        }
    }
}
