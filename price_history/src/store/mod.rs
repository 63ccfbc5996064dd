//! Key-value blob storage for the persisted records.
//!
//! Every record (history, weekly digest, published dataset) is one blob under a
//! string key. [`BlobStore::put`] has atomic-replace semantics: a reader sees
//! either the previous content or the new content, never a mix.
//!
//! Implementations:
//! - [`FsBlobStore`]: keys are paths relative to a root directory; writes go
//!   through a verified temporary file that is renamed into place.
//! - [`MemoryBlobStore`]: in-process map, for tests and dry runs.
//!
//! [`load_json`] / [`save_json`] layer the JSON encoding used by all records on
//! top of any store.

mod fs;
mod memory;

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use snafu::{Backtrace, ResultExt, Snafu};

pub use fs::{FsBlobStore, StagedWrite};
pub use memory::MemoryBlobStore;

/// Errors raised while reading or writing persisted records.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// The key cannot be mapped to a location inside the store.
    #[snafu(display("Invalid store key: {key:?}"))]
    InvalidKey {
        /// Offending key.
        key: String,
        /// Captured backtrace.
        backtrace: Backtrace,
    },

    /// Reading an existing record failed.
    #[snafu(display("Failed to read {key}: {source}"))]
    Read {
        /// Record key.
        key: String,
        /// Underlying I/O error.
        source: std::io::Error,
        /// Captured backtrace.
        backtrace: Backtrace,
    },

    /// Creating, writing or syncing the temporary write target failed.
    #[snafu(display("Failed to stage write for {key}: {source}"))]
    Stage {
        /// Record key.
        key: String,
        /// Underlying I/O error.
        source: std::io::Error,
        /// Captured backtrace.
        backtrace: Backtrace,
    },

    /// The bytes read back from the temporary target differ from the intended content.
    #[snafu(display("Written content for {key} does not match the intended content"))]
    Verify {
        /// Record key.
        key: String,
        /// Captured backtrace.
        backtrace: Backtrace,
    },

    /// Renaming the verified temporary target into place failed.
    #[snafu(display("Failed to replace {key}: {source}"))]
    Commit {
        /// Record key.
        key: String,
        /// Underlying I/O error.
        source: std::io::Error,
        /// Captured backtrace.
        backtrace: Backtrace,
    },

    /// The stored bytes are not a valid record.
    #[snafu(display("Failed to decode {key}: {source}"))]
    Decode {
        /// Record key.
        key: String,
        /// Underlying JSON error.
        source: serde_json::Error,
        /// Captured backtrace.
        backtrace: Backtrace,
    },

    /// The record could not be encoded.
    #[snafu(display("Failed to encode {key}: {source}"))]
    Encode {
        /// Record key.
        key: String,
        /// Underlying JSON error.
        source: serde_json::Error,
        /// Captured backtrace.
        backtrace: Backtrace,
    },
}

/// Storage for whole records addressed by key.
pub trait BlobStore {
    /// Fetch the bytes stored under `key`; `Ok(None)` when nothing is stored.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace whatever is stored under `key` with `bytes`, atomically.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

impl<T: BlobStore + ?Sized> BlobStore for &T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, bytes)
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, bytes)
    }
}

/// Decode the JSON record under `key`, or `Ok(None)` if absent.
pub fn load_json<T, B>(store: &B, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    B: BlobStore + ?Sized,
{
    match store.get(key)? {
        None => Ok(None),
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .context(DecodeSnafu { key }),
    }
}

/// Encode `value` as pretty JSON (two-space indent) and store it under `key`.
pub fn save_json<T, B>(store: &B, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    B: BlobStore + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value).context(EncodeSnafu { key })?;
    store.put(key, &bytes)
}
