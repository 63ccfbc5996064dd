use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
};

use snafu::{ResultExt, ensure};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{
    BlobStore, CommitSnafu, InvalidKeySnafu, ReadSnafu, StageSnafu, StoreError, VerifySnafu,
};

/// Blob store rooted at a directory on the local filesystem.
///
/// Keys are relative paths (`data/price-history.json`). Parent directories are
/// created on first write.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Store rooted at `root`. The directory does not have to exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` to a path under the root.
    ///
    /// Absolute keys and keys that climb out of the root (`..`) are rejected.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let is_plain = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        ensure!(is_plain, InvalidKeySnafu { key });
        Ok(self.root.join(rel))
    }

    /// First half of an atomic write: write `bytes` to a temporary file next to
    /// the target, flush it to disk and verify it reads back identically.
    ///
    /// The target is untouched until [`StagedWrite::commit`]. Dropping the
    /// returned value without committing removes the temporary file, as does
    /// any error returned from here.
    pub fn stage(&self, key: &str, bytes: &[u8]) -> Result<StagedWrite, StoreError> {
        let target = self.path_for(key)?;
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir).context(StageSnafu { key })?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .context(StageSnafu { key })?;
        tmp.write_all(bytes).context(StageSnafu { key })?;
        tmp.as_file().sync_all().context(StageSnafu { key })?;

        let written = fs::read(tmp.path()).context(StageSnafu { key })?;
        let tmp = check_read_back(key, tmp, &written, bytes)?;

        Ok(StagedWrite {
            key: key.to_string(),
            target,
            tmp,
        })
    }
}

/// Keeps `tmp` only if what was read back from it equals what was written.
/// On mismatch the temporary file is dropped, which removes it.
pub(crate) fn check_read_back(
    key: &str,
    tmp: NamedTempFile,
    read_back: &[u8],
    expected: &[u8],
) -> Result<NamedTempFile, StoreError> {
    ensure!(read_back == expected, VerifySnafu { key });
    Ok(tmp)
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(ReadSnafu { key }),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.stage(key, bytes)?.commit()?;
        debug!(key, bytes = bytes.len(), root = %self.root.display(), "record written");
        Ok(())
    }
}

/// A verified temporary file waiting to be renamed over its target.
#[derive(Debug)]
pub struct StagedWrite {
    key: String,
    target: PathBuf,
    tmp: NamedTempFile,
}

impl StagedWrite {
    /// Path the content will be renamed to.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the temporary file holding the content.
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Second half of an atomic write: rename the temporary file over the target.
    ///
    /// On failure the temporary file is removed and the target keeps its
    /// previous content.
    pub fn commit(self) -> Result<(), StoreError> {
        let Self { key, target, tmp } = self;
        tmp.persist(&target)
            .map_err(|e| e.error)
            .context(CommitSnafu { key })?;
        Ok(())
    }
}
