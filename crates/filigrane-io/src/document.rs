//! Crash-safe JSON documents.
//!
//! A [`JsonDocument`] is one file holding one serialized value. Saves
//! write `<name>.tmp` next to the target and rename it over the target,
//! falling back to copy-then-delete when the rename fails. Loads that
//! hit unparseable content move the file aside as
//! `<name>.corrupt-<epoch-millis>` and report the document as absent.

use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors from reading or writing a persisted document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Neither the atomic replace nor the copy fallback succeeded.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The value could not be serialized.
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A typed JSON file with atomic replace and corruption quarantine.
#[derive(Debug)]
pub struct JsonDocument<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonDocument<T> {
    /// A document stored at `path`. Nothing is touched until the first
    /// load or save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path with `suffix` appended to the file name.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Read and parse the document.
    ///
    /// Returns `Ok(None)` when the file does not exist or when it fails
    /// to parse. In the latter case the file is first moved aside;
    /// failing to move it is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the file exists but cannot be
    /// read.
    pub fn load(&self) -> Result<Option<T>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Document is corrupt, quarantining");
                if let Err(q) = self.quarantine(&bytes) {
                    tracing::error!(path = %self.path.display(), error = %q, "Failed to quarantine document");
                }
                Ok(None)
            }
        }
    }

    /// Move the corrupt file aside under a timestamped name, so it is
    /// quarantined once and later loads see no document.
    fn quarantine(&self, bytes: &[u8]) -> io::Result<PathBuf> {
        let millis = chrono::Utc::now().timestamp_millis();
        let target = self.sibling(&format!(".corrupt-{millis}"));
        if let Err(e) = fs::rename(&self.path, &target) {
            tracing::debug!(error = %e, "Rename failed, copying corrupt document aside");
            fs::write(&target, bytes)?;
            fs::remove_file(&self.path)?;
        }
        tracing::info!(quarantine = %target.display(), "Corrupt document preserved");
        Ok(target)
    }

    /// Serialize `value` and replace the document with it.
    ///
    /// Creates the parent directory when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if `value` cannot be serialized
    /// and [`StoreError::Write`] if the temporary file cannot be written
    /// or neither replacement strategy succeeds.
    pub fn save(&self, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(value)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = self.sibling(".tmp");
        write_synced(&tmp, &json).map_err(write_err)?;

        if let Err(e) = fs::rename(&tmp, &self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Atomic replace failed, copying instead");
            let copied = fs::copy(&tmp, &self.path);
            if let Err(e) = fs::remove_file(&tmp) {
                tracing::debug!(tmp = %tmp.display(), error = %e, "Could not remove temporary file");
            }
            copied.map_err(write_err)?;
        }
        Ok(())
    }

    /// Delete the document. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the file exists but cannot be
    /// removed.
    pub fn remove(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
