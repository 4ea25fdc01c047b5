//! Application data locations.

use std::io;
use std::path::{Path, PathBuf};

/// Directory name under the platform configuration directory.
pub const APP_DIR_NAME: &str = "PhotoWatermark";

/// File holding the template collection.
pub const TEMPLATES_FILE: &str = "templates.json";

/// File holding the last session snapshot.
pub const SESSION_FILE: &str = "last_session.json";

#[derive(Debug, thiserror::Error)]
pub enum PathsError {
    /// The platform has no configuration directory and none was given.
    #[error("no application data directory could be determined; pass --data-dir")]
    NoDataDir,

    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolved locations of the persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    /// Use `data_dir` as-is.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The explicit override if given, else `<config dir>/PhotoWatermark`
    /// (`~/Library/Application Support` on macOS, `%APPDATA%` on Windows,
    /// `$XDG_CONFIG_HOME` or `~/.config` elsewhere).
    ///
    /// # Errors
    ///
    /// Returns [`PathsError::NoDataDir`] if there is no override and the
    /// platform directory is unknown.
    pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self, PathsError> {
        data_dir
            .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME)))
            .map(Self::new)
            .ok_or(PathsError::NoDataDir)
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn templates_file(&self) -> PathBuf {
        self.data_dir.join(TEMPLATES_FILE)
    }

    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    /// Create the data directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PathsError::Create`] if the directory cannot be created.
    pub fn ensure_exists(&self) -> Result<(), PathsError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| PathsError::Create {
            path: self.data_dir.clone(),
            source,
        })
    }
}
