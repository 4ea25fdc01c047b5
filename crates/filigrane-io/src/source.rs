//! Source photos and watermark assets.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use filigrane_pipeline::decode::decode;
use filigrane_pipeline::{Dimensions, RenderError, RgbaImage};

use crate::metadata::capture_date;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
}

/// A decoded photo plus what was read from its metadata.
#[derive(Debug, Clone)]
pub struct SourceImage {
    path: PathBuf,
    image: RgbaImage,
    capture_date: Option<NaiveDate>,
}

impl SourceImage {
    /// Read, decode and inspect the photo at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Read`] if the file cannot be read and
    /// [`LoadError::Decode`] if it is not a decodable image.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }

    /// Decode an in-memory photo that notionally lives at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Decode`] if `bytes` is not a decodable image.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Result<Self, LoadError> {
        let path = path.into();
        let image = decode(bytes).map_err(|source| LoadError::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            capture_date: capture_date(bytes),
            path,
            image,
        })
    }

    /// Wrap an already decoded raster.
    #[must_use]
    pub fn from_image(path: impl Into<PathBuf>, image: RgbaImage, capture_date: Option<NaiveDate>) -> Self {
        Self {
            path: path.into(),
            image,
            capture_date,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }

    /// EXIF capture date, if the photo had one.
    #[must_use]
    pub const fn capture_date(&self) -> Option<NaiveDate> {
        self.capture_date
    }
}

/// Load a watermark asset, turning every failure into a loggable reason.
///
/// # Errors
///
/// Returns the reason the asset cannot be used: none selected, not
/// readable or not decodable.
pub fn load_asset(asset: Option<&Path>) -> Result<RgbaImage, String> {
    let path = asset.ok_or_else(|| "no watermark image selected".to_owned())?;
    let bytes = fs::read(path).map_err(|e| format!("cannot read watermark image {}: {e}", path.display()))?;
    decode(&bytes).map_err(|e| format!("cannot decode watermark image {}: {e}", path.display()))
}
