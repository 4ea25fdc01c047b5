//! Batch export.
//!
//! Runs on the caller's thread, one file at a time. A file that fails
//! is recorded and skipped; the rest of the batch still runs.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filigrane_export::{ExportError, encode, output_path, validate_output_dir};
use filigrane_pipeline::Settings;

use crate::render::WatermarkRenderer;
use crate::source::SourceImage;

/// Reasons a batch is refused before any file is written.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Invalid(#[from] ExportError),

    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to resolve output directory {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A source that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
    /// Files written, in source order.
    pub written: Vec<PathBuf>,
}

impl BatchReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Export every path in `sources` into `settings.export.output_dir`.
///
/// # Errors
///
/// Returns [`BatchError::Invalid`] when no output directory is set or it
/// resolves to the folder of one of the sources, and
/// [`BatchError::CreateDir`] or [`BatchError::Resolve`] if it cannot be
/// created or resolved. Per-file failures are reported in the
/// [`BatchReport`] instead.
pub fn export_batch(
    sources: &[PathBuf],
    settings: &Settings,
    renderer: &WatermarkRenderer,
) -> Result<BatchReport, BatchError> {
    let settings = settings.normalized();
    let out_dir = settings
        .export
        .output_dir
        .as_deref()
        .ok_or(ExportError::NoOutputDir)?;

    // The directory must exist to canonicalize it; nothing is written
    // into it until both sides are resolved and compared.
    fs::create_dir_all(out_dir).map_err(|source| BatchError::CreateDir {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let resolved_out = fs::canonicalize(out_dir).map_err(|source| BatchError::Resolve {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let resolved: Vec<PathBuf> = sources.iter().map(|p| canonical_source(p)).collect();
    validate_output_dir(&resolved, &resolved_out)?;

    tracing::info!(files = sources.len(), out_dir = %out_dir.display(), "Starting batch export");

    let mut report = BatchReport::default();
    let mut claimed = HashSet::new();
    for source in sources {
        report.attempted += 1;
        let target = output_path(out_dir, source, &settings.export);
        let result = if claimed.insert(target.clone()) {
            export_one(source, &settings, &target, renderer)
        } else {
            Err(format!(
                "{} was already written by an earlier source in this batch",
                target.display()
            ))
        };
        match result {
            Ok(written) => {
                tracing::debug!(source = %source.display(), output = %written.display(), "Exported");
                report.succeeded += 1;
                report.written.push(written);
            }
            Err(reason) => {
                tracing::warn!(source = %source.display(), %reason, "Export failed, continuing");
                report.failures.push(BatchFailure {
                    path: source.clone(),
                    reason,
                });
            }
        }
    }

    tracing::info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        "Batch export finished"
    );
    Ok(report)
}

fn export_one(
    source: &Path,
    settings: &Settings,
    target: &Path,
    renderer: &WatermarkRenderer,
) -> Result<PathBuf, String> {
    let image = SourceImage::open(source).map_err(|e| e.to_string())?;
    let composition = renderer
        .render(&image, &settings.watermark, Some(&settings.export.sizing))
        .map_err(|e| e.to_string())?;
    let bytes = encode(
        &composition.image,
        settings.export.format,
        settings.export.jpeg_quality,
    )
    .map_err(|e| e.to_string())?;

    fs::write(target, bytes).map_err(|e| format!("failed to write {}: {e}", target.display()))?;
    Ok(target.to_path_buf())
}

/// Canonical form of a source path. A missing file still gets its
/// folder resolved; `path` is returned unchanged only when neither
/// exists.
fn canonical_source(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::canonicalize(parent).map_or_else(|_| path.to_path_buf(), |dir| dir.join(name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use filigrane_pipeline::{BlockRasterizer, OutputFormat, RgbaImage};

    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    fn renderer() -> WatermarkRenderer {
        WatermarkRenderer::new(Arc::new(BlockRasterizer))
    }

    #[test]
    fn missing_output_dir_is_refused() {
        let err = export_batch(&[PathBuf::from("a.png")], &Settings::default(), &renderer()).unwrap_err();
        assert!(matches!(err, BatchError::Invalid(ExportError::NoOutputDir)));
    }

    #[test]
    fn output_dir_equal_to_source_folder_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("a.png");
        write_png(&photo, 8, 8);

        let mut settings = Settings::default();
        settings.export.output_dir = Some(dir.path().join("."));
        let err = export_batch(&[photo], &settings, &renderer()).unwrap_err();
        assert!(matches!(err, BatchError::Invalid(ExportError::SameAsSource { .. })));
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let good = input.path().join("good.png");
        let bad = input.path().join("bad.jpg");
        let missing = input.path().join("missing.png");
        write_png(&good, 40, 20);
        fs::write(&bad, b"not a jpeg").unwrap();

        let mut settings = Settings::default();
        settings.export.output_dir = Some(output.path().to_path_buf());
        settings.export.format = OutputFormat::Png;
        settings.export.sizing.scale_percent = 50;

        let report = export_batch(&[bad.clone(), good, missing.clone()], &settings, &renderer()).unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.failures[0].path, bad);
        assert_eq!(report.failures[1].path, missing);

        let written = output.path().join("good.png");
        assert_eq!(report.written, vec![written.clone()]);
        let exported = image::open(written).unwrap();
        assert_eq!((exported.width(), exported.height()), (20, 10));
    }

    #[test]
    fn missing_source_is_checked_against_its_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        assert_eq!(canonical_source(&missing), fs::canonicalize(dir.path()).unwrap().join("nope.png"));

        let mut settings = Settings::default();
        settings.export.output_dir = Some(dir.path().join("sub").join(".."));
        let err = export_batch(&[missing], &settings, &renderer()).unwrap_err();
        assert!(matches!(err, BatchError::Invalid(ExportError::SameAsSource { .. })));
    }

    #[test]
    fn colliding_output_names_fail_the_later_source() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::create_dir(input.path().join("a")).unwrap();
        fs::create_dir(input.path().join("b")).unwrap();
        let first = input.path().join("a").join("x.png");
        let second = input.path().join("b").join("x.png");
        write_png(&first, 10, 10);
        write_png(&second, 20, 20);

        let mut settings = Settings::default();
        settings.export.output_dir = Some(output.path().to_path_buf());
        settings.export.format = OutputFormat::Png;

        let report = export_batch(&[first, second.clone()], &settings, &renderer()).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, second);
        assert!(report.failures[0].reason.contains("already written"));

        let kept = image::open(output.path().join("x.png")).unwrap();
        assert_eq!((kept.width(), kept.height()), (10, 10));
    }

    #[test]
    fn output_dir_is_created_on_demand() {
        let input = tempfile::tempdir().unwrap();
        let photo = input.path().join("shot.png");
        write_png(&photo, 10, 10);

        let output = tempfile::tempdir().unwrap();
        let nested = output.path().join("a").join("b");
        let mut settings = Settings::default();
        settings.export.output_dir = Some(nested.clone());

        let report = export_batch(&[photo], &settings, &renderer()).unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(nested.join("shot.jpg").is_file());
    }
}
