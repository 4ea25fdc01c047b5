//! Output directory validation.
//!
//! Exports must never land next to their sources, where they could
//! overwrite an original or be picked up by the next batch. The check
//! here is lexical; callers that can touch the filesystem should pass
//! canonicalized paths.

use std::path::{Component, Path, PathBuf};

/// Reasons a batch export is refused before any file is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// No output directory was chosen.
    #[error("no output directory selected")]
    NoOutputDir,

    /// The output directory is the parent directory of a source image.
    #[error("output directory {} is the folder of source {}", dir.display(), input.display())]
    SameAsSource { dir: PathBuf, input: PathBuf },
}

/// Check that `out_dir` differs from the parent directory of every path
/// in `sources`.
///
/// # Errors
///
/// Returns [`ExportError::SameAsSource`] naming the first offending
/// source.
pub fn validate_output_dir<P: AsRef<Path>>(sources: &[P], out_dir: &Path) -> Result<(), ExportError> {
    let out = normalize(out_dir);
    for source in sources {
        let source = source.as_ref();
        let parent = source.parent().map(normalize).unwrap_or_default();
        if parent == out {
            return Err(ExportError::SameAsSource {
                dir: out_dir.to_path_buf(),
                input: source.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Lexically normalize a path: drop `.` components and resolve `..`
/// against the preceding component. An empty result means the current
/// directory.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_directory_is_accepted() {
        let sources = [Path::new("/photos/a.jpg"), Path::new("/photos/trip/b.jpg")];
        assert_eq!(validate_output_dir(&sources, Path::new("/exports")), Ok(()));
    }

    #[test]
    fn source_parent_is_rejected() {
        let sources = [Path::new("/exports/x.png"), Path::new("/photos/trip/b.jpg")];
        let err = validate_output_dir(&sources, Path::new("/photos/trip")).unwrap_err();
        assert_eq!(
            err,
            ExportError::SameAsSource {
                dir: PathBuf::from("/photos/trip"),
                input: PathBuf::from("/photos/trip/b.jpg"),
            }
        );
    }

    #[test]
    fn comparison_ignores_dot_segments_and_trailing_slash() {
        let sources = [Path::new("/photos/./trip/b.jpg")];
        assert!(validate_output_dir(&sources, Path::new("/photos/trip/")).is_err());
        assert!(validate_output_dir(&sources, Path::new("/photos/other/../trip")).is_err());
    }

    #[test]
    fn subdirectory_of_source_folder_is_fine() {
        let sources = [Path::new("/photos/b.jpg")];
        assert!(validate_output_dir(&sources, Path::new("/photos/out")).is_ok());
    }

    #[test]
    fn bare_file_names_live_in_the_current_directory() {
        let sources = [Path::new("b.jpg")];
        assert!(validate_output_dir(&sources, Path::new(".")).is_err());
        assert!(validate_output_dir(&sources, Path::new("out")).is_ok());
    }

    #[test]
    fn no_sources_is_trivially_valid() {
        let sources: [&Path; 0] = [];
        assert!(validate_output_dir(&sources, Path::new("/anywhere")).is_ok());
    }
}
