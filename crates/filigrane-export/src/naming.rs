//! Output file naming.

use std::path::{Path, PathBuf};

use filigrane_pipeline::{ExportSpec, NamingRule};

/// Stem used when a source path has none (e.g. `..`).
const FALLBACK_STEM: &str = "image";

/// File name for the export of `source` under `spec`: the source stem
/// with the naming rule applied, plus the output format's extension.
///
/// ```
/// # use filigrane_pipeline::{ExportSpec, NamingRule, OutputFormat};
/// let spec = ExportSpec { naming: NamingRule::Prefix, format: OutputFormat::Png, ..ExportSpec::default() };
/// assert_eq!(filigrane_export::output_file_name("shots/IMG_1.JPG".as_ref(), &spec), "wm_IMG_1.png");
/// ```
#[must_use]
pub fn output_file_name(source: &Path, spec: &ExportSpec) -> String {
    let stem = source
        .file_stem()
        .map_or_else(|| FALLBACK_STEM.into(), |s| s.to_string_lossy());
    let (prefix, suffix) = match spec.naming {
        NamingRule::Keep => ("", ""),
        NamingRule::Prefix => (spec.prefix.as_str(), ""),
        NamingRule::Suffix => ("", spec.suffix.as_str()),
        NamingRule::PrefixAndSuffix => (spec.prefix.as_str(), spec.suffix.as_str()),
    };
    format!("{prefix}{stem}{suffix}.{}", spec.format.extension())
}

/// Full destination path for `source` inside `out_dir`.
#[must_use]
pub fn output_path(out_dir: &Path, source: &Path, spec: &ExportSpec) -> PathBuf {
    out_dir.join(output_file_name(source, spec))
}
