//! Font lookup.
//!
//! [`FontBook`] maps a [`FontSpec`]'s family and style flags to a font
//! file found under a set of directories, loads it once, and then
//! measures and rasterizes through the pipeline's face-level helpers.
//!
//! Matching works on normalized file stems (lowercase, with spaces,
//! dashes and underscores removed): `Family`, `Family-Bold`,
//! `Family-Italic`/`Oblique`, `Family-BoldItalic`. Generic family names
//! (`SansSerif`, `Serif`, `Monospaced`) expand to common installed
//! families. When the requested style is missing the regular face is
//! used, and when the family is missing the first face found is used.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use ab_glyph::FontArc;
use filigrane_pipeline::text::{measure_with_face, rasterize_with_face};
use filigrane_pipeline::{FontSpec, GrayImage, RenderError, TextMetrics, TextRasterizer};

/// How deep to descend into font directories.
const MAX_SCAN_DEPTH: usize = 4;

const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

const SANS_FAMILIES: &[&str] = &[
    "dejavusans",
    "liberationsans",
    "notosans",
    "arial",
    "helvetica",
    "freesans",
];
const SERIF_FAMILIES: &[&str] = &[
    "dejavuserif",
    "liberationserif",
    "notoserif",
    "timesnewroman",
    "times",
    "freeserif",
];
const MONO_FAMILIES: &[&str] = &[
    "dejavusansmono",
    "liberationmono",
    "notosansmono",
    "couriernew",
    "courier",
    "freemono",
];

/// Installed families tried for the generic names.
fn generic_family(family: &str) -> Option<&'static [&'static str]> {
    match family {
        "sansserif" | "sans" | "dialog" => Some(SANS_FAMILIES),
        "serif" => Some(SERIF_FAMILIES),
        "monospaced" | "monospace" | "mono" => Some(MONO_FAMILIES),
        _ => None,
    }
}

/// Stem suffixes for each style, most common spelling first.
const fn style_suffixes(bold: bool, italic: bool) -> &'static [&'static str] {
    const BOLD_ITALIC: &[&str] = &["bolditalic", "boldoblique", "bi", "z"];
    const BOLD: &[&str] = &["bold", "bd", "b"];
    const ITALIC: &[&str] = &["italic", "oblique", "it", "i"];
    const REGULAR: &[&str] = &["", "regular", "book", "roman"];
    match (bold, italic) {
        (true, true) => BOLD_ITALIC,
        (true, false) => BOLD,
        (false, true) => ITALIC,
        (false, false) => REGULAR,
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FaceKey {
    family: String,
    bold: bool,
    italic: bool,
}

/// Font files under a set of directories, resolved and loaded lazily.
#[derive(Debug)]
pub struct FontBook {
    dirs: Vec<PathBuf>,
    index: OnceLock<Vec<(String, PathBuf)>>,
    faces: Mutex<HashMap<FaceKey, FontArc>>,
}

impl FontBook {
    /// A book searching only `dirs`, in order.
    #[must_use]
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            index: OnceLock::new(),
            faces: Mutex::new(HashMap::new()),
        }
    }

    /// A book searching `extra` first, then the platform font
    /// directories.
    #[must_use]
    pub fn with_system_dirs(extra: Vec<PathBuf>) -> Self {
        let mut dirs = extra;
        dirs.extend(system_font_dirs());
        Self::new(dirs)
    }

    /// Directories searched, in order.
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// `(normalized stem, path)` for every font file found, in directory
    /// order and sorted by path within each directory.
    fn index(&self) -> &[(String, PathBuf)] {
        self.index.get_or_init(|| {
            let mut entries = Vec::new();
            for dir in &self.dirs {
                let mut found = Vec::new();
                scan(dir, 0, &mut found);
                found.sort();
                entries.extend(found.into_iter().filter_map(|path| {
                    let stem = path.file_stem()?.to_string_lossy().into_owned();
                    Some((normalize(&stem), path))
                }));
            }
            tracing::debug!(faces = entries.len(), "Font directories scanned");
            entries
        })
    }

    /// Path of the face that best serves `spec`, if any face exists.
    #[must_use]
    pub fn locate(&self, spec: &FontSpec) -> Option<PathBuf> {
        let index = self.index();
        let family = normalize(&spec.family);
        let families: Vec<String> = generic_family(&family).map_or_else(
            || vec![family.clone()],
            |names| names.iter().map(|&n| n.to_owned()).collect(),
        );
        let lookup = |family: &str, suffixes: &[&str]| {
            suffixes.iter().find_map(|suffix| {
                let wanted = format!("{family}{suffix}");
                index
                    .iter()
                    .find(|(stem, _)| *stem == wanted)
                    .map(|(_, path)| path.clone())
            })
        };
        families
            .iter()
            .find_map(|f| lookup(f.as_str(), style_suffixes(spec.bold, spec.italic)))
            .or_else(|| families.iter().find_map(|f| lookup(f.as_str(), style_suffixes(false, false))))
            .or_else(|| index.first().map(|(_, path)| path.clone()))
    }

    /// The loaded face for `spec`.
    fn face(&self, spec: &FontSpec) -> Result<FontArc, RenderError> {
        let key = FaceKey {
            family: normalize(&spec.family),
            bold: spec.bold,
            italic: spec.italic,
        };
        if let Some(face) = self.faces.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(face.clone());
        }

        let path = self
            .locate(spec)
            .ok_or_else(|| RenderError::FontUnavailable(spec.family.clone()))?;
        let bytes = fs::read(&path)
            .map_err(|e| RenderError::FontUnavailable(format!("{}: {e}", path.display())))?;
        let face = FontArc::try_from_vec(bytes)
            .map_err(|e| RenderError::FontUnavailable(format!("{}: {e}", path.display())))?;
        tracing::debug!(family = %spec.family, bold = spec.bold, italic = spec.italic, path = %path.display(), "Font face loaded");

        self.faces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, face.clone());
        Ok(face)
    }
}

impl TextRasterizer for FontBook {
    fn measure(&self, font: &FontSpec, text: &str) -> Result<TextMetrics, RenderError> {
        Ok(measure_with_face(&self.face(font)?, font.size, text))
    }

    fn rasterize(&self, font: &FontSpec, text: &str) -> Result<(TextMetrics, GrayImage), RenderError> {
        Ok(rasterize_with_face(&self.face(font)?, font.size, text))
    }
}

fn scan(dir: &Path, depth: usize, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if depth < MAX_SCAN_DEPTH {
                scan(&path, depth + 1, found);
            }
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        {
            found.push(path);
        }
    }
}

/// Conventional font directories for the current platform.
fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(user) = dirs::font_dir() {
        dirs.push(user);
    }
    if cfg!(target_os = "macos") {
        dirs.extend(["/System/Library/Fonts", "/Library/Fonts"].map(PathBuf::from));
    } else if cfg!(windows) {
        let root = std::env::var_os("WINDIR").map_or_else(|| PathBuf::from("C:\\Windows"), PathBuf::from);
        dirs.push(root.join("Fonts"));
    } else {
        dirs.extend(["/usr/share/fonts", "/usr/local/share/fonts"].map(PathBuf::from));
    }
    dirs
}
