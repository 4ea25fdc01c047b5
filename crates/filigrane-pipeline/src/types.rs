//! Shared types for the filigrane watermark pipeline.
//!
//! The whole editable state of the application is one [`Settings`]
//! value: a [`WatermarkSpec`] describing what is drawn and where, plus
//! an [`ExportSpec`] describing how results are sized, encoded and
//! named. Both are plain data; every numeric field is brought into range
//! by [`Settings::normalized`] rather than rejected.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can pass rasters around
/// without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage`, the coverage mask format produced by text
/// rasterizers.
pub use image::GrayImage;

/// Smallest accepted export scale percentage.
pub const MIN_SCALE_PERCENT: u32 = 10;
/// Largest accepted export scale percentage.
pub const MAX_SCALE_PERCENT: u32 = 200;
/// Scale percentage that leaves the image size untouched.
pub const UNSCALED_PERCENT: u32 = 100;

/// Smallest accepted watermark image scale factor.
pub const MIN_WATERMARK_SCALE: f64 = 0.01;
/// Largest accepted watermark image scale factor.
pub const MAX_WATERMARK_SCALE: f64 = 10.0;

/// Largest accepted font size in pixels.
pub const MAX_FONT_SIZE: u32 = 2000;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an RGBA raster.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Opacity percentage: 0 is invisible, 100 is fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Opacity(u8);

impl Opacity {
    /// Fully opaque.
    pub const OPAQUE: Self = Self(100);

    /// Create an opacity, clamping `percent` into `0..=100`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn new(percent: i64) -> Self {
        let clamped = if percent < 0 {
            0
        } else if percent > 100 {
            100
        } else {
            percent
        };
        Self(clamped as u8)
    }

    /// The opacity as a percentage in `0..=100`.
    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }

    /// The opacity as a fraction in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    fn clamped(self) -> Self {
        Self::new(i64::from(self.0))
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// 24-bit RGB color, persisted as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Pure white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Pure black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Create a color from its channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived luminance (ITU-R BT.601 weights), `0..=255`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn luminance(self) -> u8 {
        let weighted =
            299 * u32::from(self.r) + 587 * u32::from(self.g) + 114 * u32::from(self.b);
        (weighted / 1000) as u8
    }

    /// Black for light colors, white for dark ones. Used for text
    /// outlines so the stroke always reads against the fill.
    #[must_use]
    pub fn contrasting(self) -> Self {
        if self.luminance() >= 128 {
            Self::BLACK
        } else {
            Self::WHITE
        }
    }

    /// Format as `#RRGGBB`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A color string that is not `#RGB` or `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}: expected #RGB or #RRGGBB")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseColorError(trimmed.to_owned());
        let hex = trimmed.strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (slot, ch) in rgb.iter_mut().zip(hex.chars()) {
                    let n = ch.to_digit(16).ok_or_else(err)?;
                    *slot = u8::try_from(n * 17).map_err(|_| err())?;
                }
                Ok(Self::rgb(rgb[0], rgb[1], rgb[2]))
            }
            6 => {
                let channel = |range: std::ops::Range<usize>| {
                    u8::from_str_radix(&hex[range], 16).map_err(|_| err())
                };
                Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
            }
            _ => Err(err()),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where the watermark is placed on the base image.
///
/// Nine presets sit a fixed margin away from the relevant edges (or
/// centered on an axis). [`Anchor::Custom`] stores a top-left origin in
/// base-image pixels, typically produced by dragging in the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
    /// User-chosen top-left origin in base-image pixel space.
    Custom { x: i32, y: i32 },
}

/// Horizontal alignment of a preset anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// Vertical alignment of a preset anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl Anchor {
    /// All nine fixed presets, in reading order.
    pub const PRESETS: [Self; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::MiddleLeft,
        Self::Center,
        Self::MiddleRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// Persisted name of the anchor (`"BOTTOM_RIGHT"`, `"CUSTOM"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "TOP_LEFT",
            Self::TopCenter => "TOP_CENTER",
            Self::TopRight => "TOP_RIGHT",
            Self::MiddleLeft => "MIDDLE_LEFT",
            Self::Center => "CENTER",
            Self::MiddleRight => "MIDDLE_RIGHT",
            Self::BottomLeft => "BOTTOM_LEFT",
            Self::BottomCenter => "BOTTOM_CENTER",
            Self::BottomRight => "BOTTOM_RIGHT",
            Self::Custom { .. } => "CUSTOM",
        }
    }

    /// Alignment on both axes, or `None` for [`Anchor::Custom`].
    #[must_use]
    pub const fn alignment(self) -> Option<(HorizontalAlign, VerticalAlign)> {
        use HorizontalAlign as H;
        use VerticalAlign as V;
        Some(match self {
            Self::TopLeft => (H::Left, V::Top),
            Self::TopCenter => (H::Center, V::Top),
            Self::TopRight => (H::Right, V::Top),
            Self::MiddleLeft => (H::Left, V::Middle),
            Self::Center => (H::Center, V::Middle),
            Self::MiddleRight => (H::Right, V::Middle),
            Self::BottomLeft => (H::Left, V::Bottom),
            Self::BottomCenter => (H::Center, V::Bottom),
            Self::BottomRight => (H::Right, V::Bottom),
            Self::Custom { .. } => return None,
        })
    }

    /// Returns `true` for [`Anchor::Custom`].
    #[must_use]
    pub const fn is_custom(self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { x, y } => write!(f, "CUSTOM({x}, {y})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A name that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

impl ParseNameError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Uppercase and unify `-`/space separators to `_`.
fn canonical_name(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

impl FromStr for Anchor {
    type Err = ParseNameError;

    /// Parses a preset name; `"CUSTOM"` yields a custom anchor at the
    /// origin, to be filled in by the caller.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = canonical_name(s);
        if name == "CUSTOM" {
            return Ok(Self::Custom { x: 0, y: 0 });
        }
        Self::PRESETS
            .into_iter()
            .find(|preset| preset.as_str() == name)
            .ok_or_else(|| ParseNameError::new("position", s))
    }
}

/// Which kind of overlay is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatermarkMode {
    #[default]
    Text,
    Image,
}

impl WatermarkMode {
    /// Persisted name (`"TEXT"` or `"IMAGE"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
        }
    }
}

impl FromStr for WatermarkMode {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_name(s).as_str() {
            "TEXT" => Ok(Self::Text),
            "IMAGE" => Ok(Self::Image),
            _ => Err(ParseNameError::new("watermark mode", s)),
        }
    }
}

/// Font selection for text watermarks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontSpec {
    /// Family name, resolved against the available font files.
    pub family: String,
    /// Size in pixels.
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "SansSerif".to_owned(),
            size: 36,
            bold: false,
            italic: false,
        }
    }
}

/// Parameters used when [`WatermarkMode::Text`] is active.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextWatermark {
    /// Text to draw. Empty means "use the photo's capture date".
    pub content: String,
    pub font: FontSpec,
    pub color: Color,
    pub opacity: Opacity,
    /// Draw an offset drop shadow beneath the glyphs.
    pub shadow: bool,
    /// Draw a one-pixel outline in a contrasting color.
    pub stroke: bool,
}

impl Default for TextWatermark {
    fn default() -> Self {
        Self {
            content: String::new(),
            font: FontSpec::default(),
            color: Color::WHITE,
            opacity: Opacity::OPAQUE,
            shadow: false,
            stroke: false,
        }
    }
}

/// Parameters used when [`WatermarkMode::Image`] is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageWatermark {
    /// Watermark asset on disk. `None` until the user picks one.
    pub asset: Option<PathBuf>,
    /// Multiplier applied to the asset's native dimensions.
    pub scale: f64,
    pub opacity: Opacity,
}

impl Default for ImageWatermark {
    fn default() -> Self {
        Self {
            asset: None,
            scale: 1.0,
            opacity: Opacity::OPAQUE,
        }
    }
}

/// Everything that determines what overlay is drawn and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub mode: WatermarkMode,
    pub text: TextWatermark,
    pub image: ImageWatermark,
    /// Clockwise rotation in degrees, `-180.0..180.0`.
    pub rotation_degrees: f64,
    pub anchor: Anchor,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            mode: WatermarkMode::Text,
            text: TextWatermark::default(),
            image: ImageWatermark::default(),
            rotation_degrees: 0.0,
            anchor: Anchor::BottomRight,
        }
    }
}

impl WatermarkSpec {
    /// Opacity of whichever overlay the current mode draws.
    #[must_use]
    pub const fn opacity(&self) -> Opacity {
        match self.mode {
            WatermarkMode::Text => self.text.opacity,
            WatermarkMode::Image => self.image.opacity,
        }
    }

    /// Copy with every numeric field brought into range.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut spec = self.clone();
        spec.rotation_degrees = crate::geometry::normalize_rotation(spec.rotation_degrees);
        spec.text.opacity = spec.text.opacity.clamped();
        spec.text.font.size = spec.text.font.size.clamp(1, MAX_FONT_SIZE);
        spec.image.opacity = spec.image.opacity.clamped();
        spec.image.scale = if spec.image.scale.is_finite() {
            spec.image.scale.clamp(MIN_WATERMARK_SCALE, MAX_WATERMARK_SCALE)
        } else {
            1.0
        };
        spec
    }
}

/// How exported files are named relative to their source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NamingRule {
    /// Keep the source file stem.
    #[default]
    Keep,
    /// Prepend the configured prefix.
    Prefix,
    /// Append the configured suffix.
    Suffix,
    /// Prepend the prefix and append the suffix.
    PrefixAndSuffix,
}

impl NamingRule {
    /// Persisted name (`"KEEP"`, `"PREFIX"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "KEEP",
            Self::Prefix => "PREFIX",
            Self::Suffix => "SUFFIX",
            Self::PrefixAndSuffix => "PREFIX_AND_SUFFIX",
        }
    }
}

impl FromStr for NamingRule {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_name(s).as_str() {
            "KEEP" | "ORIGINAL" => Ok(Self::Keep),
            "PREFIX" => Ok(Self::Prefix),
            "SUFFIX" => Ok(Self::Suffix),
            "PREFIX_AND_SUFFIX" | "BOTH" => Ok(Self::PrefixAndSuffix),
            _ => Err(ParseNameError::new("naming rule", s)),
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Persisted name (`"JPEG"` or `"PNG"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
        }
    }

    /// File extension without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical_name(s).as_str() {
            "JPEG" | "JPG" => Ok(Self::Jpeg),
            "PNG" => Ok(Self::Png),
            _ => Err(ParseNameError::new("output format", s)),
        }
    }
}

/// Output sizing rule.
///
/// A scale percentage other than 100 wins; otherwise `width` and
/// `height` override their axis independently, 0 meaning "keep".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sizing {
    /// Uniform scale, `10..=200`; 100 leaves the size alone.
    pub scale_percent: u32,
    /// Explicit output width, 0 keeps the original.
    pub width: u32,
    /// Explicit output height, 0 keeps the original.
    pub height: u32,
}

impl Default for Sizing {
    fn default() -> Self {
        Self {
            scale_percent: UNSCALED_PERCENT,
            width: 0,
            height: 0,
        }
    }
}

impl Sizing {
    /// Copy with the scale percentage clamped into range.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            scale_percent: self.scale_percent.clamp(MIN_SCALE_PERCENT, MAX_SCALE_PERCENT),
            ..self
        }
    }
}

/// Everything that determines how rendered images are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSpec {
    pub naming: NamingRule,
    pub prefix: String,
    pub suffix: String,
    pub format: OutputFormat,
    /// JPEG quality, `0..=100`. Ignored for PNG.
    pub jpeg_quality: u8,
    pub sizing: Sizing,
    /// Destination directory. Must differ from every source's parent.
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self {
            naming: NamingRule::Keep,
            prefix: "wm_".to_owned(),
            suffix: "_watermarked".to_owned(),
            format: OutputFormat::Jpeg,
            jpeg_quality: 90,
            sizing: Sizing::default(),
            output_dir: None,
        }
    }
}

impl ExportSpec {
    /// Copy with every numeric field brought into range.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            jpeg_quality: self.jpeg_quality.min(100),
            sizing: self.sizing.normalized(),
            ..self.clone()
        }
    }
}

/// The single owned set of current settings of the application.
///
/// Templates and session snapshots are deep copies of this value; the
/// renderer only ever borrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub watermark: WatermarkSpec,
    pub export: ExportSpec,
}

impl Settings {
    /// Copy with every numeric field brought into range.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            watermark: self.watermark.normalized(),
            export: self.export.normalized(),
        }
    }
}

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Failed to decode an input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image has a zero-sized axis or is too large to draw on.
    #[error("invalid image dimensions ({0})")]
    InvalidDimensions(Dimensions),

    /// No usable font face for a text watermark.
    #[error("no usable font for {0:?}")]
    FontUnavailable(String),

    /// A newer request superseded this render before it finished.
    #[error("render cancelled")]
    Cancelled,
}
