//! Reducer-style settings updates.
//!
//! Every change the shell can make to the current [`Settings`] is one
//! [`SettingsEdit`] value. [`Settings::apply`] is pure and returns the
//! normalized successor, so out-of-range input is clamped at the point
//! of entry and never reaches the renderer.

use std::path::PathBuf;

use crate::types::{
    Anchor, Color, MAX_SCALE_PERCENT, MIN_SCALE_PERCENT, NamingRule, Opacity, OutputFormat,
    Settings, WatermarkMode,
};

/// A single change to the current settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEdit {
    Mode(WatermarkMode),
    Text(String),
    FontFamily(String),
    FontSize(u32),
    Bold(bool),
    Italic(bool),
    Color(Color),
    /// Text opacity percentage; clamped into `0..=100`.
    TextOpacity(i64),
    Shadow(bool),
    Stroke(bool),
    Asset(Option<PathBuf>),
    ImageScale(f64),
    /// Image opacity percentage; clamped into `0..=100`.
    ImageOpacity(i64),
    /// Degrees; wrapped into `-180..180`.
    Rotation(f64),
    Anchor(Anchor),
    /// Drop the overlay at a base-image origin, usually the result of a
    /// drag. Switches the anchor to custom.
    MoveTo { x: i32, y: i32 },
    Naming(NamingRule),
    Prefix(String),
    Suffix(String),
    Format(OutputFormat),
    /// JPEG quality; clamped into `0..=100`.
    JpegQuality(i64),
    /// Export scale percentage; clamped into `10..=200`.
    ScalePercent(i64),
    /// Explicit output width, 0 keeps the original.
    TargetWidth(u32),
    /// Explicit output height, 0 keeps the original.
    TargetHeight(u32),
    OutputDir(Option<PathBuf>),
}

impl Settings {
    /// The normalized settings after applying `edit`.
    #[must_use]
    pub fn apply(&self, edit: SettingsEdit) -> Self {
        let mut next = self.clone();
        let watermark = &mut next.watermark;
        let export = &mut next.export;
        match edit {
            SettingsEdit::Mode(mode) => watermark.mode = mode,
            SettingsEdit::Text(content) => watermark.text.content = content,
            SettingsEdit::FontFamily(family) => watermark.text.font.family = family,
            SettingsEdit::FontSize(size) => watermark.text.font.size = size,
            SettingsEdit::Bold(bold) => watermark.text.font.bold = bold,
            SettingsEdit::Italic(italic) => watermark.text.font.italic = italic,
            SettingsEdit::Color(color) => watermark.text.color = color,
            SettingsEdit::TextOpacity(percent) => watermark.text.opacity = Opacity::new(percent),
            SettingsEdit::Shadow(on) => watermark.text.shadow = on,
            SettingsEdit::Stroke(on) => watermark.text.stroke = on,
            SettingsEdit::Asset(asset) => watermark.image.asset = asset,
            SettingsEdit::ImageScale(scale) => watermark.image.scale = scale,
            SettingsEdit::ImageOpacity(percent) => watermark.image.opacity = Opacity::new(percent),
            SettingsEdit::Rotation(degrees) => watermark.rotation_degrees = degrees,
            SettingsEdit::Anchor(anchor) => watermark.anchor = anchor,
            SettingsEdit::MoveTo { x, y } => watermark.anchor = Anchor::Custom { x, y },
            SettingsEdit::Naming(rule) => export.naming = rule,
            SettingsEdit::Prefix(prefix) => export.prefix = prefix,
            SettingsEdit::Suffix(suffix) => export.suffix = suffix,
            SettingsEdit::Format(format) => export.format = format,
            SettingsEdit::JpegQuality(quality) => {
                export.jpeg_quality = u8::try_from(quality.clamp(0, 100)).unwrap_or(100);
            }
            SettingsEdit::ScalePercent(percent) => {
                let clamped = percent.clamp(i64::from(MIN_SCALE_PERCENT), i64::from(MAX_SCALE_PERCENT));
                export.sizing.scale_percent = u32::try_from(clamped).unwrap_or(MAX_SCALE_PERCENT);
            }
            SettingsEdit::TargetWidth(width) => export.sizing.width = width,
            SettingsEdit::TargetHeight(height) => export.sizing.height = height,
            SettingsEdit::OutputDir(dir) => export.output_dir = dir,
        }
        next.normalized()
    }

    /// Apply a sequence of edits in order.
    #[must_use]
    pub fn apply_all(&self, edits: impl IntoIterator<Item = SettingsEdit>) -> Self {
        edits
            .into_iter()
            .fold(self.normalized(), |settings, edit| settings.apply(edit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_leaves_the_original_untouched() {
        let original = Settings::default();
        let edited = original.apply(SettingsEdit::Text("© me".into()));
        assert_eq!(edited.watermark.text.content, "© me");
        assert!(original.watermark.text.content.is_empty());
    }

    #[test]
    fn numeric_edits_are_clamped() {
        let settings = Settings::default().apply_all([
            SettingsEdit::TextOpacity(150),
            SettingsEdit::ImageOpacity(-3),
            SettingsEdit::JpegQuality(101),
            SettingsEdit::ScalePercent(3),
            SettingsEdit::Rotation(200.0),
            SettingsEdit::ImageScale(50.0),
        ]);
        assert_eq!(settings.watermark.text.opacity.percent(), 100);
        assert_eq!(settings.watermark.image.opacity.percent(), 0);
        assert_eq!(settings.export.jpeg_quality, 100);
        assert_eq!(settings.export.sizing.scale_percent, MIN_SCALE_PERCENT);
        assert!((settings.watermark.rotation_degrees - -160.0).abs() < 1e-9);
        assert!((settings.watermark.image.scale - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn move_to_switches_to_custom_anchor() {
        let settings = Settings::default().apply(SettingsEdit::MoveTo { x: 12, y: 34 });
        assert_eq!(settings.watermark.anchor, Anchor::Custom { x: 12, y: 34 });
        let back = settings.apply(SettingsEdit::Anchor(Anchor::TopLeft));
        assert_eq!(back.watermark.anchor, Anchor::TopLeft);
    }

    #[test]
    fn export_edits_reach_the_export_spec() {
        let settings = Settings::default().apply_all([
            SettingsEdit::Naming(NamingRule::Suffix),
            SettingsEdit::Suffix("_wm".into()),
            SettingsEdit::Format(OutputFormat::Png),
            SettingsEdit::TargetWidth(300),
            SettingsEdit::OutputDir(Some(PathBuf::from("/tmp/out"))),
        ]);
        assert_eq!(settings.export.naming, NamingRule::Suffix);
        assert_eq!(settings.export.suffix, "_wm");
        assert_eq!(settings.export.format, OutputFormat::Png);
        assert_eq!(settings.export.sizing.width, 300);
        assert_eq!(settings.export.output_dir, Some(PathBuf::from("/tmp/out")));
    }
}
