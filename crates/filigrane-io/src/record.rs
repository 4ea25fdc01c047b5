//! Flat persisted form of [`Settings`].
//!
//! Templates and session snapshots store the watermark and export
//! parameters as one flat camelCase object. Reading is lenient: every
//! field has a default, unknown names fall back to the default variant
//! and numbers are clamped, so a hand-edited or older document still
//! produces usable settings.

use std::path::PathBuf;

use filigrane_pipeline::{
    Anchor, Color, ExportSpec, FontSpec, ImageWatermark, NamingRule, Opacity, OutputFormat,
    Settings, Sizing, TextWatermark, WatermarkMode, WatermarkSpec,
};
use serde::{Deserialize, Serialize};

const CUSTOM_POSITION: &str = "CUSTOM";

/// Watermark and export parameters as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsRecord {
    pub mode: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_y: Option<i32>,
    pub rotation_degrees: f64,

    pub target_width: i64,
    pub target_height: i64,
    pub scale_percent: i64,

    pub naming_rule: String,
    pub prefix: String,
    pub suffix: String,
    pub output_format: String,
    pub jpeg_quality: i64,

    pub text: String,
    pub font_name: String,
    pub font_size: i64,
    pub bold: bool,
    pub italic: bool,
    pub color: String,
    pub text_opacity: i64,
    pub shadow: bool,
    pub stroke: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_image_path: Option<String>,
    pub watermark_scale: f64,
    pub watermark_opacity: i64,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SettingsRecord {
    /// Settings are normalized before they are written, so what is
    /// stored is exactly what loads back.
    fn from(settings: &Settings) -> Self {
        let settings = settings.normalized();
        let watermark = &settings.watermark;
        let export = &settings.export;
        let text = &watermark.text;
        let (custom_x, custom_y) = match watermark.anchor {
            Anchor::Custom { x, y } => (Some(x), Some(y)),
            _ => (None, None),
        };
        Self {
            mode: watermark.mode.as_str().to_owned(),
            position: watermark.anchor.as_str().to_owned(),
            custom_x,
            custom_y,
            rotation_degrees: watermark.rotation_degrees,
            target_width: i64::from(export.sizing.width),
            target_height: i64::from(export.sizing.height),
            scale_percent: i64::from(export.sizing.scale_percent),
            naming_rule: export.naming.as_str().to_owned(),
            prefix: export.prefix.clone(),
            suffix: export.suffix.clone(),
            output_format: export.format.as_str().to_owned(),
            jpeg_quality: i64::from(export.jpeg_quality),
            text: text.content.clone(),
            font_name: text.font.family.clone(),
            font_size: i64::from(text.font.size),
            bold: text.font.bold,
            italic: text.font.italic,
            color: text.color.to_hex(),
            text_opacity: i64::from(text.opacity.percent()),
            shadow: text.shadow,
            stroke: text.stroke,
            watermark_image_path: watermark
                .image
                .asset
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            watermark_scale: watermark.image.scale,
            watermark_opacity: i64::from(watermark.image.opacity.percent()),
        }
    }
}

fn non_negative_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl SettingsRecord {
    /// Rebuild normalized settings. The output directory is not part of
    /// the record and comes back as `None`.
    #[must_use]
    pub fn to_settings(&self) -> Settings {
        let anchor = if self.position.trim().eq_ignore_ascii_case(CUSTOM_POSITION) {
            Anchor::Custom {
                x: self.custom_x.unwrap_or(0),
                y: self.custom_y.unwrap_or(0),
            }
        } else {
            self.position.parse().unwrap_or_default()
        };
        let watermark = WatermarkSpec {
            mode: self.mode.parse().unwrap_or_default(),
            text: TextWatermark {
                content: self.text.clone(),
                font: FontSpec {
                    family: if self.font_name.trim().is_empty() {
                        FontSpec::default().family
                    } else {
                        self.font_name.clone()
                    },
                    size: non_negative_u32(self.font_size),
                    bold: self.bold,
                    italic: self.italic,
                },
                color: self.color.parse::<Color>().unwrap_or(Color::WHITE),
                opacity: Opacity::new(self.text_opacity),
                shadow: self.shadow,
                stroke: self.stroke,
            },
            image: ImageWatermark {
                asset: self
                    .watermark_image_path
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
                scale: self.watermark_scale,
                opacity: Opacity::new(self.watermark_opacity),
            },
            rotation_degrees: self.rotation_degrees,
            anchor,
        };
        let export = ExportSpec {
            naming: self.naming_rule.parse::<NamingRule>().unwrap_or_default(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            format: self.output_format.parse::<OutputFormat>().unwrap_or_default(),
            jpeg_quality: u8::try_from(self.jpeg_quality.clamp(0, 100)).unwrap_or(100),
            sizing: Sizing {
                scale_percent: non_negative_u32(self.scale_percent),
                width: non_negative_u32(self.target_width),
                height: non_negative_u32(self.target_height),
            },
            output_dir: None,
        };
        Settings { watermark, export }.normalized()
    }
}
