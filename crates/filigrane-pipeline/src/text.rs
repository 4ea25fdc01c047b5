//! Text measurement and rasterization.
//!
//! A [`TextRasterizer`] turns a string plus a [`FontSpec`] into metrics
//! (for placement) and a coverage mask (for drawing). The mask is
//! `width x (ascent + descent)` with the baseline `ascent` pixels from
//! the top; the placement bounding box only covers `width x ascent`.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::Luma;

use crate::types::{FontSpec, GrayImage, RenderError};

/// Measured extent of a single line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMetrics {
    /// Advance width of the whole string in pixels.
    pub width: u32,
    /// Distance from the top of the line to the baseline.
    pub ascent: u32,
    /// Distance from the baseline to the bottom of the line.
    pub descent: u32,
}

impl TextMetrics {
    /// Full line height (`ascent + descent`).
    #[must_use]
    pub const fn line_height(&self) -> u32 {
        self.ascent + self.descent
    }
}

/// Measures and rasterizes text for a given font selection.
///
/// Implementations must be deterministic: the same font spec and text
/// always produce the same metrics and mask.
pub trait TextRasterizer: Send + Sync {
    /// Measure `text` without drawing it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::FontUnavailable`] if no face can serve
    /// `font`.
    fn measure(&self, font: &FontSpec, text: &str) -> Result<TextMetrics, RenderError>;

    /// Draw `text` into a coverage mask (0 = empty, 255 = fully inked).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::FontUnavailable`] if no face can serve
    /// `font`.
    fn rasterize(&self, font: &FontSpec, text: &str) -> Result<(TextMetrics, GrayImage), RenderError>;
}

/// Rasterizer backed by one loaded font face.
///
/// The family and style flags of the [`FontSpec`] are ignored; only the
/// size is honoured. Family/style resolution happens one level up, in
/// whatever picks the face.
#[derive(Clone)]
pub struct FontRasterizer {
    font: FontArc,
}

impl std::fmt::Debug for FontRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRasterizer").finish_non_exhaustive()
    }
}

impl FontRasterizer {
    /// Wrap an already loaded face.
    #[must_use]
    pub const fn new(font: FontArc) -> Self {
        Self { font }
    }

    /// Load a face from TrueType/OpenType bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::FontUnavailable`] if the bytes are not a
    /// parseable font.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        FontArc::try_from_vec(bytes)
            .map(Self::new)
            .map_err(|e| RenderError::FontUnavailable(e.to_string()))
    }

    /// The underlying face.
    #[must_use]
    pub const fn font(&self) -> &FontArc {
        &self.font
    }
}

impl TextRasterizer for FontRasterizer {
    fn measure(&self, font: &FontSpec, text: &str) -> Result<TextMetrics, RenderError> {
        Ok(measure_with_face(&self.font, font.size, text))
    }

    fn rasterize(&self, font: &FontSpec, text: &str) -> Result<(TextMetrics, GrayImage), RenderError> {
        Ok(rasterize_with_face(&self.font, font.size, text))
    }
}

#[allow(clippy::cast_precision_loss)]
fn px_scale(size: u32) -> PxScale {
    PxScale::from(size.max(1) as f32)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ceil_px(value: f32) -> u32 {
    value.ceil().max(0.0) as u32
}

/// Measure `text` set in `face` at `size` pixels, including kerning.
#[must_use]
pub fn measure_with_face(face: &FontArc, size: u32, text: &str) -> TextMetrics {
    let scaled = face.as_scaled(px_scale(size));
    let mut width = 0.0_f32;
    let mut previous = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    TextMetrics {
        width: ceil_px(width),
        ascent: ceil_px(scaled.ascent()),
        descent: ceil_px(-scaled.descent()),
    }
}

/// Rasterize `text` set in `face` at `size` pixels into a coverage mask.
#[must_use]
pub fn rasterize_with_face(face: &FontArc, size: u32, text: &str) -> (TextMetrics, GrayImage) {
    let metrics = measure_with_face(face, size, text);
    let mut mask = GrayImage::new(metrics.width.max(1), metrics.line_height().max(1));
    imageproc::drawing::draw_text_mut(&mut mask, Luma([255]), 0, 0, px_scale(size), face, text);
    (metrics, mask)
}

/// Font-free rasterizer that inks each non-whitespace character as a
/// solid block.
///
/// Glyph cells are `0.6 * size` wide, the ascent is `0.8 * size` and
/// the descent `0.2 * size`. Used where no font files are available,
/// such as headless tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl BlockRasterizer {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell(size: u32) -> (u32, u32, u32) {
        let size = f64::from(size.max(1));
        let advance = (size * 0.6).round().max(1.0) as u32;
        let ascent = (size * 0.8).round().max(1.0) as u32;
        let descent = (size * 0.2).round() as u32;
        (advance, ascent, descent)
    }
}

impl TextRasterizer for BlockRasterizer {
    fn measure(&self, font: &FontSpec, text: &str) -> Result<TextMetrics, RenderError> {
        let (advance, ascent, descent) = Self::cell(font.size);
        let count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        Ok(TextMetrics {
            width: advance.saturating_mul(count),
            ascent,
            descent,
        })
    }

    fn rasterize(&self, font: &FontSpec, text: &str) -> Result<(TextMetrics, GrayImage), RenderError> {
        let metrics = self.measure(font, text)?;
        let (advance, ascent, _) = Self::cell(font.size);
        let mut mask = GrayImage::new(metrics.width.max(1), metrics.line_height().max(1));
        for (index, ch) in (0u32..).zip(text.chars()) {
            if ch.is_whitespace() {
                continue;
            }
            let left = index * advance;
            // One-pixel gap between neighbouring blocks.
            for x in left..left + advance.saturating_sub(1).max(1) {
                for y in 0..ascent {
                    if x < mask.width() && y < mask.height() {
                        mask.put_pixel(x, y, Luma([255]));
                    }
                }
            }
        }
        Ok((metrics, mask))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn spec(size: u32) -> FontSpec {
        FontSpec {
            size,
            ..FontSpec::default()
        }
    }

    /// A system font to exercise the real rasterizer, when one exists.
    fn system_face() -> Option<FontArc> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .find_map(|path| std::fs::read(path).ok())
        .and_then(|bytes| FontArc::try_from_vec(bytes).ok())
    }

    #[test]
    fn block_metrics_scale_with_size_and_length() {
        let metrics = BlockRasterizer.measure(&spec(10), "abcd").unwrap();
        assert_eq!(
            metrics,
            TextMetrics {
                width: 24,
                ascent: 8,
                descent: 2
            }
        );
        assert_eq!(metrics.line_height(), 10);
    }

    #[test]
    fn block_mask_inks_characters_but_not_spaces() {
        let (metrics, mask) = BlockRasterizer.rasterize(&spec(10), "a b").unwrap();
        assert_eq!(mask.dimensions(), (metrics.width, metrics.line_height()));
        assert_eq!(mask.get_pixel(0, 0).0[0], 255);
        // Second cell is the space.
        assert_eq!(mask.get_pixel(7, 3).0[0], 0);
        assert_eq!(mask.get_pixel(12, 3).0[0], 255);
        // Descent rows stay empty.
        assert_eq!(mask.get_pixel(0, 9).0[0], 0);
    }

    #[test]
    fn block_rasterizer_is_deterministic() {
        let a = BlockRasterizer.rasterize(&spec(24), "2024-05-01").unwrap();
        let b = BlockRasterizer.rasterize(&spec(24), "2024-05-01").unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1.as_raw(), b.1.as_raw());
    }

    #[test]
    fn empty_text_has_zero_width() {
        let metrics = BlockRasterizer.measure(&spec(20), "").unwrap();
        assert_eq!(metrics.width, 0);
        let (_, mask) = BlockRasterizer.rasterize(&spec(20), "").unwrap();
        assert_eq!(mask.width(), 1);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let result = FontRasterizer::from_bytes(vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(RenderError::FontUnavailable(_))));
    }

    #[test]
    fn font_rasterizer_measures_and_inks_real_glyphs() {
        let Some(face) = system_face() else {
            eprintln!("no system font found; skipping");
            return;
        };
        let rasterizer = FontRasterizer::new(face);
        let short = rasterizer.measure(&spec(32), "Hi").unwrap();
        let long = rasterizer.measure(&spec(32), "Hi there").unwrap();
        assert!(long.width > short.width);
        assert!(short.ascent > 0);

        let (metrics, mask) = rasterizer.rasterize(&spec(32), "Hi").unwrap();
        assert_eq!(mask.dimensions(), (metrics.width, metrics.line_height()));
        assert!(mask.pixels().any(|p| p.0[0] > 0), "expected inked pixels");
    }
}
