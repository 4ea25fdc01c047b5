//! Overlay layer construction.
//!
//! Builds the straight-alpha RGBA layer that gets composited onto the
//! base image: the text with its optional shadow and outline passes, or
//! the scaled watermark image. Layers are built at full strength; the
//! configured opacity is applied when the layer is drawn.

use image::Rgba;

use crate::geometry::{image_bounds, text_bounds};
use crate::resize::ResizeFilter;
use crate::text::TextMetrics;
use crate::types::{Color, Dimensions, GrayImage, RgbaImage, TextWatermark};

/// Shadow displacement in pixels, to the right and down.
pub const SHADOW_OFFSET: u32 = 2;

/// Shadow strength relative to the glyph coverage.
pub const SHADOW_ALPHA: f32 = 0.5;

/// Outline thickness; the mask is stamped this far in each direction.
pub const STROKE_WIDTH: u32 = 1;

/// A rendered overlay ready to be placed.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    /// Straight-alpha pixels, including any shadow/outline padding.
    pub pixels: RgbaImage,
    /// Size of the content bounding box used for placement.
    pub content: Dimensions,
    /// Position of the content box's top-left corner within `pixels`.
    pub inset: (u32, u32),
}

/// Build the layer for a text watermark from its coverage mask.
///
/// Passes, bottom to top: shadow (black, offset by [`SHADOW_OFFSET`],
/// at [`SHADOW_ALPHA`]), outline (the mask shifted one pixel left,
/// right, up and down in the fill's contrasting color), fill.
#[must_use]
pub fn text_layer(mask: &GrayImage, metrics: &TextMetrics, text: &TextWatermark) -> OverlayLayer {
    let pad = STROKE_WIDTH;
    let width = mask.width() + 2 * pad + SHADOW_OFFSET;
    let height = mask.height() + 2 * pad + SHADOW_OFFSET;
    let mut pixels = RgbaImage::new(width, height);
    let origin = i64::from(pad);

    if text.shadow {
        let shadow = origin + i64::from(SHADOW_OFFSET);
        stamp(&mut pixels, mask, (shadow, shadow), Color::BLACK, SHADOW_ALPHA);
    }
    if text.stroke {
        let outline = text.color.contrasting();
        let reach = i64::from(STROKE_WIDTH);
        for (dx, dy) in [(-reach, 0), (reach, 0), (0, -reach), (0, reach)] {
            stamp(&mut pixels, mask, (origin + dx, origin + dy), outline, 1.0);
        }
    }
    stamp(&mut pixels, mask, (origin, origin), text.color, 1.0);

    OverlayLayer {
        pixels,
        content: text_bounds(metrics),
        inset: (pad, pad),
    }
}

/// Build the layer for an image watermark scaled by `scale`.
#[must_use]
pub fn image_layer(asset: &RgbaImage, scale: f64, filter: ResizeFilter) -> OverlayLayer {
    let content = image_bounds(Dimensions::of(asset), scale);
    let pixels = crate::resize::resize(asset.clone(), content, filter);
    OverlayLayer {
        pixels,
        content,
        inset: (0, 0),
    }
}

/// Paint `color` through `mask` onto `layer` with its top-left at
/// `offset`, scaling coverage by `alpha`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn stamp(layer: &mut RgbaImage, mask: &GrayImage, offset: (i64, i64), color: Color, alpha: f32) {
    for (x, y, coverage) in mask.enumerate_pixels() {
        let coverage = coverage.0[0];
        if coverage == 0 {
            continue;
        }
        let (Ok(lx), Ok(ly)) = (
            u32::try_from(i64::from(x) + offset.0),
            u32::try_from(i64::from(y) + offset.1),
        ) else {
            continue;
        };
        if lx >= layer.width() || ly >= layer.height() {
            continue;
        }
        let a = (f32::from(coverage) * alpha).round().clamp(0.0, 255.0) as u8;
        blend_over(layer.get_pixel_mut(lx, ly), Rgba([color.r, color.g, color.b, a]));
    }
}

/// Straight-alpha source-over.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = f32::from(src[3]) / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = da.mul_add(1.0 - sa, sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = f32::from(src[c]).mul_add(sa, f32::from(dst[c]) * da * (1.0 - sa)) / out_a;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    *dst = Rgba(out);
}
