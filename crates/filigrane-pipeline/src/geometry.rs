//! Watermark placement geometry.
//!
//! Maps an [`Anchor`] plus the base image and overlay content sizes to
//! a pixel-space placement rectangle, and converts pointer positions
//! between a scaled-to-fit display surface and base-image coordinates.
//!
//! Everything here is a pure function of its arguments: identical
//! inputs always yield identical placements.

use crate::text::TextMetrics;
use crate::types::{Anchor, Dimensions, HorizontalAlign, VerticalAlign};

/// Distance in pixels between a preset-anchored overlay and the image
/// edge(s) it is anchored to.
pub const MARGIN: i32 = 20;

/// Resolved overlay rectangle in base-image pixel space.
///
/// `x`/`y` is the top-left corner of the content bounding box. Preset
/// anchors may yield negative coordinates when the content is larger
/// than the image minus its margins; custom anchors never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Geometric center of the content box. Rotation pivots here.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center(self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Exclusive right edge.
    #[must_use]
    pub fn right(self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub fn bottom(self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Whether a base-image pixel falls inside the (unrotated) box.
    #[must_use]
    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && i64::from(x) < self.right() && i64::from(y) < self.bottom()
    }

    /// Whether the whole box lies inside an image of `bounds`.
    #[must_use]
    pub fn is_within(self, bounds: Dimensions) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= i64::from(bounds.width)
            && self.bottom() <= i64::from(bounds.height)
    }

    /// The top-left origin as a tuple.
    #[must_use]
    pub const fn origin(self) -> (i32, i32) {
        (self.x, self.y)
    }
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Bounding box of a text overlay: the string width by the font ascent.
#[must_use]
pub const fn text_bounds(metrics: &TextMetrics) -> Dimensions {
    Dimensions::new(metrics.width, metrics.ascent)
}

/// Bounding box of an image overlay: native size times `scale`, each
/// axis rounded and at least one pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn image_bounds(asset: Dimensions, scale: f64) -> Dimensions {
    let axis = |native: u32| (f64::from(native) * scale).round().max(1.0) as u32;
    Dimensions::new(axis(asset.width), axis(asset.height))
}

/// Clamp a custom top-left origin so the content stays inside the base
/// image: `0 <= x <= base.width - content.width`, likewise for `y`.
///
/// When the content is larger than the image on an axis, the origin on
/// that axis is pinned to 0.
#[must_use]
pub fn clamp_origin(x: i32, y: i32, base: Dimensions, content: Dimensions) -> (i32, i32) {
    let max_x = (i64::from(base.width) - i64::from(content.width)).max(0);
    let max_y = (i64::from(base.height) - i64::from(content.height)).max(0);
    (
        saturate(i64::from(x).clamp(0, max_x)),
        saturate(i64::from(y).clamp(0, max_y)),
    )
}

/// Resolve an anchor to a placement rectangle.
///
/// Presets keep [`MARGIN`] pixels from the edges they hug and center
/// on the other axis with `(dimension - content) / 2`. Custom anchors
/// use their stored origin, clamped with [`clamp_origin`].
#[must_use]
pub fn resolve_placement(anchor: Anchor, base: Dimensions, content: Dimensions) -> Placement {
    let (x, y) = match (anchor, anchor.alignment()) {
        (Anchor::Custom { x, y }, _) => clamp_origin(x, y, base, content),
        (_, Some((horizontal, vertical))) => {
            let free_w = i64::from(base.width) - i64::from(content.width);
            let free_h = i64::from(base.height) - i64::from(content.height);
            let margin = i64::from(MARGIN);
            let x = match horizontal {
                HorizontalAlign::Left => margin,
                HorizontalAlign::Center => free_w / 2,
                HorizontalAlign::Right => free_w - margin,
            };
            let y = match vertical {
                VerticalAlign::Top => margin,
                VerticalAlign::Middle => free_h / 2,
                VerticalAlign::Bottom => free_h - margin,
            };
            (saturate(x), saturate(y))
        }
        (_, None) => (0, 0),
    };
    Placement {
        x,
        y,
        width: content.width,
        height: content.height,
    }
}

/// Wrap a rotation into `-180.0..180.0`. Non-finite input becomes 0.
#[must_use]
pub fn normalize_rotation(degrees: f64) -> f64 {
    if degrees.is_finite() {
        (degrees + 180.0).rem_euclid(360.0) - 180.0
    } else {
        0.0
    }
}

/// The clockwise angle to draw with, in `(0, 360)`, or `None` when the
/// rotation is a whole number of turns and the overlay is drawn
/// untransformed.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn draw_rotation(degrees: f64) -> Option<f32> {
    if !degrees.is_finite() {
        return None;
    }
    let turned = degrees.rem_euclid(360.0);
    if turned.abs() < 1e-9 || (360.0 - turned).abs() < 1e-9 {
        None
    } else {
        Some(turned as f32)
    }
}

/// A base image fitted uniformly (letterboxed) into a display surface.
///
/// `scale = min(display.width / base.width, display.height / base.height)`;
/// the drawn image is centered, leaving equal bars on the slack axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFit {
    base: Dimensions,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl DisplayFit {
    /// Fit `base` into `display`. Returns `None` if either has a zero
    /// axis.
    #[must_use]
    pub fn new(display: Dimensions, base: Dimensions) -> Option<Self> {
        if display.is_empty() || base.is_empty() {
            return None;
        }
        let (dw, dh) = (f64::from(display.width), f64::from(display.height));
        let (bw, bh) = (f64::from(base.width), f64::from(base.height));
        let scale = (dw / bw).min(dh / bh);
        Some(Self {
            base,
            scale,
            offset_x: bw.mul_add(-scale, dw) / 2.0,
            offset_y: bh.mul_add(-scale, dh) / 2.0,
        })
    }

    /// Display pixels per base pixel.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Letterbox offset of the drawn image on the display surface.
    #[must_use]
    pub const fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// The fitted base image dimensions.
    #[must_use]
    pub const fn base(&self) -> Dimensions {
        self.base
    }

    /// Map a display-surface point to base-image pixels (truncating).
    ///
    /// Points in the letterbox bars map outside `0..base`; callers
    /// clamp as needed.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_base(&self, display_x: f64, display_y: f64) -> (i32, i32) {
        // The epsilon absorbs float error so to_base(to_display(p)) == p.
        let axis = |d: f64, offset: f64| {
            let b = ((d - offset) / self.scale + 1e-9).floor();
            b.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
        };
        (
            axis(display_x, self.offset_x),
            axis(display_y, self.offset_y),
        )
    }

    /// Map a base-image pixel to its display-surface position.
    #[must_use]
    pub fn to_display(&self, base_x: i32, base_y: i32) -> (f64, f64) {
        (
            f64::from(base_x).mul_add(self.scale, self.offset_x),
            f64::from(base_y).mul_add(self.scale, self.offset_y),
        )
    }
}

/// An in-progress drag of the overlay on the display surface.
///
/// Remembers where inside the content box the pointer grabbed it, so
/// the box moves with the pointer instead of jumping its corner to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    grab_dx: i32,
    grab_dy: i32,
}

impl DragSession {
    /// Start a drag if the pointer is over the current placement.
    #[must_use]
    pub fn begin(fit: &DisplayFit, display_x: f64, display_y: f64, placement: Placement) -> Option<Self> {
        let (bx, by) = fit.to_base(display_x, display_y);
        placement.contains(bx, by).then(|| Self {
            grab_dx: bx.saturating_sub(placement.x),
            grab_dy: by.saturating_sub(placement.y),
        })
    }

    /// New clamped top-left origin for the pointer's current position.
    #[must_use]
    pub fn update(
        &self,
        fit: &DisplayFit,
        display_x: f64,
        display_y: f64,
        content: Dimensions,
    ) -> (i32, i32) {
        let (bx, by) = fit.to_base(display_x, display_y);
        clamp_origin(
            bx.saturating_sub(self.grab_dx),
            by.saturating_sub(self.grab_dy),
            fit.base(),
            content,
        )
    }
}
