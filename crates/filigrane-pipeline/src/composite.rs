//! Compositor.
//!
//! Draws the watermark overlay onto a base raster. The function is pure:
//! it borrows the base image and the spec and returns a new raster, so
//! any number of renders may run concurrently.
//!
//! The overlay is built as a straight-alpha layer (see [`crate::overlay`])
//! and drawn with tiny-skia, which handles opacity and the rotation
//! about the content's center in one `draw_pixmap` call.

use tiny_skia::{BlendMode, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::geometry::{Placement, draw_rotation, resolve_placement};
use crate::overlay::{OverlayLayer, image_layer, text_layer};
use crate::resize::ResizeFilter;
use crate::text::TextRasterizer;
use crate::types::{Dimensions, RenderError, RgbaImage, WatermarkSpec};

/// What to draw as the overlay, already resolved by the caller.
///
/// The text content must already have any capture-date fallback
/// applied; the asset must already be decoded.
#[derive(Clone, Copy)]
pub enum OverlaySource<'a> {
    /// Draw `content` with the spec's text parameters.
    Text {
        content: &'a str,
        rasterizer: &'a dyn TextRasterizer,
    },
    /// Draw a decoded watermark image with the spec's image parameters.
    Image(&'a RgbaImage),
    /// The overlay could not be prepared (missing or unreadable asset).
    /// The base image is still rendered.
    Unavailable(&'a str),
}

impl std::fmt::Debug for OverlaySource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { content, .. } => f.debug_struct("Text").field("content", content).finish_non_exhaustive(),
            Self::Image(asset) => f.debug_tuple("Image").field(&Dimensions::of(asset)).finish(),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// Whether the overlay made it onto the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// Drawn at this (unrotated) placement in base-image pixels.
    Drawn(Placement),
    /// Skipped; the reason is meant for logs.
    Omitted(String),
}

impl OverlayOutcome {
    /// The placement, if the overlay was drawn.
    #[must_use]
    pub const fn placement(&self) -> Option<Placement> {
        match self {
            Self::Drawn(placement) => Some(*placement),
            Self::Omitted(_) => None,
        }
    }
}

/// Result of a successful composite.
#[derive(Debug, Clone)]
pub struct Composition {
    pub image: RgbaImage,
    pub overlay: OverlayOutcome,
}

/// Composite the overlay described by `spec` and `source` onto `base`.
///
/// Geometry is resolved in `base`'s pixel space. Overlay failures (font
/// or asset) are reported through [`Composition::overlay`] rather than
/// as errors.
///
/// # Errors
///
/// Returns [`RenderError::InvalidDimensions`] if `base` has a zero-sized
/// axis or is too large to allocate a drawing surface for.
pub fn compose(
    base: &RgbaImage,
    spec: &WatermarkSpec,
    source: OverlaySource<'_>,
    filter: ResizeFilter,
) -> Result<Composition, RenderError> {
    let dimensions = Dimensions::of(base);
    if dimensions.is_empty() {
        return Err(RenderError::InvalidDimensions(dimensions));
    }
    let spec = spec.normalized();

    let layer = match build_layer(&spec, source, filter) {
        Ok(layer) => layer,
        Err(reason) => {
            return Ok(Composition {
                image: base.clone(),
                overlay: OverlayOutcome::Omitted(reason),
            });
        }
    };

    let placement = resolve_placement(spec.anchor, dimensions, layer.content);
    let opacity = spec.opacity();
    if opacity.percent() == 0 {
        return Ok(Composition {
            image: base.clone(),
            overlay: OverlayOutcome::Drawn(placement),
        });
    }

    let mut canvas = to_pixmap(base).ok_or(RenderError::InvalidDimensions(dimensions))?;
    let Some(overlay) = to_pixmap(&layer.pixels) else {
        return Ok(Composition {
            image: base.clone(),
            overlay: OverlayOutcome::Omitted(format!(
                "overlay of {} cannot be drawn",
                Dimensions::of(&layer.pixels)
            )),
        });
    };

    let rotation = draw_rotation(spec.rotation_degrees);
    let transform = rotation.map_or_else(Transform::identity, |degrees| {
        let (cx, cy) = placement.center();
        Transform::from_rotate_at(degrees, cx, cy)
    });
    let paint = PixmapPaint {
        opacity: opacity.fraction(),
        blend_mode: BlendMode::SourceOver,
        quality: if rotation.is_some() {
            FilterQuality::Bilinear
        } else {
            FilterQuality::Nearest
        },
    };
    let (inset_x, inset_y) = layer_inset(&layer);
    canvas.draw_pixmap(
        placement.x.saturating_sub(inset_x),
        placement.y.saturating_sub(inset_y),
        overlay.as_ref(),
        &paint,
        transform,
        None,
    );

    Ok(Composition {
        image: from_pixmap(&canvas).ok_or(RenderError::InvalidDimensions(dimensions))?,
        overlay: OverlayOutcome::Drawn(placement),
    })
}

fn build_layer(
    spec: &WatermarkSpec,
    source: OverlaySource<'_>,
    filter: ResizeFilter,
) -> Result<OverlayLayer, String> {
    match source {
        OverlaySource::Text { content, rasterizer } => {
            if content.is_empty() {
                return Err("watermark text is empty".to_owned());
            }
            let (metrics, mask) = rasterizer
                .rasterize(&spec.text.font, content)
                .map_err(|e| e.to_string())?;
            Ok(text_layer(&mask, &metrics, &spec.text))
        }
        OverlaySource::Image(asset) => {
            if Dimensions::of(asset).is_empty() {
                return Err("watermark image has no pixels".to_owned());
            }
            Ok(image_layer(asset, spec.image.scale, filter))
        }
        OverlaySource::Unavailable(reason) => Err(reason.to_owned()),
    }
}

fn layer_inset(layer: &OverlayLayer) -> (i32, i32) {
    let axis = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
    (axis(layer.inset.0), axis(layer.inset.1))
}

/// Straight RGBA to a premultiplied pixmap.
fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    let data = pixmap.data_mut();
    data.copy_from_slice(image.as_raw());
    for pixel in data.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        for channel in &mut pixel[..3] {
            *channel = channel_u8((u16::from(*channel) * alpha + 127) / 255);
        }
    }
    Some(pixmap)
}

/// Premultiplied pixmap back to straight RGBA.
fn from_pixmap(pixmap: &Pixmap) -> Option<RgbaImage> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut data = pixmap.data().to_vec();
    for pixel in data.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        if alpha == 0 {
            pixel[..3].fill(0);
            continue;
        }
        for channel in &mut pixel[..3] {
            *channel = channel_u8((u16::from(*channel) * 255 + alpha / 2) / alpha);
        }
    }
    RgbaImage::from_raw(width, height, data)
}

fn channel_u8(value: u16) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}
