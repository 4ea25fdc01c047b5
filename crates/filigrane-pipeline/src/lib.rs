//! filigrane-pipeline: Pure watermark rendering (sans-IO).
//!
//! Places a text or image watermark on a photo through:
//! decode -> overlay layer -> placement -> composite -> export sizing.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! rasters and byte slices. Fonts, files, persistence and scheduling
//! live in `filigrane-io`.

pub mod composite;
pub mod decode;
pub mod edit;
pub mod geometry;
pub mod overlay;
pub mod resize;
pub mod text;
pub mod types;

pub use composite::{Composition, OverlayOutcome, OverlaySource, compose};
pub use edit::SettingsEdit;
pub use geometry::{DisplayFit, DragSession, MARGIN, Placement};
pub use resize::{ResizeFilter, target_dimensions};
pub use text::{BlockRasterizer, FontRasterizer, TextMetrics, TextRasterizer};
pub use types::{
    Anchor, Color, Dimensions, ExportSpec, FontSpec, GrayImage, ImageWatermark, NamingRule,
    Opacity, OutputFormat, RenderError, RgbaImage, Settings, Sizing, TextWatermark, WatermarkMode,
    WatermarkSpec,
};

/// Composite the watermark and apply export sizing.
///
/// The overlay is drawn at the base image's native resolution, so the
/// geometry matches what the preview shows; `sizing` is applied to the
/// finished raster. Pass `None` for a preview render.
///
/// # Errors
///
/// Returns [`RenderError::InvalidDimensions`] if `base` cannot be drawn
/// on.
pub fn render(
    base: &RgbaImage,
    spec: &WatermarkSpec,
    source: OverlaySource<'_>,
    sizing: Option<&Sizing>,
    filter: ResizeFilter,
) -> Result<Composition, RenderError> {
    let composition = compose(base, spec, source, filter)?;
    let Some(sizing) = sizing else {
        return Ok(composition);
    };
    let target = target_dimensions(Dimensions::of(&composition.image), sizing);
    Ok(Composition {
        image: resize::resize(composition.image, target, filter),
        overlay: composition.overlay,
    })
}
