//! Rendering a source photo with the current settings.
//!
//! Bridges the pure compositor and the filesystem: resolves the text
//! fallback from the photo's metadata, loads the watermark asset, and
//! logs when the overlay had to be left out.

use std::sync::Arc;

use filigrane_pipeline::{
    Composition, OverlayOutcome, OverlaySource, RenderError, ResizeFilter, Sizing, TextRasterizer,
    WatermarkMode, WatermarkSpec,
};

use crate::metadata::watermark_text;
use crate::source::{SourceImage, load_asset};

/// Renders [`SourceImage`]s with a fixed text rasterizer and resize
/// filter. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct WatermarkRenderer {
    text: Arc<dyn TextRasterizer>,
    filter: ResizeFilter,
}

impl std::fmt::Debug for WatermarkRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkRenderer")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl WatermarkRenderer {
    #[must_use]
    pub fn new(text: Arc<dyn TextRasterizer>) -> Self {
        Self {
            text,
            filter: ResizeFilter::default(),
        }
    }

    /// Use `filter` for asset scaling and export resizing.
    #[must_use]
    pub const fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub const fn filter(&self) -> ResizeFilter {
        self.filter
    }

    /// Render `source` with `spec`, then apply `sizing` if given.
    ///
    /// A missing font or asset leaves the overlay out (logged at warn)
    /// and still returns the base image.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if the base image cannot be drawn on.
    pub fn render(
        &self,
        source: &SourceImage,
        spec: &WatermarkSpec,
        sizing: Option<&Sizing>,
    ) -> Result<Composition, RenderError> {
        let composition = match spec.mode {
            WatermarkMode::Text => {
                let content = watermark_text(&spec.text.content, source.capture_date());
                let overlay = OverlaySource::Text {
                    content: &content,
                    rasterizer: self.text.as_ref(),
                };
                filigrane_pipeline::render(source.image(), spec, overlay, sizing, self.filter)?
            }
            WatermarkMode::Image => match load_asset(spec.image.asset.as_deref()) {
                Ok(asset) => filigrane_pipeline::render(
                    source.image(),
                    spec,
                    OverlaySource::Image(&asset),
                    sizing,
                    self.filter,
                )?,
                Err(reason) => filigrane_pipeline::render(
                    source.image(),
                    spec,
                    OverlaySource::Unavailable(&reason),
                    sizing,
                    self.filter,
                )?,
            },
        };
        if let OverlayOutcome::Omitted(reason) = &composition.overlay {
            tracing::warn!(source = %source.path().display(), %reason, "Watermark omitted");
        }
        Ok(composition)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use filigrane_pipeline::{BlockRasterizer, Dimensions, RgbaImage};

    use super::*;

    fn renderer() -> WatermarkRenderer {
        WatermarkRenderer::new(Arc::new(BlockRasterizer))
    }

    fn source() -> SourceImage {
        SourceImage::from_image(
            "photo.jpg",
            RgbaImage::from_pixel(300, 200, image::Rgba([0, 0, 0, 255])),
            NaiveDate::from_ymd_opt(2022, 3, 4),
        )
    }

    #[test]
    fn empty_text_uses_capture_date() {
        let mut spec = WatermarkSpec::default();
        spec.text.font.size = 10;
        let out = renderer().render(&source(), &spec, None).unwrap();
        // "2022-03-04" is ten 6 px cells wide with the block rasterizer.
        let placement = out.overlay.placement().unwrap();
        assert_eq!(placement.width, 60);
    }

    #[test]
    fn missing_asset_still_renders_base() {
        let spec = WatermarkSpec {
            mode: WatermarkMode::Image,
            image: filigrane_pipeline::ImageWatermark {
                asset: Some(PathBuf::from("/nope/logo.png")),
                ..Default::default()
            },
            ..WatermarkSpec::default()
        };
        let out = renderer().render(&source(), &spec, None).unwrap();
        assert!(matches!(out.overlay, OverlayOutcome::Omitted(_)));
        assert_eq!(Dimensions::of(&out.image), Dimensions::new(300, 200));
    }

    #[test]
    fn sizing_is_applied_when_given() {
        let sizing = Sizing {
            scale_percent: 50,
            ..Sizing::default()
        };
        let out = renderer()
            .render(&source(), &WatermarkSpec::default(), Some(&sizing))
            .unwrap();
        assert_eq!(Dimensions::of(&out.image), Dimensions::new(150, 100));
    }
}
