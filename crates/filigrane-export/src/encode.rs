//! Raster encoding.
//!
//! PNG keeps the alpha channel. JPEG has none, so the alpha channel is
//! dropped and the color channels are written as they are.

use filigrane_pipeline::{OutputFormat, RgbaImage};
use image::ImageEncoder;

/// Errors that can occur while encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The encoder rejected the image.
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Encode `image` as `format`.
///
/// `jpeg_quality` is clamped into `1..=100` and ignored for PNG.
///
/// # Errors
///
/// Returns [`EncodeError::Image`] if the encoder fails.
#[must_use = "returns the encoded bytes"]
pub fn encode(image: &RgbaImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => {
            image::codecs::png::PngEncoder::new(&mut buf).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgba8,
            )?;
        }
        OutputFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100))
                .encode_image(&rgb)?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(64, 48, |x, y| image::Rgba([(x * 4) as u8, (y * 5) as u8, 128, 255]))
    }

    #[test]
    fn png_round_trips_losslessly() {
        let img = RgbaImage::from_fn(5, 3, |x, _| image::Rgba([10, 20, 30, (x * 50) as u8]));
        let bytes = encode(&img, OutputFormat::Png, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn jpeg_is_decodable_with_same_dimensions() {
        let bytes = encode(&gradient(), OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn lower_jpeg_quality_yields_smaller_files() {
        let high = encode(&gradient(), OutputFormat::Jpeg, 95).unwrap();
        let low = encode(&gradient(), OutputFormat::Jpeg, 10).unwrap();
        assert!(low.len() < high.len(), "low {} >= high {}", low.len(), high.len());
    }

    #[test]
    fn zero_quality_is_clamped_not_rejected() {
        let bytes = encode(&gradient(), OutputFormat::Jpeg, 0).unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }
}
