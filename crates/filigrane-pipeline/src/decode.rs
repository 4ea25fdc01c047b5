//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, GIF) and produces an
//! 8-bit RGBA raster. Both the base photo and the watermark asset go
//! through here.

use crate::types::{Dimensions, RenderError, RgbaImage};

/// Decode raw image bytes into RGBA.
///
/// # Errors
///
/// Returns [`RenderError::EmptyInput`] if `bytes` is empty.
/// Returns [`RenderError::ImageDecode`] if the format is unrecognized or
/// the data is corrupt.
/// Returns [`RenderError::InvalidDimensions`] if the decoded image has a
/// zero-sized axis.
#[must_use = "returns the decoded image"]
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, RenderError> {
    if bytes.is_empty() {
        return Err(RenderError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?.to_rgba8();
    let dimensions = Dimensions::of(&img);
    if dimensions.is_empty() {
        return Err(RenderError::InvalidDimensions(dimensions));
    }
    Ok(img)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(RenderError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(RenderError::ImageDecode(_))));
    }

    #[test]
    fn png_decodes_with_alpha_intact() {
        let img = RgbaImage::from_fn(17, 31, |x, _| image::Rgba([x as u8, 64, 32, 200]));
        let decoded = decode(&encode_png(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn opaque_jpeg_decodes_to_opaque_rgba() {
        let rgb = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 120, 120]));
        let mut buf = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 95)
            .encode_image(&rgb)
            .unwrap();
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert!(decoded.pixels().all(|p| p[3] == 255));
    }
}
