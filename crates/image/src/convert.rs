//! Format conversion with the image crate.

use crate::alpha::{WHITE, flatten_alpha, has_alpha_channel};
use crate::{ImageError, Result, TargetFormat, detect_format};
use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use tracing::debug;

/// Quality used for lossy encoders unless a deployment overrides it.
pub const LOSSY_QUALITY: u8 = 80;

/// The image-processing capability the endpoint delegates to.
///
/// Implementations map valid image bytes plus a target format to equivalent
/// bytes in that format and report malformed input as an error, never a panic.
pub trait ImageConverter: Send + Sync {
    /// Convert `data` into `target`, using `quality` for lossy encoders.
    fn convert(&self, data: &[u8], target: TargetFormat, quality: u8) -> Result<Vec<u8>>;
}

/// Converter backed by the pure-Rust decoders and encoders of the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConverter;

impl ImageConverter for StandardConverter {
    fn convert(&self, data: &[u8], target: TargetFormat, quality: u8) -> Result<Vec<u8>> {
        convert_image(data, target, quality)
    }
}

/// Decode `data` and re-encode it as `target`.
///
/// The input format is taken from the magic bytes when they are recognised,
/// otherwise the decoder guesses.
pub fn convert_image(data: &[u8], target: TargetFormat, quality: u8) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(ImageError::InvalidData("empty input".into()));
    }

    let hint = detect_format(data).ok();
    let img = match hint.and_then(|format| format.decoder_format()) {
        Some(format) => image::load_from_memory_with_format(data, format)?,
        None => image::load_from_memory(data)?,
    };

    debug!(
        source = ?hint,
        target = %target,
        width = img.width(),
        height = img.height(),
        "Decoded image"
    );

    let prepared = prepare_for(img, target);
    encode_image(&prepared, target, quality)
}

/// Bring pixel data into a layout the target encoder accepts.
fn prepare_for(img: DynamicImage, target: TargetFormat) -> DynamicImage {
    if !target.supports_alpha() {
        return match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
            other if has_alpha_channel(&other) => flatten_alpha(&other, WHITE),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
    }

    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) | DynamicImage::ImageLuma8(_) => img,
        DynamicImage::ImageLumaA8(_) if target != TargetFormat::Tiff => img,
        other if has_alpha_channel(&other) => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Encode a DynamicImage to bytes.
fn encode_image(img: &DynamicImage, format: TargetFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());

    let output_format = match format {
        TargetFormat::Jpg | TargetFormat::Jpeg => ImageOutputFormat::Jpeg(quality.clamp(1, 100)),
        TargetFormat::Png => ImageOutputFormat::Png,
        // The bundled WebP encoder is lossless; quality does not apply.
        TargetFormat::WebP => ImageOutputFormat::WebP,
        TargetFormat::Tiff => ImageOutputFormat::Tiff,
    };

    img.write_to(&mut buffer, output_format)
        .map_err(|e| ImageError::Encode(format!("{format}: {e}")))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageFormat;
    use image::{Rgba, RgbaImage};

    fn sample_png() -> Vec<u8> {
        let mut img = RgbaImage::new(4, 3);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 60) as u8, (y * 80) as u8, 120, if x == 0 { 0 } else { 255 }]);
        }
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_convert_to_every_target() {
        let png = sample_png();
        for target in TargetFormat::ALL {
            let out = StandardConverter.convert(&png, target, LOSSY_QUALITY).unwrap();
            let decoded = image::load_from_memory(&out).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (4, 3), "{target}");
        }
    }

    #[test]
    fn test_output_magic_matches_target() {
        let png = sample_png();
        let expected = [
            (TargetFormat::Jpeg, ImageFormat::Jpeg),
            (TargetFormat::Jpg, ImageFormat::Jpeg),
            (TargetFormat::WebP, ImageFormat::WebP),
            (TargetFormat::Tiff, ImageFormat::Tiff),
            (TargetFormat::Png, ImageFormat::Png),
        ];
        for (target, format) in expected {
            let out = convert_image(&png, target, LOSSY_QUALITY).unwrap();
            assert_eq!(detect_format(&out).unwrap(), format);
        }
    }

    #[test]
    fn test_round_trip_back_to_source_format() {
        let png = sample_png();
        let jpeg = convert_image(&png, TargetFormat::Jpeg, LOSSY_QUALITY).unwrap();
        let back = convert_image(&jpeg, TargetFormat::Png, LOSSY_QUALITY).unwrap();
        assert_eq!(detect_format(&back).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let garbage = b"definitely not an image, just some text bytes";
        assert!(convert_image(garbage, TargetFormat::Png, LOSSY_QUALITY).is_err());

        let truncated = &sample_png()[..20];
        assert!(convert_image(truncated, TargetFormat::WebP, LOSSY_QUALITY).is_err());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(
            convert_image(&[], TargetFormat::Png, LOSSY_QUALITY),
            Err(ImageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_lower_quality_is_not_larger() {
        let mut img = image::RgbImage::new(64, 64);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8]);
        }
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buffer, ImageOutputFormat::Png).unwrap();
        let png = buffer.into_inner();

        let high = convert_image(&png, TargetFormat::Jpeg, 95).unwrap();
        let low = convert_image(&png, TargetFormat::Jpeg, 20).unwrap();
        assert!(low.len() <= high.len());
    }
}
