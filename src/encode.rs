//! Codec layer. Every encoder writes into memory; nothing here touches the
//! filesystem so a timed-out or failed encode never leaves a partial file.

use crate::constants::{
    AVIF_SPEED, LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, OXIPNG_PRESET, WEBP_MAX_DIMENSION,
    ZOPFLI_ITERATIONS,
};
use crate::error::{BatchError, Result};
use crate::formats::OutputFormat;
use crate::job::Quality;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use oxipng::{Deflaters, Options};
use std::io::Cursor;
use std::num::NonZeroU8;

/// Encodes `img` as `format` at `quality` and returns the file bytes.
pub fn encode(img: &DynamicImage, format: OutputFormat, quality: Quality) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, quality),
        OutputFormat::Png => encode_png(img, quality),
        OutputFormat::WebP => encode_webp(img, quality),
        OutputFormat::Avif => encode_avif(img, quality),
    }
}

fn encode_error(format: OutputFormat, err: impl ToString) -> BatchError {
    BatchError::Encode {
        format: format.to_string(),
        message: err.to_string(),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value());
    rgb.write_with_encoder(encoder)
        .map_err(|e| encode_error(OutputFormat::Jpeg, e))?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    img.write_to(&mut Cursor::new(&mut raw), ImageFormat::Png)
        .map_err(|e| encode_error(OutputFormat::Png, e))?;

    oxipng::optimize_from_memory(&raw, &png_options(quality))
        .map_err(|e| encode_error(OutputFormat::Png, e))
}

/// PNG is lossless; quality picks how hard the deflater works.
pub fn png_options(quality: Quality) -> Options {
    let mut options = Options::from_preset(OXIPNG_PRESET);
    options.force = true;

    options.deflate = if quality.value() >= 90 {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else if quality.value() >= 70 {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };

    options
}

fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    // image only ships a lossless WebP encoder, so lossy goes through libwebp
    let (width, height) = (img.width(), img.height());
    if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
        return Err(encode_error(
            OutputFormat::WebP,
            format!(
                "{}x{} exceeds the WebP limit of {} pixels per side",
                width, height, WEBP_MAX_DIMENSION
            ),
        ));
    }

    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(&rgba, width, height);
    let data = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| encode_error(OutputFormat::WebP, format!("libwebp: {:?}", e)))?;
    if data.is_empty() {
        return Err(encode_error(OutputFormat::WebP, "libwebp produced no data"));
    }
    Ok(data.to_vec())
}

fn encode_avif(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let mut buf = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality.value());
    rgba.write_with_encoder(encoder)
        .map_err(|e| encode_error(OutputFormat::Avif, e))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        }))
    }

    #[test]
    fn test_jpeg_roundtrips_through_decoder() {
        let bytes = encode(&gradient(64, 48), OutputFormat::Jpeg, Quality::default()).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 128])));
        assert!(encode(&rgba, OutputFormat::Jpeg, Quality::default()).is_ok());
    }

    #[test]
    fn test_png_is_lossless() {
        let img = gradient(32, 32);
        let bytes = encode(&img, OutputFormat::Png, Quality::default()).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn test_webp_signature() {
        let bytes = encode(&gradient(40, 40), OutputFormat::WebP, Quality::default()).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_webp_too_wide_is_an_error() {
        let wide = DynamicImage::new_rgb8(16384, 2);
        match encode(&wide, OutputFormat::WebP, Quality::default()) {
            Err(BatchError::Encode { format, message }) => {
                assert_eq!(format, "WebP");
                assert!(message.contains("16383"));
            }
            other => panic!("expected an encode error, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_webp_at_the_limit_encodes() {
        let edge = DynamicImage::new_rgb8(16383, 1);
        assert!(encode(&edge, OutputFormat::WebP, Quality::default()).is_ok());
    }

    #[test]
    fn test_avif_signature() {
        let bytes = encode(&gradient(16, 16), OutputFormat::Avif, Quality::default()).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
    }

    #[test]
    fn test_lower_jpeg_quality_is_not_larger() {
        let img = gradient(128, 128);
        let high = encode(&img, OutputFormat::Jpeg, Quality::new(80).unwrap()).unwrap();
        let low = encode(&img, OutputFormat::Jpeg, Quality::new(40).unwrap()).unwrap();
        assert!(low.len() <= high.len());
    }

    #[test]
    fn test_png_options_by_quality() {
        assert!(matches!(
            png_options(Quality::new(95).unwrap()).deflate,
            Deflaters::Zopfli { .. }
        ));
        assert!(matches!(
            png_options(Quality::new(80).unwrap()).deflate,
            Deflaters::Libdeflater { compression: 12 }
        ));
        assert!(matches!(
            png_options(Quality::new(40).unwrap()).deflate,
            Deflaters::Libdeflater { compression: 8 }
        ));
    }
}
