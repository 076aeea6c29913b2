use crate::error::{BatchError, Result};
use crate::job::{Dimensions, Gravity, Placement};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader};
use std::path::Path;
use tracing::debug;

/// Decodes the overlay and scales it to `size`. Called once per run, not
/// once per source image.
pub fn load_overlay(path: &Path, size: Dimensions) -> Result<DynamicImage> {
    let reader = ImageReader::open(path).map_err(|e| {
        BatchError::InvalidConfig(format!("cannot open watermark {:?}: {}", path, e))
    })?;
    let overlay = reader
        .with_guessed_format()
        .map_err(|e| BatchError::InvalidConfig(format!("cannot read watermark {:?}: {}", path, e)))?
        .decode()
        .map_err(|e| {
            BatchError::InvalidConfig(format!("cannot decode watermark {:?}: {}", path, e))
        })?;

    debug!(
        "Loaded watermark {:?} ({}x{}) -> {}",
        path,
        overlay.width(),
        overlay.height(),
        size
    );
    Ok(overlay.resize_exact(size.width, size.height, FilterType::Lanczos3))
}

/// Top-left corner of the overlay on the base image.
pub fn overlay_origin(
    base: (u32, u32),
    overlay: (u32, u32),
    placement: Placement,
) -> Result<(i64, i64)> {
    let (bw, bh) = base;
    let (ow, oh) = overlay;

    if ow > bw || oh > bh {
        return Err(BatchError::UnsupportedOperation(format!(
            "watermark {}x{} is larger than the image {}x{}",
            ow, oh, bw, bh
        )));
    }

    let origin = match placement {
        Placement::Offset { left, top } => {
            if left >= bw || top >= bh {
                return Err(BatchError::UnsupportedOperation(format!(
                    "watermark offset {},{} is outside the image {}x{}",
                    left, top, bw, bh
                )));
            }
            (left as i64, top as i64)
        }
        Placement::Gravity(gravity) => {
            let right = (bw - ow) as i64;
            let bottom = (bh - oh) as i64;
            match gravity {
                Gravity::NorthWest => (0, 0),
                Gravity::NorthEast => (right, 0),
                Gravity::SouthWest => (0, bottom),
                Gravity::SouthEast => (right, bottom),
                Gravity::Centre => (right / 2, bottom / 2),
            }
        }
    };

    Ok(origin)
}

/// Composites `overlay` onto a copy of `base`. Overlay pixels that fall past
/// the right or bottom edge are clipped.
pub fn apply_watermark(
    base: &DynamicImage,
    overlay: &DynamicImage,
    placement: Placement,
) -> Result<DynamicImage> {
    let (x, y) = overlay_origin(
        (base.width(), base.height()),
        (overlay.width(), overlay.height()),
        placement,
    )?;

    let mut canvas = base.to_rgba8();
    imageops::overlay(&mut canvas, &overlay.to_rgba8(), x, y);
    Ok(DynamicImage::ImageRgba8(canvas))
}
