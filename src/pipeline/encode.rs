//! Image encoding: `DynamicImage` → JPEG / PNG / WebP bytes.
//!
//! JPEG honours the quality preset. PNG and WebP are written lossless by the
//! `image` crate, so the preset has no effect on them.

use crate::config::{ImageFormat, ImageOptions};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page in the requested format.
pub fn encode_image(
    img: &DynamicImage,
    options: &ImageOptions,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();

    match options.format {
        ImageFormat::Jpg => {
            // JPEG has no alpha channel; flatten first.
            let rgb = img.to_rgb8();
            let quality = options.quality.jpeg_quality();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Webp => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::WebP)?;
        }
    }

    debug!(
        "Encoded {}x{} image → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        options.format.extension()
    );
    Ok(buf)
}

/// Encode an arbitrary image as baseline JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let rgb = img.to_rgb8();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;
    Ok(buf)
}
