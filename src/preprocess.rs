//! Upload validation and normalization.
//!
//! Every image leaving this module is a standard-base64 JPEG whose longest
//! edge is at most [`MAX_EDGE`] pixels.

use crate::error::ValidationError;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Longest edge, in pixels, of a processed image.
pub const MAX_EDGE: u32 = 1024;

/// Upload ceiling in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Content types accepted for upload.
pub const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png"];

const JPEG_QUALITY: u8 = 90;

/// Validate an upload and return it as a base64 JPEG.
///
/// Checks run in this order and before any decoding: empty, content type,
/// size. An image within bounds is not resampled; a JPEG within bounds is
/// returned byte-for-byte. Larger images are scaled by
/// `min(1024 / w, 1024 / h)` with a bilinear filter.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing the first failed check.
pub fn process(raw: &[u8], content_type: &str, size_bytes: u64) -> Result<String, ValidationError> {
    if size_bytes == 0 || raw.is_empty() {
        return Err(ValidationError::Empty);
    }

    if !is_allowed_type(content_type) {
        return Err(ValidationError::UnsupportedFormat(content_type.to_string()));
    }

    // The declared size may understate the buffer.
    let size = size_bytes.max(raw.len() as u64);
    if size > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            limit: MAX_FILE_SIZE,
        });
    }

    let img =
        image::load_from_memory(raw).map_err(|e| ValidationError::Undecodable(e.to_string()))?;
    let (width, height) = (img.width(), img.height());

    if width <= MAX_EDGE && height <= MAX_EDGE {
        if matches!(image::guess_format(raw), Ok(ImageFormat::Jpeg)) {
            tracing::debug!(width, height, "Image within bounds, passing through");
            return Ok(encode_base64(raw));
        }
        tracing::debug!(width, height, "Image within bounds, converting to JPEG");
        return encode_jpeg(&img).map(|jpeg| encode_base64(&jpeg));
    }

    let (new_width, new_height) = fit_within(width, height, MAX_EDGE);
    tracing::debug!(width, height, new_width, new_height, "Resizing image");
    let resized = img.resize_exact(new_width, new_height, FilterType::Triangle);
    encode_jpeg(&resized).map(|jpeg| encode_base64(&jpeg))
}

/// True for `image/jpeg` and `image/png`, ignoring ASCII case, surrounding
/// whitespace and any MIME parameters (`image/PNG; charset=binary` is
/// accepted).
pub fn is_allowed_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    ALLOWED_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

/// Target dimensions for an image whose longest edge exceeds `max_edge`.
///
/// Integer arithmetic so the result is the truncated exact scale, never
/// larger than `max_edge` and never zero.
fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }
    let scale_edge = |edge: u32, longest: u32| -> u32 {
        let scaled = u64::from(edge) * u64::from(max_edge) / u64::from(longest);
        (scaled as u32).max(1)
    };
    if width >= height {
        (max_edge, scale_edge(height, width))
    } else {
        (scale_edge(width, height), max_edge)
    }
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, ValidationError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| ValidationError::Encode(e.to_string()))?;
    Ok(buf)
}

fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
