//! Fixed scale-and-encode step applied to every captured photo before upload.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};

#[derive(Debug, Clone, Copy)]
pub struct CodecOptions {
    /// Longest side after downscaling. Smaller images are left as is.
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            jpeg_quality: 85,
        }
    }
}

/// Decode any supported photo, shrink it to fit `max_dimension`, and
/// re-encode it as JPEG.
pub fn encode_for_transport(photo: &[u8], options: CodecOptions) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(photo).context("failed to decode captured photo")?;

    let scaled = if decoded.width() > options.max_dimension
        || decoded.height() > options.max_dimension
    {
        decoded.resize(
            options.max_dimension,
            options.max_dimension,
            FilterType::Triangle,
        )
    } else {
        decoded
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, options.jpeg_quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .context("failed to encode photo as JPEG")?;

    Ok(encoded)
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
