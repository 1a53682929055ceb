// SPDX-License-Identifier: GPL-3.0-only

//! Still photo encoding
//!
//! - JPEG (with quality control)
//! - PNG (lossless)
//!
//! Encoding is CPU-bound and runs on the worker context together with the
//! frame grab, never on the UI thread.

use crate::errors::CaptureError;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    /// Format matching a file extension, case-insensitive
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(EncodingFormat::Jpeg),
            "png" => Some(EncodingFormat::Png),
            _ => None,
        }
    }

    /// Convert to image crate's ImageFormat
    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            EncodingFormat::Jpeg => ImageFormat::Jpeg,
            EncodingFormat::Png => ImageFormat::Png,
        }
    }
}

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Photo encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    quality: EncodingQuality,
}

impl PhotoEncoder {
    /// Create an encoder for the given format and quality
    pub fn new(format: EncodingFormat, quality: EncodingQuality) -> Self {
        Self { format, quality }
    }

    /// Encode an RGB image into the configured container
    pub fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, CaptureError> {
        let data = match self.format {
            EncodingFormat::Jpeg => Self::encode_jpeg(image, self.quality)?,
            EncodingFormat::Png => Self::encode_png(image)?,
        };

        debug!(
            size = data.len(),
            width = image.width(),
            height = image.height(),
            format = ?self.format,
            "Encoding complete"
        );
        Ok(data)
    }

    /// Encode image as JPEG
    fn encode_jpeg(image: &RgbImage, quality: EncodingQuality) -> Result<Vec<u8>, CaptureError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CaptureError::Encoding(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }

    /// Encode image as PNG
    fn encode_png(image: &RgbImage) -> Result<Vec<u8>, CaptureError> {
        let mut buffer = Vec::new();

        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| CaptureError::Encoding(format!("PNG encoding failed: {}", e)))?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(EncodingFormat::from_extension("JPEG"), Some(EncodingFormat::Jpeg));
        assert_eq!(EncodingFormat::from_extension("png"), Some(EncodingFormat::Png));
        assert_eq!(EncodingFormat::from_extension("tiff"), None);
    }

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Medium.jpeg_quality(), 80);
        assert_eq!(EncodingQuality::High.jpeg_quality(), 92);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 98);
    }

    #[test]
    fn test_encoded_jpeg_decodes() {
        let image = RgbImage::from_pixel(8, 6, image::Rgb([200, 10, 10]));
        let encoder = PhotoEncoder::new(EncodingFormat::Jpeg, EncodingQuality::Maximum);
        let bytes = encoder.encode(&image).unwrap();

        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_png_is_lossless() {
        let image = RgbImage::from_fn(4, 4, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let encoder = PhotoEncoder::new(EncodingFormat::Png, EncodingQuality::Low);
        let bytes = encoder.encode(&image).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.as_raw(), image.as_raw());
    }
}
