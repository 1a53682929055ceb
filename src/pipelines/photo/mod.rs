// SPDX-License-Identifier: MPL-2.0

//! Still photo output
//!
//! ```text
//! Camera Backend → latest frame → RGB copy → Encoding → CapturedImage
//!       ↓
//! Preview keeps running until the session is stopped
//! ```
//!
//! The output is the sink side of a capture session: the session controller
//! hands it the most recent full-resolution frame and gets back encoded bytes.

pub mod encoding;

pub use encoding::{EncodingFormat, EncodingQuality, PhotoEncoder};

use crate::backends::camera::types::CameraFrame;
use crate::errors::CaptureError;
use tracing::info;

/// Photo output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhotoSettings {
    pub format: EncodingFormat,
    pub quality: EncodingQuality,
}

/// Photo output attached to a capture session
#[derive(Debug, Clone, Default)]
pub struct PhotoOutput {
    settings: PhotoSettings,
    encoder: PhotoEncoder,
}

impl PhotoOutput {
    pub fn new(settings: PhotoSettings) -> Self {
        Self {
            settings,
            encoder: PhotoEncoder::new(settings.format, settings.quality),
        }
    }

    pub fn settings(&self) -> PhotoSettings {
        self.settings
    }

    /// Turn a raw frame into encoded photo bytes
    pub fn process(&self, frame: &CameraFrame) -> Result<Vec<u8>, CaptureError> {
        info!(
            width = frame.width,
            height = frame.height,
            format = ?frame.format,
            "Processing still frame"
        );

        let image = frame.to_rgb_image().ok_or(CaptureError::EmptyImage)?;
        let data = self.encoder.encode(&image)?;
        if data.is_empty() {
            return Err(CaptureError::EmptyImage);
        }
        Ok(data)
    }
}
