// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
///
/// Both variants drive GStreamer; they differ in the source element that
/// opens the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// PipeWire backend (modern Linux standard, works inside Flatpak)
    #[default]
    PipeWire,
    /// Direct V4L2 device access
    V4l2,
}

impl CameraBackendType {
    /// GStreamer source element used to open devices of this backend
    pub fn source_element(&self) -> &'static str {
        match self {
            CameraBackendType::PipeWire => "pipewiresrc",
            CameraBackendType::V4l2 => "v4l2src",
        }
    }
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::PipeWire => write!(f, "PipeWire"),
            CameraBackendType::V4l2 => write!(f, "V4L2"),
        }
    }
}

/// Physical mounting position of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraPosition {
    /// Rear-facing sensor (phones, tablets)
    Back,
    /// User-facing sensor
    Front,
    /// Plugged-in camera such as a USB webcam
    External,
    /// The device does not report a location
    #[default]
    Unspecified,
}

impl CameraPosition {
    /// Parse the location string reported by libcamera / PipeWire
    pub fn from_location(location: &str) -> Self {
        match location.trim().to_ascii_lowercase().as_str() {
            "back" | "rear" => CameraPosition::Back,
            "front" => CameraPosition::Front,
            "external" => CameraPosition::External,
            _ => CameraPosition::Unspecified,
        }
    }

    /// Preference rank when picking the capture device (lower wins)
    ///
    /// `None` for front cameras, which are never used for capture. Desktop
    /// webcams rarely report a location and count as back-facing.
    pub fn capture_rank(&self) -> Option<u8> {
        match self {
            CameraPosition::Back => Some(0),
            CameraPosition::External => Some(1),
            CameraPosition::Unspecified => Some(2),
            CameraPosition::Front => None,
        }
    }
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Back => write!(f, "back"),
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::External => write!(f, "external"),
            CameraPosition::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String, // PipeWire node serial or /dev/videoN
    pub position: CameraPosition,
}

/// A camera device wrapped as a session input
///
/// Created by [`super::CameraBackend::open_input`] once the device has been
/// probed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub device: CameraDevice,
    pub backend: CameraBackendType,
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel), what the preview pipeline negotiates
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (monochrome and IR cameras)
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA => 4,
            Self::RGB24 => 3,
            Self::Gray8 => 1,
        }
    }

    /// Parse format from GStreamer format string
    pub fn from_gst_format(format: &str) -> Option<Self> {
        match format {
            "RGBA" | "RGBx" => Some(Self::RGBA),
            "RGB" => Some(Self::RGB24),
            "GRAY8" | "GREY" | "Y8" => Some(Self::Gray8),
            _ => None,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, `stride` bytes per row
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Sample one pixel as RGB, clamping coordinates to the frame
    pub fn sample_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let idx = (y * self.stride + x * self.format.bytes_per_pixel()) as usize;
        let data = &self.data;

        match self.format {
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                if idx + 2 < data.len() {
                    (data[idx], data[idx + 1], data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::Gray8 => match data.get(idx) {
                Some(&v) => (v, v, v),
                None => (0, 0, 0),
            },
        }
    }

    /// Copy the frame into a tightly packed RGB image
    ///
    /// Returns `None` when the buffer is shorter than the advertised geometry.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let bpp = self.format.bytes_per_pixel() as usize;
        let row_bytes = self.width as usize * bpp;
        let stride = self.stride as usize;
        if self.width == 0 || self.height == 0 || stride < row_bytes {
            return None;
        }
        let needed = stride * (self.height as usize - 1) + row_bytes;
        if self.data.len() < needed {
            return None;
        }

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in self.data.chunks(stride).take(self.height as usize) {
            for px in row[..row_bytes].chunks_exact(bpp) {
                match self.format {
                    PixelFormat::RGBA | PixelFormat::RGB24 => rgb.extend_from_slice(&px[..3]),
                    PixelFormat::Gray8 => rgb.extend_from_slice(&[px[0], px[0], px[0]]),
                }
            }
        }

        RgbImage::from_raw(self.width, self.height, rgb)
    }
}

/// Latest preview frame, shared between the streaming thread and the UI
pub type PreviewFrame = Option<Arc<CameraFrame>>;

/// Sender half of the preview channel (held by the session, shared with the streaming thread)
pub type PreviewSender = Arc<tokio::sync::watch::Sender<PreviewFrame>>;

/// Receiver half of the preview channel (held by preview surfaces)
pub type PreviewReceiver = tokio::sync::watch::Receiver<PreviewFrame>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend or open the device
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Operation needs a running stream
    NotStreaming,
    /// The stream has not delivered a frame yet
    NoFrame,
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::NotStreaming => write!(f, "Stream is not running"),
            BackendError::NoFrame => write!(f, "No frame received yet"),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, format: PixelFormat, stride: u32, data: Vec<u8>) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            format,
            stride,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_position_from_location() {
        assert_eq!(CameraPosition::from_location("back"), CameraPosition::Back);
        assert_eq!(CameraPosition::from_location(" Front "), CameraPosition::Front);
        assert_eq!(
            CameraPosition::from_location("external"),
            CameraPosition::External
        );
        assert_eq!(
            CameraPosition::from_location("ceiling"),
            CameraPosition::Unspecified
        );
    }

    #[test]
    fn test_front_camera_is_never_ranked() {
        assert!(CameraPosition::Back.capture_rank() < CameraPosition::External.capture_rank());
        assert!(
            CameraPosition::External.capture_rank() < CameraPosition::Unspecified.capture_rank()
        );
        assert_eq!(CameraPosition::Front.capture_rank(), None);
    }

    #[test]
    fn test_to_rgb_image_skips_row_padding() {
        // 2x2 RGBA with 4 bytes of padding per row
        let data = vec![
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0, 0,
        ];
        let img = frame(2, 2, PixelFormat::RGBA, 12, data)
            .to_rgb_image()
            .unwrap();
        assert_eq!(img.as_raw(), &vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_to_rgb_image_rejects_short_buffer() {
        assert!(frame(4, 4, PixelFormat::RGBA, 16, vec![0; 10])
            .to_rgb_image()
            .is_none());
    }

    #[test]
    fn test_sample_gray_pixel() {
        let f = frame(2, 1, PixelFormat::Gray8, 2, vec![10, 200]);
        assert_eq!(f.sample_rgb(1, 0), (200, 200, 200));
        // Out of range coordinates clamp to the last pixel
        assert_eq!(f.sample_rgb(9, 9), (200, 200, 200));
    }
}
