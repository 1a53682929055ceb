// SPDX-License-Identifier: MPL-2.0

//! Preview surface
//!
//! A surface is bound once to the session's preview channel. The channel
//! outlives start / stop cycles, so the binding never needs updating; after a
//! capture the last frame simply stays on screen.

use crate::backends::camera::{CameraFrame, PixelFormat, PreviewFrame, PreviewReceiver};

/// Region of the source frame to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centered source region that fills a `dst_w`×`dst_h` surface without
/// distorting the image
pub fn fill_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> CropRect {
    let full = CropRect {
        x: 0,
        y: 0,
        width: src_w,
        height: src_h,
    };
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return full;
    }

    // Compare src_w/src_h with dst_w/dst_h without floats
    let src_cross = src_w as u64 * dst_h as u64;
    let dst_cross = dst_w as u64 * src_h as u64;

    if src_cross > dst_cross {
        // Source is wider: trim left and right
        let width = ((src_h as u64 * dst_w as u64) / dst_h as u64).max(1) as u32;
        CropRect {
            x: (src_w - width) / 2,
            y: 0,
            width,
            height: src_h,
        }
    } else if src_cross < dst_cross {
        // Source is taller: trim top and bottom
        let height = ((src_w as u64 * dst_h as u64) / dst_w as u64).max(1) as u32;
        CropRect {
            x: 0,
            y: (src_h - height) / 2,
            width: src_w,
            height,
        }
    } else {
        full
    }
}

/// Tightly packed RGBA copy of a frame (what image widgets expect)
pub fn packed_rgba(frame: &CameraFrame) -> Option<Vec<u8>> {
    if frame.format != PixelFormat::RGBA {
        return frame
            .to_rgb_image()
            .map(|rgb| image::DynamicImage::ImageRgb8(rgb).to_rgba8().into_raw());
    }

    let row_bytes = frame.width as usize * 4;
    let stride = frame.stride as usize;
    if stride == row_bytes && frame.data.len() >= row_bytes * frame.height as usize {
        return Some(frame.data[..row_bytes * frame.height as usize].to_vec());
    }
    if stride < row_bytes || frame.height == 0 {
        return None;
    }
    let needed = stride * (frame.height as usize - 1) + row_bytes;
    if frame.data.len() < needed {
        return None;
    }

    let mut out = Vec::with_capacity(row_bytes * frame.height as usize);
    for row in frame.data.chunks(stride).take(frame.height as usize) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    Some(out)
}

/// Live view of the capture session
///
/// Frames always fill the surface; overflowing edges are cropped.
#[derive(Debug, Clone)]
pub struct PreviewSurface {
    receiver: PreviewReceiver,
}

impl PreviewSurface {
    pub fn new(receiver: PreviewReceiver) -> Self {
        Self { receiver }
    }

    /// Most recent frame, marking it as seen
    pub fn latest(&mut self) -> PreviewFrame {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether a frame arrived since the last [`Self::latest`]
    pub fn has_new_frame(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next frame; `None` once the session is gone
    pub async fn next_frame(&mut self) -> Option<PreviewFrame> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Source region to draw for a surface of the given size
    pub fn visible_region(&self, frame: &CameraFrame, width: u32, height: u32) -> CropRect {
        fill_crop(frame.width, frame.height, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn rgba(width: u32, height: u32, stride: u32) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(vec![7u8; (stride * height) as usize]),
            format: PixelFormat::RGBA,
            stride,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_wide_source_is_cropped_horizontally() {
        // 16:9 into a square
        let crop = fill_crop(1920, 1080, 500, 500);
        assert_eq!(
            crop,
            CropRect {
                x: 420,
                y: 0,
                width: 1080,
                height: 1080
            }
        );
    }

    #[test]
    fn test_tall_surface_crops_vertically() {
        // 4:3 into 16:9
        let crop = fill_crop(640, 480, 1600, 900);
        assert_eq!(crop.width, 640);
        assert_eq!(crop.height, 360);
        assert_eq!(crop.y, 60);
    }

    #[test]
    fn test_matching_aspect_is_untouched() {
        let crop = fill_crop(1280, 720, 640, 360);
        assert_eq!((crop.x, crop.y, crop.width, crop.height), (0, 0, 1280, 720));
    }

    #[test]
    fn test_zero_sized_surface() {
        assert_eq!(fill_crop(640, 480, 0, 10).width, 640);
    }

    #[test]
    fn test_packed_rgba_strips_padding() {
        let packed = packed_rgba(&rgba(3, 2, 16)).unwrap();
        assert_eq!(packed.len(), 3 * 2 * 4);
    }

    #[test]
    fn test_surface_sees_published_frames() {
        let (tx, rx) = tokio::sync::watch::channel(None);
        let mut surface = PreviewSurface::new(rx);
        assert!(surface.latest().is_none());

        tx.send_replace(Some(Arc::new(rgba(2, 2, 8))));
        assert!(surface.has_new_frame());
        assert_eq!(surface.latest().unwrap().width, 2);
        assert!(!surface.has_new_frame());
    }
}
