// SPDX-License-Identifier: MPL-2.0

//! Photo capture delegate
//!
//! Owns the most recent [`CapturedImage`] and tracks where the still capture
//! is in its lifecycle:
//!
//! ```text
//! Idle ──▶ Capturing ──▶ Captured
//!              │             │
//!              ▼             ▼
//!            Failed ──▶ (capture again)
//! ```
//!
//! Saving reads the image but never replaces it. A new capture or a retake
//! bumps the generation so a save that finishes afterwards cannot mark the
//! new photo as saved.

use crate::errors::{CaptureError, SaveError};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{debug, warn};

/// Still capture lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
    Captured,
    Failed,
}

/// Encoded bytes of the most recent photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Local>,
}

/// Bytes handed out for one save attempt
#[derive(Debug, Clone)]
pub struct SaveTicket {
    pub generation: u64,
    pub bytes: Arc<[u8]>,
}

/// Receives still capture results and holds the captured photo
#[derive(Debug, Default)]
pub struct PhotoCaptureDelegate {
    state: CaptureState,
    image: Option<CapturedImage>,
    generation: u64,
    saving: bool,
    saved: bool,
}

impl PhotoCaptureDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Enter `Capturing`; only one still request may be in flight
    pub fn begin_capture(&mut self) -> Result<(), CaptureError> {
        if self.state == CaptureState::Capturing {
            return Err(CaptureError::Busy);
        }
        self.state = CaptureState::Capturing;
        Ok(())
    }

    /// Store the result of the still request issued by [`Self::begin_capture`]
    ///
    /// On failure the previous image (if any) is left alone.
    pub fn finish_capture(
        &mut self,
        result: Result<CapturedImage, CaptureError>,
    ) -> Result<(), CaptureError> {
        match result {
            Ok(image) if image.bytes.is_empty() => {
                warn!("Capture delivered no data");
                self.state = CaptureState::Failed;
                Err(CaptureError::EmptyImage)
            }
            Ok(image) => {
                debug!(
                    size = image.bytes.len(),
                    width = image.width,
                    height = image.height,
                    "Photo captured"
                );
                self.image = Some(image);
                self.generation += 1;
                self.saving = false;
                self.saved = false;
                self.state = CaptureState::Captured;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Capture failed");
                self.state = CaptureState::Failed;
                Err(err)
            }
        }
    }

    /// Hand out the photo for saving
    ///
    /// Returns `Ok(None)` when a save is already pending or has succeeded for
    /// the current photo, so the caller skips the library write.
    pub fn begin_save(&mut self) -> Result<Option<SaveTicket>, SaveError> {
        let image = self.image.as_ref().ok_or(SaveError::NothingCaptured)?;
        if self.saving || self.saved {
            return Ok(None);
        }
        self.saving = true;
        Ok(Some(SaveTicket {
            generation: self.generation,
            bytes: Arc::clone(&image.bytes),
        }))
    }

    /// Record the outcome of a save started with [`Self::begin_save`]
    ///
    /// Returns whether the current photo is now saved.
    pub fn finish_save(&mut self, generation: u64, success: bool) -> bool {
        if generation != self.generation {
            debug!("Save finished for a discarded photo");
            return false;
        }
        self.saving = false;
        self.saved = success;
        self.saved
    }

    /// Drop the captured photo and return to `Idle`
    pub fn clear(&mut self) {
        self.image = None;
        self.generation += 1;
        self.saving = false;
        self.saved = false;
        self.state = CaptureState::Idle;
    }
}
