// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Application identifier (D-Bus name, config namespace)
pub const APP_ID: &str = "io.github.snapcam.Snapcam";

/// Directory created under the XDG pictures dir for saved photos
pub const PHOTO_DIR_NAME: &str = "snapcam";

/// Prefix of saved photo file names (`IMG_YYYYMMDD_HHMMSS.jpg`)
pub const PHOTO_FILE_PREFIX: &str = "IMG";

/// UI Constants
pub mod ui {
    /// Capture button size (outer)
    pub const CAPTURE_BUTTON_OUTER: f32 = 72.0;

    /// Capture button size (inner)
    pub const CAPTURE_BUTTON_INNER: f32 = 60.0;

    /// Capture button border radius
    pub const CAPTURE_BUTTON_RADIUS: f32 = 30.0;

    /// Overlay button/container background transparency (0.0 = transparent, 1.0 = opaque)
    pub const OVERLAY_BACKGROUND_ALPHA: f32 = 0.6;

    /// Padding between the bottom controls and the window edge
    pub const BOTTOM_BAR_PADDING: u16 = 24;
}

/// GStreamer pipeline constants
pub mod pipeline {
    /// Maximum buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;
}

/// Timing constants
pub mod timing {
    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// How long the headless `photo` command waits for the first frame
    pub const FIRST_FRAME_TIMEOUT_MS: u64 = 3000;

    /// Poll interval while waiting for the first frame
    pub const FIRST_FRAME_POLL_MS: u64 = 50;

    /// Terminal UI input poll interval
    pub const TERMINAL_TICK_MS: u64 = 33;
}

/// Camera portal constants
pub mod portal {
    /// Marker file present inside a Flatpak sandbox
    pub const FLATPAK_INFO: &str = "/.flatpak-info";

    /// Permission store table holding device permissions
    pub const PERMISSION_TABLE: &str = "devices";

    /// Permission store id for camera access
    pub const CAMERA_PERMISSION_ID: &str = "camera";
}
