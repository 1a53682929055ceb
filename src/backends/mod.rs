// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Session controller (session.rs)      │
//! └────────────────────┬────────────────────────┘
//!                      │ CameraBackend
//! ┌────────────────────┴────────────────────────┐
//! │      GStreamer backend (camera::stream)     │
//! │   pipewiresrc / v4l2src → appsink → frames  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera backend with device enumeration and frame capture

pub mod camera;
