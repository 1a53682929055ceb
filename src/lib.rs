// SPDX-License-Identifier: MPL-2.0

//! Snapcam - A point-and-shoot camera for the COSMIC desktop environment
//!
//! One screen: live preview, a shutter button, and save / retake once a
//! photo is taken.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`permission`]: Camera authorization through the XDG camera portal
//! - [`session`]: Capture session graph (input, photo output, start / stop)
//! - [`capture`]: Photo capture delegate holding the taken photo
//! - [`library`]: Writing photos to the user's Pictures folder
//! - [`model`]: The capture workflow tying the above together
//! - [`state`]: UI state machine driven by workflow outcomes
//! - [`preview`]: Preview surface bound to the session's frame channel
//! - [`app`]: COSMIC front end; [`terminal`]: terminal front end
//! - [`backends`]: GStreamer camera backend
//! - [`pipelines`]: Still photo encoding
//! - [`config`]: User configuration handling

pub mod app;
pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod errors;
pub mod i18n;
pub mod library;
pub mod model;
pub mod permission;
pub mod pipelines;
pub mod preview;
pub mod session;
pub mod state;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Message};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use model::CameraModel;
pub use state::{StateStore, UiEvent, UiState};
