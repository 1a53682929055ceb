// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture workflow
//!
//! Every failure in the permission → configure → capture → save chain is a
//! value that reaches the UI layer. Nothing on these paths panics.

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Camera access was not granted
    Permission(PermissionError),
    /// Session configuration failed (device, input or output setup)
    Configuration(ConfigError),
    /// Session could not be started or stopped
    Session(SessionError),
    /// Still capture failed
    Capture(CaptureError),
    /// Decoding or writing the captured photo failed
    Save(SaveError),
    /// Settings could not be loaded or stored
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Camera permission errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The user refused camera access
    Denied,
    /// The desktop portal could not be reached or answered unexpectedly
    Portal(String),
}

/// Capture session configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No usable capture device is present
    DeviceUnavailable,
    /// The device could not be opened as a session input
    InputCreationFailed(String),
    /// The session refused the device input
    InputRejected,
    /// The session refused the photo output
    OutputRejected,
    /// Backend failure while configuring
    Backend(String),
}

/// Capture session lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session has no committed configuration
    NotConfigured,
    /// Backend failure while starting or stopping
    Backend(String),
}

/// Still capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// A capture is already in flight
    Busy,
    /// The session is not running, so there is nothing to capture
    NotRunning,
    /// The stream has not produced a frame yet
    NoFrame,
    /// The frame could not be encoded
    Encoding(String),
    /// The capture produced no image data
    EmptyImage,
    /// Backend failure during capture
    Backend(String),
}

/// Photo save errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// There is no captured photo to save
    NothingCaptured,
    /// The captured bytes are not a valid image
    Decode(String),
    /// The photo library write failed
    Write(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Permission(e) => write!(f, "Permission error: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Save(e) => write!(f, "Save error: {}", e),
            AppError::Config(msg) => write!(f, "Settings error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::Denied => write!(f, "Camera access denied"),
            PermissionError::Portal(msg) => write!(f, "Portal error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DeviceUnavailable => write!(f, "No camera device available"),
            ConfigError::InputCreationFailed(msg) => {
                write!(f, "Failed to create camera input: {}", msg)
            }
            ConfigError::InputRejected => write!(f, "Session cannot accept the camera input"),
            ConfigError::OutputRejected => write!(f, "Session cannot accept the photo output"),
            ConfigError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotConfigured => write!(f, "Capture session is not configured"),
            SessionError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Busy => write!(f, "A capture is already in progress"),
            CaptureError::NotRunning => write!(f, "Capture session is not running"),
            CaptureError::NoFrame => write!(f, "No frame available for capture"),
            CaptureError::Encoding(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::EmptyImage => write!(f, "Capture produced no image data"),
            CaptureError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::NothingCaptured => write!(f, "No photo has been captured"),
            SaveError::Decode(msg) => write!(f, "Captured image is invalid: {}", msg),
            SaveError::Write(msg) => write!(f, "Failed to write photo: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for PermissionError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for SaveError {}

// Conversions from sub-errors to AppError
impl From<PermissionError> for AppError {
    fn from(err: PermissionError) -> Self {
        AppError::Permission(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<SaveError> for AppError {
    fn from(err: SaveError) -> Self {
        AppError::Save(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

// Backend errors surface differently depending on which step hit them
impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::Backend(err.to_string())
    }
}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NoFrame => CaptureError::NoFrame,
            BackendError::NotStreaming => CaptureError::NotRunning,
            other => CaptureError::Backend(other.to_string()),
        }
    }
}

impl From<BackendError> for ConfigError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(_) => ConfigError::DeviceUnavailable,
            BackendError::InitializationFailed(msg) => ConfigError::InputCreationFailed(msg),
            other => ConfigError::Backend(other.to_string()),
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(err: std::io::Error) -> Self {
        SaveError::Write(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_map_to_capture_errors() {
        assert_eq!(
            CaptureError::from(BackendError::NoFrame),
            CaptureError::NoFrame
        );
        assert_eq!(
            CaptureError::from(BackendError::NotStreaming),
            CaptureError::NotRunning
        );
        assert!(matches!(
            CaptureError::from(BackendError::Other("boom".into())),
            CaptureError::Backend(_)
        ));
    }

    #[test]
    fn test_backend_errors_map_to_config_errors() {
        assert_eq!(
            ConfigError::from(BackendError::DeviceNotFound("none".into())),
            ConfigError::DeviceUnavailable
        );
        assert_eq!(
            ConfigError::from(BackendError::InitializationFailed("busy".into())),
            ConfigError::InputCreationFailed("busy".into())
        );
    }

    #[test]
    fn test_display_is_user_readable() {
        let err: AppError = SaveError::Decode("bad header".into()).into();
        assert_eq!(
            err.to_string(),
            "Save error: Captured image is invalid: bad header"
        );
    }
}
