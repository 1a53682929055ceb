// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, get_backend_for_type};
use crate::constants::APP_ID;
use crate::library::PicturesLibrary;
use crate::model::{CaptureFailurePolicy, ModelParts};
use crate::permission::PermissionGate;
use crate::pipelines::photo::{EncodingFormat, EncodingQuality, PhotoSettings};
use cosmic::cosmic_config::{self, CosmicConfigEntry, cosmic_config_derive::CosmicConfigEntry};
use cosmic::{Theme, theme};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Application theme preference
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum AppTheme {
    /// Follow system theme (dark or light based on system setting)
    #[default]
    System,
    /// Always use dark theme
    Dark,
    /// Always use light theme
    Light,
}

impl AppTheme {
    /// Get the COSMIC theme for this app theme preference
    pub fn theme(&self) -> Theme {
        match self {
            Self::Dark => {
                let mut theme = theme::system_dark();
                theme.theme_type.prefer_dark(Some(true));
                theme
            }
            Self::Light => {
                let mut theme = theme::system_light();
                theme.theme_type.prefer_dark(Some(false));
                theme
            }
            Self::System => theme::system_preference(),
        }
    }
}

#[derive(Debug, Clone, CosmicConfigEntry, Eq, PartialEq, Serialize, Deserialize)]
#[version = 1]
pub struct Config {
    /// Application theme preference (System, Dark, Light)
    pub app_theme: AppTheme,
    /// Camera source to use (PipeWire or V4L2)
    pub backend: CameraBackendType,
    /// Device to open instead of the default back camera
    pub last_camera_path: Option<String>,
    /// Container for saved photos
    pub photo_format: EncodingFormat,
    /// JPEG quality preset
    pub photo_quality: EncodingQuality,
    /// Where photos are saved; `None` means `~/Pictures/snapcam`
    pub save_directory: Option<String>,
    /// Whether the preview restarts after a failed capture
    pub capture_failure_policy: CaptureFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_theme: AppTheme::default(),
            backend: CameraBackendType::default(),
            last_camera_path: None,
            photo_format: EncodingFormat::Jpeg,
            photo_quality: EncodingQuality::High,
            save_directory: None,
            capture_failure_policy: CaptureFailurePolicy::RestartSession,
        }
    }
}

impl Config {
    /// Read the stored settings, falling back to defaults for anything unreadable
    pub fn load() -> (Option<cosmic_config::Config>, Self) {
        match cosmic_config::Config::new(APP_ID, Self::VERSION) {
            Ok(handler) => {
                let config = match Self::get_entry(&handler) {
                    Ok(config) => config,
                    Err((errors, config)) => {
                        error!(?errors, "Errors loading config");
                        config
                    }
                };
                (Some(handler), config)
            }
            Err(err) => {
                error!(%err, "Failed to create config handler");
                (None, Self::default())
            }
        }
    }

    pub fn photo_settings(&self) -> PhotoSettings {
        PhotoSettings {
            format: self.photo_format,
            quality: self.photo_quality,
        }
    }

    pub fn photo_library(&self) -> PicturesLibrary {
        PicturesLibrary::from_config(self.save_directory.as_deref())
    }

    /// Camera model inputs for these settings
    pub fn model_parts(&self, permission: Arc<dyn PermissionGate>) -> ModelParts {
        ModelParts {
            permission,
            backend: get_backend_for_type(self.backend),
            library: Arc::new(self.photo_library()),
            photo_settings: self.photo_settings(),
            failure_policy: self.capture_failure_policy,
            preferred_camera: self.last_camera_path.clone(),
        }
    }
}
