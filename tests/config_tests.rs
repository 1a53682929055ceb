// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use snapcam::Config;
use snapcam::backends::camera::CameraBackendType;
use snapcam::model::CaptureFailurePolicy;
use snapcam::pipelines::photo::{EncodingFormat, EncodingQuality};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.backend, CameraBackendType::PipeWire);
    assert_eq!(config.last_camera_path, None);
    assert_eq!(
        config.capture_failure_policy,
        CaptureFailurePolicy::RestartSession,
        "Preview should come back after a failed capture by default"
    );
}

#[test]
fn test_default_photo_settings() {
    let settings = Config::default().photo_settings();
    assert_eq!(settings.format, EncodingFormat::Jpeg);
    assert_eq!(settings.quality, EncodingQuality::High);
}

#[test]
fn test_custom_save_directory() {
    let config = Config {
        save_directory: Some("/tmp/snapcam-test".into()),
        ..Config::default()
    };
    assert_eq!(
        config.photo_library().dir(),
        std::path::Path::new("/tmp/snapcam-test")
    );
}

#[test]
fn test_blank_save_directory_uses_pictures() {
    let config = Config {
        save_directory: Some("   ".into()),
        ..Config::default()
    };
    assert_eq!(
        config.photo_library().dir(),
        snapcam::library::default_photo_dir()
    );
}
