// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a photo without opening a window

use chrono::Local;
use snapcam::backends::camera::get_backend_for_type;
use snapcam::config::Config;
use snapcam::constants::timing;
use snapcam::library::FileTarget;
use snapcam::model::{CameraModel, SaveOutcome};
use snapcam::permission::PortalPermission;
use snapcam::pipelines::photo::EncodingFormat;
use snapcam::preview::PreviewSurface;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    let (_, config) = Config::load();
    let cameras = get_backend_for_type(config.backend).enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", config.backend);
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        println!("      Position: {}", camera.position);
        println!();
    }

    Ok(())
}

/// Take a photo using the specified camera
///
/// Runs the same check, capture and save steps as the capture screen.
/// `output` may name a directory (saved there with the usual file name) or a
/// file ending in `.jpg`, `.jpeg` or `.png`, which also picks the format.
pub fn take_photo(
    camera_index: usize,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    let (_, mut config) = Config::load();

    let cameras = get_backend_for_type(config.backend).enumerate_cameras();
    if cameras.is_empty() {
        return Err("No cameras found".into());
    }
    if camera_index >= cameras.len() {
        return Err(format!(
            "Camera index {} out of range (0-{})",
            camera_index,
            cameras.len() - 1
        )
        .into());
    }

    let camera = &cameras[camera_index];
    println!("Using camera: {}", camera.name);
    config.last_camera_path = Some(camera.path.clone());

    let output_file = match output {
        Some(path) if path.is_dir() => {
            config.save_directory = Some(path.to_string_lossy().into_owned());
            None
        }
        Some(path) => {
            let format = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(EncodingFormat::from_extension)
                .ok_or_else(|| {
                    format!(
                        "Unsupported output file {} (use .jpg, .jpeg or .png)",
                        path.display()
                    )
                })?;
            config.photo_format = format;
            Some(path)
        }
        None => None,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let mut parts = config.model_parts(Arc::new(PortalPermission::new()));
    if let Some(path) = output_file {
        parts.library = Arc::new(FileTarget::new(path));
    }
    let model = CameraModel::new(parts);

    let result = rt.block_on(capture_once(&model));

    if let Err(err) = rt.block_on(model.stop()) {
        tracing::warn!(error = %err, "Failed to stop session");
    }

    let path = result?;
    println!(
        "Photo saved: {} ({})",
        path.display(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

async fn capture_once(model: &CameraModel) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let check = model.check().await;
    if let Some(refusal) = check.refusal {
        return Err(refusal.into());
    }
    if let Some(Err(err)) = check.setup {
        return Err(err.into());
    }
    if !check.session_running {
        return Err(format!("Camera not available ({})", check.authorization).into());
    }

    // Camera warm-up: wait for the first preview frame
    println!("Capturing...");
    let mut surface = PreviewSurface::new(model.preview_receiver());
    let start = Instant::now();
    let timeout = Duration::from_millis(timing::FIRST_FRAME_TIMEOUT_MS);
    while surface.latest().is_none() {
        if start.elapsed() > timeout {
            return Err("Failed to capture frame from camera".into());
        }
        tokio::time::sleep(Duration::from_millis(timing::FIRST_FRAME_POLL_MS)).await;
    }

    model.capture().await.result?;

    match model.save().await? {
        SaveOutcome::Saved(path) => Ok(path),
        SaveOutcome::AlreadySaved => Err("Photo was not saved".into()),
    }
}
