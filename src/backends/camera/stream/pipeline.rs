// SPDX-License-Identifier: MPL-2.0

//! GStreamer pipeline for live camera capture

use super::super::types::*;
use crate::constants::{pipeline, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, error, info, warn};

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Most recent frame, written by the appsink callback
type LatestFrame = Arc<Mutex<Option<Arc<CameraFrame>>>>;

/// Live camera pipeline
///
/// `<source> ! decodebin ! videoconvert ! video/x-raw,format=RGBA ! appsink`
///
/// Every frame is published on the preview channel and kept as the latest
/// frame for still capture.
pub struct CameraPipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    latest: LatestFrame,
}

impl CameraPipeline {
    /// Build and start a pipeline for the given input
    pub fn new(
        input: &DeviceInput,
        remote_fd: Option<RawFd>,
        preview: PreviewSender,
    ) -> BackendResult<Self> {
        info!(device = %input.device.name, backend = %input.backend, "Creating camera pipeline");

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let description = pipeline_description(input, remote_fd);
        debug!(pipeline = %description, "Launching pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| {
                BackendError::InitializationFailed("Launch did not produce a pipeline".to_string())
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast appsink".to_string())
            })?;

        appsink.set_property("emit-signals", true);
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let latest_cb = Arc::clone(&latest);

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_start = Instant::now();
                    let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to pull sample");
                        gstreamer::FlowError::Eos
                    })?;

                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
                        warn!(frame = frame_num, "Buffer marked as corrupted, skipping frame");
                        return Ok(gstreamer::FlowSuccess::Ok);
                    }

                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to get video info");
                        gstreamer::FlowError::Error
                    })?;

                    let format = PixelFormat::from_gst_format(video_info.format().to_str().as_str())
                        .ok_or(gstreamer::FlowError::NotNegotiated)?;

                    let map = buffer.map_readable().map_err(|e| {
                        error!(frame = frame_num, error = ?e, "Failed to map buffer");
                        gstreamer::FlowError::Error
                    })?;

                    let frame = Arc::new(CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        format,
                        stride: video_info.stride()[0] as u32,
                        captured_at: frame_start,
                    });

                    *latest_cb.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(Arc::clone(&frame));
                    preview.send_replace(Some(frame));

                    if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            width = video_info.width(),
                            height = video_info.height(),
                            copy_us = frame_start.elapsed().as_micros(),
                            "Frame published"
                        );
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to start pipeline: {}", e))
        })?;

        let (result, state, pending) = pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");
        if state != gstreamer::State::Playing {
            warn!("Pipeline is not in PLAYING state yet");
        }

        Ok(Self {
            pipeline,
            appsink,
            latest,
        })
    }

    /// Most recent frame delivered by the sink
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the pipeline and release the camera
    pub fn stop(self) -> BackendResult<()> {
        info!("Stopping camera pipeline");
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;

        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        match result {
            Ok(_) => info!(state = ?state, "Camera pipeline stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }
        Ok(())
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}

/// Build the `gst-launch` style description for an input
pub fn pipeline_description(input: &DeviceInput, remote_fd: Option<RawFd>) -> String {
    let mut source = input.backend.source_element().to_string();
    match input.backend {
        CameraBackendType::PipeWire => {
            if let Some(fd) = remote_fd {
                source.push_str(&format!(" fd={}", fd));
            }
            if !input.device.path.is_empty() {
                source.push_str(&format!(" target-object=\"{}\"", input.device.path));
            }
        }
        CameraBackendType::V4l2 => {
            if !input.device.path.is_empty() {
                source.push_str(&format!(" device=\"{}\"", input.device.path));
            }
        }
    }

    format!(
        "{} ! decodebin ! videoconvert ! video/x-raw,format=RGBA ! appsink name=sink",
        source
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(backend: CameraBackendType, path: &str) -> DeviceInput {
        DeviceInput {
            device: CameraDevice {
                name: "Test".to_string(),
                path: path.to_string(),
                position: CameraPosition::Back,
            },
            backend,
        }
    }

    #[test]
    fn test_pipewire_description_targets_node() {
        let desc = pipeline_description(&input(CameraBackendType::PipeWire, "42"), Some(7));
        assert!(desc.starts_with("pipewiresrc fd=7 target-object=\"42\" !"));
        assert!(desc.ends_with("appsink name=sink"));
    }

    #[test]
    fn test_v4l2_description_uses_device_path() {
        let desc = pipeline_description(&input(CameraBackendType::V4l2, "/dev/video0"), None);
        assert!(desc.starts_with("v4l2src device=\"/dev/video0\" !"));
        assert!(desc.contains("format=RGBA"));
    }

    #[test]
    fn test_empty_path_uses_default_device() {
        let desc = pipeline_description(&input(CameraBackendType::PipeWire, ""), None);
        assert!(desc.starts_with("pipewiresrc ! decodebin"));
    }
}
