// SPDX-License-Identifier: MPL-2.0

//! GStreamer camera backend
//!
//! Opens devices through `pipewiresrc` (default) or `v4l2src` and converts
//! every frame to RGBA for preview and still capture.

mod enumeration;
mod pipeline;

pub use enumeration::{DeviceSource, enumerate_cameras};
pub use pipeline::{CameraPipeline, pipeline_description};

use super::CameraBackend;
use super::types::*;
use crate::pipelines::photo::PhotoOutput;
use gstreamer::prelude::*;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tracing::{debug, info, warn};

/// Elements every capture pipeline needs besides the source
const REQUIRED_ELEMENTS: [&str; 3] = ["decodebin", "videoconvert", "appsink"];

/// GStreamer backend implementation
pub struct GstBackend {
    backend_type: CameraBackendType,
    /// Active pipeline while streaming
    pipeline: Option<CameraPipeline>,
    /// PipeWire remote from the camera portal (sandboxed only)
    remote_fd: Option<OwnedFd>,
}

impl GstBackend {
    /// Create a new backend for the given source type
    pub fn new(backend_type: CameraBackendType) -> Self {
        Self {
            backend_type,
            pipeline: None,
            remote_fd: None,
        }
    }

    fn element_available(name: &str) -> bool {
        gstreamer::ElementFactory::find(name).is_some()
    }

    fn remote(&self) -> Option<RawFd> {
        self.remote_fd.as_ref().map(|fd| fd.as_raw_fd())
    }

    /// Where [`CameraBackend::enumerate_cameras`] looks for devices
    pub fn device_source(&self) -> DeviceSource {
        DeviceSource::for_backend(self.backend_type, self.remote())
    }
}

impl CameraBackend for GstBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        enumerate_cameras(self.backend_type, self.remote())
    }

    fn open_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput> {
        info!(device = %device.name, path = %device.path, "Opening camera input");

        gstreamer::init().map_err(|e| BackendError::NotAvailable(e.to_string()))?;

        let factory = self.backend_type.source_element();
        let mut builder = gstreamer::ElementFactory::make(factory);
        if !device.path.is_empty() {
            builder = match self.backend_type {
                CameraBackendType::PipeWire => builder.property("target-object", device.path.as_str()),
                CameraBackendType::V4l2 => builder.property("device", device.path.as_str()),
            };
        }
        if let DeviceSource::Remote(fd) = self.device_source() {
            builder = builder.property("fd", fd);
        }
        let source = builder
            .build()
            .map_err(|e| BackendError::InitializationFailed(format!("{}: {}", factory, e)))?;

        // READY opens the device (v4l2) or connects to the daemon (PipeWire)
        let probe = source.set_state(gstreamer::State::Ready);
        let _ = source.set_state(gstreamer::State::Null);
        probe.map_err(|e| {
            BackendError::InitializationFailed(format!("{} refused the device: {}", factory, e))
        })?;

        debug!(device = %device.name, "Camera input probed");
        Ok(DeviceInput {
            device: device.clone(),
            backend: self.backend_type,
        })
    }

    fn supports_input(&self, input: &DeviceInput) -> bool {
        input.backend == self.backend_type
            && Self::element_available(self.backend_type.source_element())
    }

    fn supports_output(&self, output: &PhotoOutput) -> bool {
        let missing: Vec<&str> = REQUIRED_ELEMENTS
            .iter()
            .copied()
            .filter(|name| !Self::element_available(name))
            .collect();
        if !missing.is_empty() {
            warn!(?missing, format = ?output.settings().format, "Photo output unsupported");
            return false;
        }
        true
    }

    fn start_stream(&mut self, input: &DeviceInput, preview: PreviewSender) -> BackendResult<()> {
        if self.pipeline.is_some() {
            return Ok(());
        }
        self.pipeline = Some(CameraPipeline::new(input, self.remote(), preview)?);
        Ok(())
    }

    fn stop_stream(&mut self) -> BackendResult<()> {
        match self.pipeline.take() {
            Some(pipeline) => pipeline.stop(),
            None => Ok(()),
        }
    }

    fn grab_frame(&self) -> BackendResult<CameraFrame> {
        let pipeline = self.pipeline.as_ref().ok_or(BackendError::NotStreaming)?;
        let frame = pipeline.latest_frame().ok_or(BackendError::NoFrame)?;
        Ok(CameraFrame::clone(&frame))
    }

    fn backend_type(&self) -> CameraBackendType {
        self.backend_type
    }

    fn set_pipewire_remote(&mut self, fd: OwnedFd) {
        info!("Using PipeWire remote from camera portal");
        self.remote_fd = Some(fd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_remote_is_used_for_enumeration() {
        let mut backend = GstBackend::new(CameraBackendType::PipeWire);
        assert_eq!(backend.device_source(), DeviceSource::Monitor);

        let fd = OwnedFd::from(std::fs::File::open("/dev/null").unwrap());
        let raw = fd.as_raw_fd();
        backend.set_pipewire_remote(fd);
        assert_eq!(backend.device_source(), DeviceSource::Remote(raw));
    }
}
