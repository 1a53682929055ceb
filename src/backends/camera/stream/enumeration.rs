// SPDX-License-Identifier: GPL-3.0-only

//! Camera enumeration through the GStreamer device monitor or a portal remote

use super::super::types::*;
use gstreamer::prelude::*;
use std::os::fd::RawFd;
use tracing::{debug, info, warn};

/// Device-provider properties that carry the sensor mounting location
const LOCATION_KEYS: [&str; 2] = ["api.libcamera.location", "camera.location"];

/// PipeWire device provider, the only one that can use a portal remote
const PIPEWIRE_PROVIDER: &str = "pipewiredeviceprovider";

/// Where device nodes are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSource {
    /// Device monitor over the default provider connections
    Monitor,
    /// PipeWire provider connected through a portal remote
    Remote(RawFd),
}

impl DeviceSource {
    pub fn for_backend(backend: CameraBackendType, remote: Option<RawFd>) -> Self {
        match (backend, remote) {
            (CameraBackendType::PipeWire, Some(fd)) => DeviceSource::Remote(fd),
            _ => DeviceSource::Monitor,
        }
    }
}

/// List the video sources the given backend can open
///
/// Devices from other providers are skipped: a PipeWire node cannot be
/// opened with `v4l2src` and vice versa. With a portal `remote` the
/// PipeWire provider is queried through it, since sandboxed processes see
/// no camera nodes on the default daemon connection.
pub fn enumerate_cameras(backend: CameraBackendType, remote: Option<RawFd>) -> Vec<CameraDevice> {
    if let Err(e) = gstreamer::init() {
        warn!(error = %e, "GStreamer unavailable, no cameras");
        return Vec::new();
    }

    let source = DeviceSource::for_backend(backend, remote);
    let devices = match source {
        DeviceSource::Remote(fd) => remote_devices(fd),
        DeviceSource::Monitor => monitor_devices(),
    };

    let cameras: Vec<CameraDevice> = devices
        .iter()
        .filter_map(|device| camera_from_device(device, backend))
        .collect();

    info!(
        backend = %backend,
        source = ?source,
        count = cameras.len(),
        "Cameras enumerated"
    );
    cameras
}

/// Video sources on the default connections of every provider
fn monitor_devices() -> Vec<gstreamer::Device> {
    let monitor = gstreamer::DeviceMonitor::new();
    // No caps filter: MJPEG-only webcams are decoded in the pipeline
    monitor.add_filter(Some("Video/Source"), None);

    if let Err(e) = monitor.start() {
        warn!(error = %e, "Failed to start device monitor");
        return Vec::new();
    }
    let devices = monitor.devices().into_iter().collect();
    monitor.stop();
    devices
}

/// Video sources visible through a PipeWire remote
///
/// The provider duplicates `fd` when it connects, so the caller keeps
/// ownership.
fn remote_devices(fd: RawFd) -> Vec<gstreamer::Device> {
    let Some(provider) = gstreamer::DeviceProviderFactory::by_name(PIPEWIRE_PROVIDER) else {
        warn!("PipeWire device provider missing, no cameras");
        return Vec::new();
    };
    provider.set_property("fd", fd);

    if let Err(e) = provider.start() {
        warn!(error = %e, "Failed to start PipeWire device provider");
        return Vec::new();
    }
    let devices = provider
        .devices()
        .into_iter()
        .filter(|device| device.has_classes("Video/Source"))
        .collect();
    provider.stop();
    devices
}

fn camera_from_device(device: &gstreamer::Device, backend: CameraBackendType) -> Option<CameraDevice> {
    let name = device.display_name().to_string();
    let props = device.properties()?;

    let path = match backend {
        // pipewiresrc selects nodes by serial through `target-object`
        CameraBackendType::PipeWire => property(&props, "object.serial")?,
        CameraBackendType::V4l2 => {
            if property(&props, "object.serial").is_some() {
                return None;
            }
            property(&props, "device.path")?
        }
    };

    let position = LOCATION_KEYS
        .iter()
        .find_map(|key| property(&props, key))
        .map(|location| CameraPosition::from_location(&location))
        .unwrap_or_default();

    debug!(name = %name, path = %path, position = %position, "Found video source");

    Some(CameraDevice {
        name,
        path,
        position,
    })
}

/// Read a device property as a string regardless of its GType
fn property(props: &gstreamer::StructureRef, key: &str) -> Option<String> {
    if let Ok(value) = props.get::<String>(key) {
        return Some(value);
    }
    let value = props.value(key).ok()?;
    value.serialize().ok().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_remote_routes_pipewire_only() {
        assert_eq!(
            DeviceSource::for_backend(CameraBackendType::PipeWire, Some(7)),
            DeviceSource::Remote(7)
        );
        assert_eq!(
            DeviceSource::for_backend(CameraBackendType::PipeWire, None),
            DeviceSource::Monitor
        );
        // v4l2src cannot open PipeWire nodes, so the remote is irrelevant
        assert_eq!(
            DeviceSource::for_backend(CameraBackendType::V4l2, Some(7)),
            DeviceSource::Monitor
        );
    }
}
