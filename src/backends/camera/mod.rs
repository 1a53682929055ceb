// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   UI Layer (App)    │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  SessionController  │  ← configure / start / stop, input + output graph
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │  GStreamer  │  ← pipewiresrc / v4l2src
//!     └─────────────┘
//! ```

pub mod stream;
pub mod types;

pub use types::*;

use crate::pipelines::photo::PhotoOutput;
use std::os::fd::OwnedFd;

/// Camera backend trait
///
/// The session controller is the only caller. Every method may touch
/// hardware, so callers run them on the worker context, never on the UI
/// thread.
pub trait CameraBackend: Send {
    // ===== Enumeration =====

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    // ===== Graph construction =====

    /// Wrap a device as a session input
    ///
    /// The device is probed (opened and released) so that a missing or busy
    /// camera is reported here rather than when the stream starts.
    fn open_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput>;

    /// Check whether this backend can stream from the given input
    fn supports_input(&self, input: &DeviceInput) -> bool;

    /// Check whether this backend can feed the given photo output
    fn supports_output(&self, output: &PhotoOutput) -> bool;

    // ===== Streaming =====

    /// Start streaming from the input, publishing every frame on `preview`
    fn start_stream(&mut self, input: &DeviceInput, preview: PreviewSender) -> BackendResult<()>;

    /// Stop streaming and release the device
    fn stop_stream(&mut self) -> BackendResult<()>;

    /// Grab the most recent full-resolution frame from the running stream
    fn grab_frame(&self) -> BackendResult<CameraFrame>;

    // ===== Metadata =====

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Hand over a PipeWire remote opened through the camera portal
    ///
    /// Sandboxed processes can only see camera nodes through this remote.
    /// Backends that do not talk to PipeWire ignore it.
    fn set_pipewire_remote(&mut self, _fd: OwnedFd) {}
}

/// Get a concrete backend instance for the given type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Box<dyn CameraBackend> {
    Box::new(stream::GstBackend::new(backend_type))
}
