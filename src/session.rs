// SPDX-License-Identifier: MPL-2.0

//! Capture session and its controller
//!
//! A [`CaptureSession`] binds one camera input to one photo output and owns
//! the preview channel. Inputs and outputs are staged between
//! [`CaptureSession::begin_configuration`] and
//! [`CaptureSession::commit_configuration`], so the session is never seen
//! half configured.
//!
//! The [`SessionController`] is the only thing that mutates a session. It is
//! kept behind a single mutex and all of its methods run on the worker
//! context.

use crate::backends::camera::{
    CameraBackend, CameraDevice, DeviceInput, PreviewReceiver, PreviewSender,
};
use crate::capture::CapturedImage;
use crate::errors::{CaptureError, ConfigError, SessionError};
use crate::pipelines::photo::{PhotoOutput, PhotoSettings};
use std::os::fd::OwnedFd;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing attached yet
    #[default]
    Empty,
    /// Input and output committed, not streaming
    Configured,
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct StagedConfiguration {
    input: Option<DeviceInput>,
    output: Option<PhotoOutput>,
}

/// One input, one photo output and the preview channel
pub struct CaptureSession {
    backend: Box<dyn CameraBackend>,
    input: Option<DeviceInput>,
    output: Option<PhotoOutput>,
    staged: Option<StagedConfiguration>,
    state: SessionState,
    preview: PreviewSender,
}

impl CaptureSession {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        let (preview, _) = tokio::sync::watch::channel(None);
        Self {
            backend,
            input: None,
            output: None,
            staged: None,
            state: SessionState::Empty,
            preview: Arc::new(preview),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn input(&self) -> Option<&DeviceInput> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&PhotoOutput> {
        self.output.as_ref()
    }

    /// A new receiver on the preview channel
    ///
    /// The channel lives as long as the session, so receivers handed out
    /// before configuration see frames once streaming starts.
    pub fn preview_receiver(&self) -> PreviewReceiver {
        self.preview.subscribe()
    }

    pub fn backend(&self) -> &dyn CameraBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn CameraBackend {
        self.backend.as_mut()
    }

    /// Open a configuration bracket
    pub fn begin_configuration(&mut self) {
        self.staged = Some(StagedConfiguration::default());
    }

    /// Check whether the session can accept the input (one input, supported by the backend)
    pub fn can_add_input(&self, input: &DeviceInput) -> bool {
        let slot_free = self
            .staged
            .as_ref()
            .is_some_and(|staged| staged.input.is_none());
        slot_free && self.backend.supports_input(input)
    }

    pub fn add_input(&mut self, input: DeviceInput) {
        if let Some(staged) = self.staged.as_mut() {
            staged.input = Some(input);
        }
    }

    /// Check whether the session can accept the photo output
    pub fn can_add_output(&self, output: &PhotoOutput) -> bool {
        let slot_free = self
            .staged
            .as_ref()
            .is_some_and(|staged| staged.output.is_none());
        slot_free && self.backend.supports_output(output)
    }

    pub fn add_output(&mut self, output: PhotoOutput) {
        if let Some(staged) = self.staged.as_mut() {
            staged.output = Some(output);
        }
    }

    /// Apply the staged input and output together
    ///
    /// Returns `false` (and keeps the previous configuration) when the
    /// bracket was not opened or does not hold both an input and an output.
    pub fn commit_configuration(&mut self) -> bool {
        match self.staged.take() {
            Some(StagedConfiguration {
                input: Some(input),
                output: Some(output),
            }) => {
                self.input = Some(input);
                self.output = Some(output);
                self.state = SessionState::Configured;
                true
            }
            _ => false,
        }
    }

    /// Close the bracket without applying anything
    pub fn discard_configuration(&mut self) {
        self.staged = None;
    }

    fn start_running(&mut self) -> Result<(), SessionError> {
        let input = self.input.as_ref().ok_or(SessionError::NotConfigured)?;
        self.backend
            .start_stream(input, Arc::clone(&self.preview))?;
        self.state = SessionState::Running;
        Ok(())
    }

    fn stop_running(&mut self) -> Result<(), SessionError> {
        self.backend.stop_stream()?;
        self.state = SessionState::Stopped;
        Ok(())
    }
}

/// Pick the capture device
///
/// Order: the remembered device, then a back camera, then external and
/// unlabelled cameras. Front cameras are never picked, not even when
/// remembered, so a front-only list yields `None`.
pub fn select_device<'a>(
    devices: &'a [CameraDevice],
    preferred_path: Option<&str>,
) -> Option<&'a CameraDevice> {
    let eligible = devices
        .iter()
        .filter_map(|d| d.position.capture_rank().map(|rank| (rank, d)));

    if let Some(path) = preferred_path
        && let Some((_, device)) = eligible.clone().find(|(_, d)| d.path == path)
    {
        return Some(device);
    }

    // min_by_key keeps the first of equal ranks, so enumeration order breaks ties
    eligible.min_by_key(|(rank, _)| *rank).map(|(_, d)| d)
}

/// Drives a [`CaptureSession`] through configure / start / capture / stop
pub struct SessionController {
    session: CaptureSession,
    photo_settings: PhotoSettings,
}

impl SessionController {
    pub fn new(backend: Box<dyn CameraBackend>, photo_settings: PhotoSettings) -> Self {
        Self {
            session: CaptureSession::new(backend),
            photo_settings,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_configured(&self) -> bool {
        self.session.state() != SessionState::Empty
    }

    pub fn is_running(&self) -> bool {
        self.session.state() == SessionState::Running
    }

    pub fn preview_receiver(&self) -> PreviewReceiver {
        self.session.preview_receiver()
    }

    /// The device bound as input, once configured
    pub fn active_device(&self) -> Option<&CameraDevice> {
        self.session.input().map(|input| &input.device)
    }

    pub fn cameras(&self) -> Vec<CameraDevice> {
        self.session.backend().enumerate_cameras()
    }

    /// Hand the portal's PipeWire remote to the backend
    pub fn set_pipewire_remote(&mut self, fd: OwnedFd) {
        self.session.backend_mut().set_pipewire_remote(fd);
    }

    /// Attach the default camera and a photo output
    ///
    /// Calling this on an already configured session is a no-op.
    pub fn configure(&mut self, preferred_path: Option<&str>) -> Result<(), ConfigError> {
        if self.is_configured() {
            debug!("Session already configured");
            return Ok(());
        }

        let devices = self.cameras();
        let device = select_device(&devices, preferred_path).ok_or_else(|| {
            warn!("No camera device available");
            ConfigError::DeviceUnavailable
        })?;
        info!(
            device = %device.name,
            path = %device.path,
            position = %device.position,
            "Configuring capture session"
        );

        let input = self.session.backend().open_input(device).map_err(|e| {
            error!(device = %device.name, error = %e, "Failed to create camera input");
            ConfigError::from(e)
        })?;
        let output = PhotoOutput::new(self.photo_settings);

        self.session.begin_configuration();

        if !self.session.can_add_input(&input) {
            self.session.discard_configuration();
            warn!(device = %input.device.name, "Session rejected camera input");
            return Err(ConfigError::InputRejected);
        }
        self.session.add_input(input);

        if !self.session.can_add_output(&output) {
            self.session.discard_configuration();
            warn!("Session rejected photo output");
            return Err(ConfigError::OutputRejected);
        }
        self.session.add_output(output);

        if !self.session.commit_configuration() {
            return Err(ConfigError::Backend(
                "Configuration could not be committed".to_string(),
            ));
        }

        info!("Capture session configured");
        Ok(())
    }

    /// Start streaming; no-op when already running
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.session.state() {
            SessionState::Running => Ok(()),
            SessionState::Empty => Err(SessionError::NotConfigured),
            SessionState::Configured | SessionState::Stopped => {
                info!("Starting capture session");
                self.session.start_running()
            }
        }
    }

    /// Stop streaming; no-op unless running
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if self.session.state() != SessionState::Running {
            return Ok(());
        }
        info!("Stopping capture session");
        self.session.stop_running()
    }

    /// Issue a still request and stop the session
    ///
    /// The session is stopped whether or not the still could be encoded, so
    /// the last preview frame stays on screen.
    pub fn capture_still(&mut self) -> Result<CapturedImage, CaptureError> {
        if !self.is_running() {
            return Err(CaptureError::NotRunning);
        }
        let output = self.session.output().cloned().ok_or(CaptureError::NotRunning)?;

        let result = self
            .session
            .backend()
            .grab_frame()
            .map_err(CaptureError::from)
            .and_then(|frame| {
                let bytes = output.process(&frame)?;
                Ok(CapturedImage {
                    bytes: Arc::from(bytes),
                    width: frame.width,
                    height: frame.height,
                    captured_at: chrono::Local::now(),
                })
            });

        if let Err(e) = self.stop() {
            warn!(error = %e, "Failed to stop session after capture");
        }
        result
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{
        BackendError, BackendResult, CameraBackendType, CameraFrame, CameraPosition,
    };

    /// Backend that accepts everything and never streams
    struct ListBackend(Vec<CameraDevice>);

    impl CameraBackend for ListBackend {
        fn enumerate_cameras(&self) -> Vec<CameraDevice> {
            self.0.clone()
        }
        fn open_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput> {
            Ok(DeviceInput {
                device: device.clone(),
                backend: CameraBackendType::V4l2,
            })
        }
        fn supports_input(&self, _input: &DeviceInput) -> bool {
            true
        }
        fn supports_output(&self, _output: &PhotoOutput) -> bool {
            true
        }
        fn start_stream(&mut self, _input: &DeviceInput, _preview: PreviewSender) -> BackendResult<()> {
            Ok(())
        }
        fn stop_stream(&mut self) -> BackendResult<()> {
            Ok(())
        }
        fn grab_frame(&self) -> BackendResult<CameraFrame> {
            Err(BackendError::NotStreaming)
        }
        fn backend_type(&self) -> CameraBackendType {
            CameraBackendType::V4l2
        }
    }

    fn device(path: &str, position: CameraPosition) -> CameraDevice {
        CameraDevice {
            name: format!("cam {}", path),
            path: path.to_string(),
            position,
        }
    }

    #[test]
    fn test_back_camera_wins() {
        let devices = vec![
            device("1", CameraPosition::Front),
            device("2", CameraPosition::Back),
            device("3", CameraPosition::External),
        ];
        assert_eq!(select_device(&devices, None).unwrap().path, "2");
    }

    #[test]
    fn test_webcam_preferred_over_front() {
        let devices = vec![
            device("1", CameraPosition::Front),
            device("2", CameraPosition::Unspecified),
        ];
        assert_eq!(select_device(&devices, None).unwrap().path, "2");
    }

    #[test]
    fn test_remembered_device_wins() {
        let devices = vec![
            device("1", CameraPosition::Back),
            device("2", CameraPosition::External),
        ];
        assert_eq!(select_device(&devices, Some("2")).unwrap().path, "2");
        // Unknown path falls back to the normal order
        assert_eq!(select_device(&devices, Some("9")).unwrap().path, "1");
    }

    #[test]
    fn test_front_camera_is_never_selected() {
        let devices = vec![device("1", CameraPosition::Front)];
        assert!(select_device(&devices, None).is_none());
        assert!(select_device(&devices, Some("1")).is_none());
        assert!(select_device(&[], None).is_none());
    }

    #[test]
    fn test_front_only_configuration_fails() {
        let mut controller = SessionController::new(
            Box::new(ListBackend(vec![device("1", CameraPosition::Front)])),
            PhotoSettings::default(),
        );
        assert_eq!(
            controller.configure(None),
            Err(ConfigError::DeviceUnavailable)
        );
        assert_eq!(controller.state(), SessionState::Empty);
        assert!(!controller.is_running());
        assert_eq!(controller.start(), Err(SessionError::NotConfigured));
    }

    #[test]
    fn test_partial_configuration_is_not_committed() {
        let mut session = CaptureSession::new(Box::new(ListBackend(Vec::new())));
        let input = DeviceInput {
            device: device("1", CameraPosition::Back),
            backend: CameraBackendType::V4l2,
        };

        session.begin_configuration();
        assert!(session.can_add_input(&input));
        session.add_input(input.clone());
        assert!(!session.can_add_input(&input), "only one input fits");
        assert!(!session.commit_configuration());
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.input().is_none());

        session.begin_configuration();
        session.add_input(input);
        session.add_output(PhotoOutput::new(PhotoSettings::default()));
        assert!(session.commit_configuration());
        assert_eq!(session.state(), SessionState::Configured);
    }

    #[test]
    fn test_start_requires_configuration() {
        let mut controller = SessionController::new(Box::new(ListBackend(Vec::new())), PhotoSettings::default());
        assert_eq!(controller.start(), Err(SessionError::NotConfigured));
        assert_eq!(
            controller.configure(None),
            Err(ConfigError::DeviceUnavailable)
        );
        assert!(!controller.is_running());
        assert_eq!(controller.capture_still().unwrap_err(), CaptureError::NotRunning);
    }
}
