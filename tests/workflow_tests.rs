// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the capture workflow
//!
//! The camera, the portal and the photo library are replaced with in-memory
//! fakes so the permission → capture → save → retake chain runs headless.

use image::ImageFormat;
use snapcam::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendType, CameraDevice, CameraFrame,
    CameraPosition, DeviceInput, PixelFormat, PreviewSender,
};
use snapcam::errors::{AppError, CaptureError, ConfigError, PermissionError, SaveError};
use snapcam::library::PhotoLibrary;
use snapcam::model::{CameraModel, CaptureFailurePolicy, ModelParts, SaveOutcome};
use snapcam::permission::{AuthorizationState, PermissionGate};
use snapcam::pipelines::photo::{PhotoOutput, PhotoSettings};
use snapcam::state::{StateStore, UiEvent};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

// ===== Fakes =====

/// Counters shared between a test and its fake backend
#[derive(Clone, Default)]
struct Probe {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    grabs: Arc<AtomicUsize>,
    fail_grab: Arc<AtomicBool>,
}

struct FakeBackend {
    devices: Vec<CameraDevice>,
    streaming: bool,
    probe: Probe,
}

fn gray_frame() -> CameraFrame {
    CameraFrame {
        width: 8,
        height: 6,
        data: Arc::from(vec![128u8; 8 * 6 * 3]),
        format: PixelFormat::RGB24,
        stride: 8 * 3,
        captured_at: Instant::now(),
    }
}

impl CameraBackend for FakeBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }

    fn open_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput> {
        Ok(DeviceInput {
            device: device.clone(),
            backend: CameraBackendType::PipeWire,
        })
    }

    fn supports_input(&self, _input: &DeviceInput) -> bool {
        true
    }

    fn supports_output(&self, _output: &PhotoOutput) -> bool {
        true
    }

    fn start_stream(&mut self, _input: &DeviceInput, preview: PreviewSender) -> BackendResult<()> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        self.streaming = true;
        preview.send_replace(Some(Arc::new(gray_frame())));
        Ok(())
    }

    fn stop_stream(&mut self) -> BackendResult<()> {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.streaming = false;
        Ok(())
    }

    fn grab_frame(&self) -> BackendResult<CameraFrame> {
        self.probe.grabs.fetch_add(1, Ordering::SeqCst);
        if !self.streaming {
            return Err(BackendError::NotStreaming);
        }
        if self.probe.fail_grab.load(Ordering::SeqCst) {
            return Err(BackendError::NoFrame);
        }
        Ok(gray_frame())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::PipeWire
    }
}

struct FakePermission {
    status: AuthorizationState,
    grant: bool,
    requests: AtomicUsize,
}

impl FakePermission {
    fn new(status: AuthorizationState, grant: bool) -> Arc<Self> {
        Arc::new(Self {
            status,
            grant,
            requests: AtomicUsize::new(0),
        })
    }
}

impl PermissionGate for FakePermission {
    fn authorization_status(&self) -> AuthorizationState {
        self.status
    }

    fn request_access(&self) -> Result<bool, PermissionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.grant)
    }
}

#[derive(Default)]
struct MemoryLibrary {
    writes: Mutex<Vec<(usize, ImageFormat)>>,
    fail: AtomicBool,
}

impl MemoryLibrary {
    fn count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl PhotoLibrary for MemoryLibrary {
    fn write(&self, bytes: &[u8], format: ImageFormat) -> Result<PathBuf, SaveError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SaveError::Write("disk full".to_string()));
        }
        let mut writes = self.writes.lock().unwrap();
        writes.push((bytes.len(), format));
        Ok(PathBuf::from(format!("/photos/IMG_{}.jpg", writes.len())))
    }
}

struct Harness {
    model: CameraModel,
    probe: Probe,
    permission: Arc<FakePermission>,
    library: Arc<MemoryLibrary>,
    store: StateStore,
}

fn back_camera() -> CameraDevice {
    CameraDevice {
        name: "Back".to_string(),
        path: "42".to_string(),
        position: CameraPosition::Back,
    }
}

fn harness_with(
    status: AuthorizationState,
    grant: bool,
    devices: Vec<CameraDevice>,
    failure_policy: CaptureFailurePolicy,
) -> Harness {
    let probe = Probe::default();
    let permission = FakePermission::new(status, grant);
    let library = Arc::new(MemoryLibrary::default());
    let model = CameraModel::new(ModelParts {
        permission: permission.clone(),
        backend: Box::new(FakeBackend {
            devices,
            streaming: false,
            probe: probe.clone(),
        }),
        library: library.clone(),
        photo_settings: PhotoSettings::default(),
        failure_policy,
        preferred_camera: None,
    });
    Harness {
        model,
        probe,
        permission,
        library,
        store: StateStore::new(),
    }
}

fn harness(status: AuthorizationState) -> Harness {
    harness_with(
        status,
        true,
        vec![back_camera()],
        CaptureFailurePolicy::RestartSession,
    )
}

impl Harness {
    async fn check(&self) {
        for event in self.model.check().await.into_events() {
            self.store.apply(event);
        }
    }

    async fn capture(&self) {
        self.store.apply(UiEvent::CaptureStarted);
        let outcome = self.model.capture().await;
        self.store.apply(outcome.into());
    }

    async fn retake(&self) {
        self.store.apply(UiEvent::RetakeStarted);
        for event in self.model.retake().await.into_events() {
            self.store.apply(event);
        }
    }

    async fn save(&self) -> Result<SaveOutcome, SaveError> {
        self.store.apply(UiEvent::SaveStarted);
        let result = self.model.save().await;
        self.store.apply(UiEvent::SaveFinished(result.clone()));
        result
    }
}

// ===== Permission =====

#[tokio::test]
async fn test_authorized_starts_session() {
    let h = harness(AuthorizationState::Authorized);
    h.check().await;

    let ui = h.store.snapshot();
    assert!(ui.session_running);
    assert!(!ui.alert);
    assert!(ui.can_capture());
    assert_eq!(h.permission.requests.load(Ordering::SeqCst), 0);
    assert_eq!(h.probe.starts.load(Ordering::SeqCst), 1);
    assert_eq!(h.model.active_device(), Some(back_camera()));
}

#[tokio::test]
async fn test_undecided_asks_once_then_starts() {
    let h = harness(AuthorizationState::NotDetermined);
    h.check().await;

    assert_eq!(h.permission.requests.load(Ordering::SeqCst), 1);
    assert!(h.store.snapshot().session_running);
}

#[tokio::test]
async fn test_refused_request_never_configures() {
    let h = harness_with(
        AuthorizationState::NotDetermined,
        false,
        vec![back_camera()],
        CaptureFailurePolicy::RestartSession,
    );
    let outcome = h.model.check().await;
    assert_eq!(outcome.refusal, Some(PermissionError::Denied));
    assert!(outcome.setup.is_none());

    for event in outcome.into_events() {
        h.store.apply(event);
    }
    let ui = h.store.snapshot();
    assert!(!ui.session_running);
    assert!(!ui.alert);
    assert_eq!(
        ui.last_error,
        Some(AppError::Permission(PermissionError::Denied))
    );
    assert_eq!(h.probe.starts.load(Ordering::SeqCst), 0);
    assert_eq!(h.model.active_device(), None);
}

#[tokio::test]
async fn test_denied_and_restricted_raise_alert() {
    for status in [AuthorizationState::Denied, AuthorizationState::Restricted] {
        let h = harness(status);
        h.check().await;

        let ui = h.store.snapshot();
        assert!(ui.alert, "{status} should raise the alert");
        assert!(!ui.session_running);
        assert_eq!(h.permission.requests.load(Ordering::SeqCst), 0);
        assert_eq!(h.probe.starts.load(Ordering::SeqCst), 0);

        h.store.apply(UiEvent::DismissAlert);
        assert!(!h.store.snapshot().alert);
    }
}

#[tokio::test]
async fn test_missing_camera_reports_configuration_error() {
    let h = harness_with(
        AuthorizationState::Authorized,
        true,
        Vec::new(),
        CaptureFailurePolicy::RestartSession,
    );
    let outcome = h.model.check().await;
    assert_eq!(
        outcome.setup,
        Some(Err(AppError::Configuration(ConfigError::DeviceUnavailable)))
    );
    assert!(!outcome.session_running);
}

#[tokio::test]
async fn test_front_camera_only_never_runs() {
    let front = CameraDevice {
        name: "Front".to_string(),
        path: "7".to_string(),
        position: CameraPosition::Front,
    };
    let h = harness_with(
        AuthorizationState::Authorized,
        true,
        vec![front],
        CaptureFailurePolicy::RestartSession,
    );
    h.check().await;

    let ui = h.store.snapshot();
    assert!(!ui.session_running);
    assert_eq!(
        ui.last_error,
        Some(AppError::Configuration(ConfigError::DeviceUnavailable))
    );
    assert_eq!(h.model.active_device(), None);

    h.capture().await;
    let ui = h.store.snapshot();
    assert!(!ui.is_taken);
    assert_eq!(ui.last_error, Some(AppError::Capture(CaptureError::NotRunning)));
    assert_eq!(h.probe.starts.load(Ordering::SeqCst), 0);
    assert_eq!(h.probe.grabs.load(Ordering::SeqCst), 0);
}

// ===== Capture =====

#[tokio::test]
async fn test_capture_stops_session_and_keeps_photo() {
    let h = harness(AuthorizationState::Authorized);
    h.check().await;
    h.capture().await;

    let ui = h.store.snapshot();
    assert!(ui.is_taken);
    assert!(!ui.is_saved);
    assert!(!ui.session_running);
    assert_eq!(h.probe.stops.load(Ordering::SeqCst), 1);

    // Nothing is written until the user saves
    assert_eq!(h.library.count(), 0);
}

#[tokio::test]
async fn test_capture_without_session_fails() {
    let h = harness(AuthorizationState::Denied);
    h.check().await;

    let outcome = h.model.capture().await;
    assert_eq!(outcome.result, Err(CaptureError::NotRunning));
    assert_eq!(h.model.save().await, Err(SaveError::NothingCaptured));
}

#[tokio::test]
async fn test_failed_capture_restarts_preview() {
    let h = harness(AuthorizationState::Authorized);
    h.check().await;
    h.probe.fail_grab.store(true, Ordering::SeqCst);
    h.capture().await;

    let ui = h.store.snapshot();
    assert!(!ui.is_taken);
    assert!(ui.session_running);
    assert_eq!(ui.last_error, Some(AppError::Capture(CaptureError::NoFrame)));
    assert_eq!(h.probe.starts.load(Ordering::SeqCst), 2);
    assert_eq!(h.model.save().await, Err(SaveError::NothingCaptured));
}

#[tokio::test]
async fn test_failed_capture_can_leave_session_stopped() {
    let h = harness_with(
        AuthorizationState::Authorized,
        true,
        vec![back_camera()],
        CaptureFailurePolicy::LeaveStopped,
    );
    h.check().await;
    h.probe.fail_grab.store(true, Ordering::SeqCst);
    h.capture().await;

    assert!(!h.store.snapshot().session_running);
    assert_eq!(h.probe.starts.load(Ordering::SeqCst), 1);
}

// ===== Save =====

#[tokio::test]
async fn test_save_writes_once() {
    let h = harness(AuthorizationState::Authorized);
    h.check().await;
    h.capture().await;

    let first = h.save().await;
    assert_eq!(
        first,
        Ok(SaveOutcome::Saved(PathBuf::from("/photos/IMG_1.jpg")))
    );
    let ui = h.store.snapshot();
    assert!(ui.is_saved);
    assert_eq!(ui.last_saved_path, Some(PathBuf::from("/photos/IMG_1.jpg")));

    let second = h.model.save().await;
    assert_eq!(second, Ok(SaveOutcome::AlreadySaved));
    assert_eq!(h.library.count(), 1);
    assert_eq!(h.library.writes.lock().unwrap()[0].1, ImageFormat::Jpeg);
}

#[tokio::test]
async fn test_save_before_capture_is_rejected() {
    let h = harness(AuthorizationState::Authorized);
    h.check().await;

    let result = h.save().await;
    assert_eq!(result, Err(SaveError::NothingCaptured));
    assert!(!h.store.snapshot().is_saved);
    assert_eq!(h.library.count(), 0);
}

#[tokio::test]
async fn test_failed_save_can_be_retried() {
    let h = harness(AuthorizationState::Authorized);
    h.check().await;
    h.capture().await;

    h.library.fail.store(true, Ordering::SeqCst);
    let result = h.save().await;
    assert!(matches!(result, Err(SaveError::Write(_))));
    let ui = h.store.snapshot();
    assert!(!ui.is_saved);
    assert!(ui.can_save());

    h.library.fail.store(false, Ordering::SeqCst);
    assert!(matches!(h.save().await, Ok(SaveOutcome::Saved(_))));
    assert!(h.store.snapshot().is_saved);
}

// ===== Retake =====

#[tokio::test]
async fn test_retake_discards_photo_and_resumes() {
    let h = harness(AuthorizationState::Authorized);
    h.check().await;
    h.capture().await;
    h.save().await.unwrap();
    h.retake().await;

    let ui = h.store.snapshot();
    assert!(!ui.is_taken);
    assert!(!ui.is_saved);
    assert!(ui.session_running);
    assert!(ui.can_capture());
    assert_eq!(h.model.save().await, Err(SaveError::NothingCaptured));

    // A new photo can be taken and saved again
    h.capture().await;
    assert!(matches!(h.save().await, Ok(SaveOutcome::Saved(_))));
    assert_eq!(h.library.count(), 2);
}

// ===== Preview =====

#[tokio::test]
async fn test_preview_keeps_last_frame_after_capture() {
    let h = harness(AuthorizationState::Authorized);
    let mut preview = h.model.preview_receiver();
    assert!(preview.borrow().is_none());

    h.check().await;
    assert!(preview.has_changed().unwrap());
    assert!(preview.borrow_and_update().is_some());

    h.capture().await;
    assert!(preview.borrow().is_some());
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let h = harness(AuthorizationState::Authorized);
    assert!(h.model.start().await.is_err(), "unconfigured session must not start");

    h.check().await;
    assert_eq!(h.model.start().await, Ok(true));
    assert_eq!(h.probe.starts.load(Ordering::SeqCst), 1);

    h.model.stop().await.unwrap();
    h.model.stop().await.unwrap();
    assert_eq!(h.probe.stops.load(Ordering::SeqCst), 1);

    assert_eq!(h.model.start().await, Ok(true));
    assert_eq!(h.probe.starts.load(Ordering::SeqCst), 2);
}
