// SPDX-License-Identifier: MPL-2.0

//! Camera model
//!
//! Owns the permission gate, the session controller, the capture delegate and
//! the photo library. Every operation runs its hardware and file work on the
//! tokio blocking pool and returns a plain outcome value; the caller applies
//! it to the [`StateStore`](crate::state::StateStore) on the UI context.

use crate::backends::camera::{CameraBackend, CameraDevice, PreviewReceiver};
use crate::capture::PhotoCaptureDelegate;
use crate::errors::{AppError, CaptureError, PermissionError, SaveError, SessionError};
use crate::library::PhotoLibrary;
use crate::permission::{AuthorizationState, PermissionGate};
use crate::pipelines::photo::PhotoSettings;
use crate::session::SessionController;
use crate::state::UiEvent;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// What happens to the preview after a capture fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureFailurePolicy {
    /// Start the session again so the user can retry
    #[default]
    RestartSession,
    /// Keep the session stopped
    LeaveStopped,
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the library at this path
    Saved(PathBuf),
    /// A save is pending or already succeeded; nothing was written
    AlreadySaved,
}

/// Result of the launch-time permission check and session setup
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub authorization: AuthorizationState,
    /// Set when a request was answered with a refusal or failed
    pub refusal: Option<PermissionError>,
    /// Set when setup ran
    pub setup: Option<Result<(), AppError>>,
    pub session_running: bool,
}

impl CheckOutcome {
    /// UI events for this outcome, in application order
    pub fn into_events(self) -> Vec<UiEvent> {
        let mut events = vec![UiEvent::AuthorizationChecked(self.authorization)];
        if let Some(refusal) = self.refusal {
            events.push(UiEvent::AccessRefused(refusal));
        }
        if let Some(Err(err)) = self.setup {
            events.push(UiEvent::Failed(err));
        }
        events.push(UiEvent::SessionRunning(self.session_running));
        events
    }
}

/// Result of a capture request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub result: Result<(), CaptureError>,
    pub session_running: bool,
}

impl From<CaptureOutcome> for UiEvent {
    fn from(outcome: CaptureOutcome) -> Self {
        UiEvent::CaptureFinished {
            result: outcome.result,
            session_running: outcome.session_running,
        }
    }
}

/// Result of a retake request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetakeOutcome {
    pub result: Result<(), SessionError>,
    pub session_running: bool,
}

impl RetakeOutcome {
    pub fn into_events(self) -> Vec<UiEvent> {
        let mut events = vec![UiEvent::Retaken {
            session_running: self.session_running,
        }];
        if let Err(err) = self.result {
            events.push(UiEvent::Failed(err.into()));
        }
        events
    }
}

/// Everything the capture screen needs to build a model
pub struct ModelParts {
    pub permission: Arc<dyn PermissionGate>,
    pub backend: Box<dyn CameraBackend>,
    pub library: Arc<dyn PhotoLibrary>,
    pub photo_settings: PhotoSettings,
    pub failure_policy: CaptureFailurePolicy,
    /// Device to prefer over the default back camera
    pub preferred_camera: Option<String>,
}

/// Camera capture workflow
///
/// Cheap to clone; clones share the same session and photo.
#[derive(Clone)]
pub struct CameraModel {
    permission: Arc<dyn PermissionGate>,
    session: Arc<Mutex<SessionController>>,
    delegate: Arc<Mutex<PhotoCaptureDelegate>>,
    library: Arc<dyn PhotoLibrary>,
    preview: PreviewReceiver,
    failure_policy: CaptureFailurePolicy,
    preferred_camera: Option<String>,
}

impl CameraModel {
    pub fn new(parts: ModelParts) -> Self {
        let controller = SessionController::new(parts.backend, parts.photo_settings);
        let preview = controller.preview_receiver();
        Self {
            permission: parts.permission,
            session: Arc::new(Mutex::new(controller)),
            delegate: Arc::new(Mutex::new(PhotoCaptureDelegate::new())),
            library: parts.library,
            preview,
            failure_policy: parts.failure_policy,
            preferred_camera: parts.preferred_camera,
        }
    }

    /// Receiver on the session's preview channel
    ///
    /// Does not touch the session lock, so it is safe on the UI context.
    pub fn preview_receiver(&self) -> PreviewReceiver {
        self.preview.clone()
    }

    fn session(&self) -> MutexGuard<'_, SessionController> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delegate(&self) -> MutexGuard<'_, PhotoCaptureDelegate> {
        self.delegate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check authorization, request it if undecided, and start the session when allowed
    pub async fn check(&self) -> CheckOutcome {
        let this = self.clone();
        run_blocking(move || this.check_blocking())
            .await
            .unwrap_or_else(|err| CheckOutcome {
                authorization: AuthorizationState::Restricted,
                refusal: None,
                setup: Some(Err(err)),
                session_running: false,
            })
    }

    fn check_blocking(&self) -> CheckOutcome {
        let authorization = self.permission.authorization_status();
        info!(state = %authorization, "Camera authorization");

        let mut outcome = CheckOutcome {
            authorization,
            refusal: None,
            setup: None,
            session_running: false,
        };

        let allowed = match authorization {
            AuthorizationState::Authorized => true,
            AuthorizationState::NotDetermined => match self.permission.request_access() {
                Ok(true) => true,
                Ok(false) => {
                    info!("Camera access refused");
                    outcome.refusal = Some(PermissionError::Denied);
                    false
                }
                Err(err) => {
                    warn!(error = %err, "Camera access request failed");
                    outcome.refusal = Some(err);
                    false
                }
            },
            AuthorizationState::Denied | AuthorizationState::Restricted => false,
        };

        if allowed {
            let result = self.setup_blocking();
            if let Err(err) = &result {
                error!(error = %err, "Capture session setup failed");
            }
            outcome.setup = Some(result);
        }
        outcome.session_running = self.session().is_running();
        outcome
    }

    fn setup_blocking(&self) -> Result<(), AppError> {
        let remote = self.permission.open_remote();
        let mut session = self.session();
        if let Some(fd) = remote {
            session.set_pipewire_remote(fd);
        }
        session.configure(self.preferred_camera.as_deref())?;
        session.start()?;
        Ok(())
    }

    /// Take a still photo; the session is stopped afterwards
    pub async fn capture(&self) -> CaptureOutcome {
        let this = self.clone();
        run_blocking(move || this.capture_blocking())
            .await
            .unwrap_or_else(|err| CaptureOutcome {
                result: Err(CaptureError::Backend(err.to_string())),
                session_running: false,
            })
    }

    fn capture_blocking(&self) -> CaptureOutcome {
        let begin = self.delegate().begin_capture();
        if let Err(err) = begin {
            debug!(error = %err, "Capture request ignored");
            return CaptureOutcome {
                result: Err(err),
                session_running: self.session().is_running(),
            };
        }

        let mut session = self.session();
        let was_running = session.is_running();
        let still = session.capture_still();
        let result = self.delegate().finish_capture(still);

        if result.is_err()
            && was_running
            && self.failure_policy == CaptureFailurePolicy::RestartSession
        {
            info!("Restarting session after failed capture");
            if let Err(err) = session.start() {
                warn!(error = %err, "Failed to restart session");
            }
        }

        CaptureOutcome {
            result,
            session_running: session.is_running(),
        }
    }

    /// Decode the captured photo and write it to the library
    pub async fn save(&self) -> Result<SaveOutcome, SaveError> {
        let this = self.clone();
        run_blocking(move || this.save_blocking())
            .await
            .unwrap_or_else(|err| Err(SaveError::Write(err.to_string())))
    }

    fn save_blocking(&self) -> Result<SaveOutcome, SaveError> {
        let Some(ticket) = self.delegate().begin_save()? else {
            debug!("Photo already saved or saving");
            return Ok(SaveOutcome::AlreadySaved);
        };

        let result = decode_and_write(self.library.as_ref(), &ticket.bytes);
        let saved = self.delegate().finish_save(ticket.generation, result.is_ok());
        match result {
            Ok(path) if saved => Ok(SaveOutcome::Saved(path)),
            // Retaken while the write was in flight; the file exists but the
            // photo it belonged to is gone
            Ok(path) => {
                info!(path = %path.display(), "Saved photo was discarded by retake");
                Ok(SaveOutcome::AlreadySaved)
            }
            Err(err) => {
                warn!(error = %err, "Failed to save photo");
                Err(err)
            }
        }
    }

    /// Drop the photo and resume the preview
    pub async fn retake(&self) -> RetakeOutcome {
        let this = self.clone();
        run_blocking(move || this.retake_blocking())
            .await
            .unwrap_or_else(|err| RetakeOutcome {
                result: Err(SessionError::Backend(err.to_string())),
                session_running: false,
            })
    }

    fn retake_blocking(&self) -> RetakeOutcome {
        self.delegate().clear();
        let mut session = self.session();
        let result = session.start();
        if let Err(err) = &result {
            warn!(error = %err, "Failed to resume session");
        }
        RetakeOutcome {
            result,
            session_running: session.is_running(),
        }
    }

    /// Start the session if it is configured
    pub async fn start(&self) -> Result<bool, SessionError> {
        let this = self.clone();
        run_blocking(move || {
            let mut session = this.session();
            session.start()?;
            Ok(session.is_running())
        })
        .await
        .unwrap_or_else(|err| Err(SessionError::Backend(err.to_string())))
    }

    /// Stop the session and release the camera
    pub async fn stop(&self) -> Result<(), SessionError> {
        let this = self.clone();
        run_blocking(move || this.session().stop())
            .await
            .unwrap_or_else(|err| Err(SessionError::Backend(err.to_string())))
    }

    /// Device bound to the session, once configured
    pub fn active_device(&self) -> Option<CameraDevice> {
        self.session().active_device().cloned()
    }
}

/// Validate the bytes as an image and hand them to the library
fn decode_and_write(library: &dyn PhotoLibrary, bytes: &[u8]) -> Result<PathBuf, SaveError> {
    let format = image::guess_format(bytes).map_err(|e| SaveError::Decode(e.to_string()))?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| SaveError::Decode(e.to_string()))?;
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        format = ?format,
        "Captured photo decoded"
    );
    library.write(bytes, format)
}

/// Run blocking work on the worker context
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Other(format!("Worker task failed: {}", e)))
}
