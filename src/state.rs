// SPDX-License-Identifier: MPL-2.0

//! UI state machine
//!
//! [`UiState`] is what the front ends render. It only changes through
//! [`StateStore::apply`], which runs on the UI context with the outcome of a
//! worker-side operation. Front ends either poll [`StateStore::snapshot`] or
//! watch [`StateStore::subscribe`].

use crate::errors::{AppError, CaptureError, PermissionError, SaveError};
use crate::model::SaveOutcome;
use crate::permission::AuthorizationState;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::debug;

/// Everything the capture screen shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// Result of the launch-time permission check
    pub authorization: Option<AuthorizationState>,
    /// Camera access was refused; show the settings hint
    pub alert: bool,
    pub session_running: bool,
    pub is_taken: bool,
    /// Never true unless `is_taken` is
    pub is_saved: bool,
    pub is_saving: bool,
    pub is_capturing: bool,
    /// Retake requested, photo not yet dropped
    pub is_retaking: bool,
    pub last_error: Option<AppError>,
    pub last_saved_path: Option<PathBuf>,
}

impl UiState {
    /// Capture button visible
    pub fn can_capture(&self) -> bool {
        self.session_running && !self.is_taken && !self.is_capturing
    }

    /// Save button enabled
    pub fn can_save(&self) -> bool {
        self.is_taken && !self.is_saved && !self.is_saving && !self.is_retaking
    }

    /// Retake button visible
    pub fn can_retake(&self) -> bool {
        self.is_taken && !self.is_saving && !self.is_retaking
    }

    /// Fold one event into the state
    pub fn apply(&mut self, event: UiEvent) {
        debug!(?event, "UI event");
        match event {
            UiEvent::AuthorizationChecked(state) => {
                self.authorization = Some(state);
                if matches!(
                    state,
                    AuthorizationState::Denied | AuthorizationState::Restricted
                ) {
                    self.alert = true;
                }
            }
            UiEvent::AccessRefused(err) => {
                // Answered in the portal dialog just now; no settings hint
                self.last_error = Some(err.into());
            }
            UiEvent::SessionRunning(running) => {
                self.session_running = running;
            }
            UiEvent::CaptureStarted => {
                self.is_capturing = true;
                self.last_error = None;
            }
            UiEvent::CaptureFinished {
                result,
                session_running,
            } => {
                self.is_capturing = false;
                self.session_running = session_running;
                match result {
                    Ok(()) => {
                        self.is_taken = true;
                        self.is_saved = false;
                        self.last_saved_path = None;
                    }
                    Err(err) => self.last_error = Some(err.into()),
                }
            }
            UiEvent::SaveStarted => {
                if self.is_taken {
                    self.is_saving = true;
                    self.last_error = None;
                }
            }
            UiEvent::SaveFinished(result) => {
                self.is_saving = false;
                match result {
                    Ok(SaveOutcome::Saved(path)) => {
                        self.is_saved = self.is_taken;
                        self.last_saved_path = Some(path);
                    }
                    Ok(SaveOutcome::AlreadySaved) => {}
                    Err(err) => self.last_error = Some(err.into()),
                }
            }
            UiEvent::RetakeStarted => {
                if self.is_taken {
                    self.is_retaking = true;
                }
            }
            UiEvent::Retaken { session_running } => {
                self.is_retaking = false;
                self.is_taken = false;
                self.is_saved = false;
                self.is_saving = false;
                self.last_saved_path = None;
                self.session_running = session_running;
            }
            UiEvent::Failed(err) => {
                self.last_error = Some(err);
            }
            UiEvent::DismissAlert => {
                self.alert = false;
            }
            UiEvent::DismissError => {
                self.last_error = None;
            }
        }

        if self.is_saved && !self.is_taken {
            self.is_saved = false;
        }
    }
}

/// Worker outcomes delivered to the UI context
#[derive(Debug, Clone)]
pub enum UiEvent {
    AuthorizationChecked(AuthorizationState),
    /// The permission request was refused or could not be made
    AccessRefused(PermissionError),
    SessionRunning(bool),
    CaptureStarted,
    CaptureFinished {
        result: Result<(), CaptureError>,
        session_running: bool,
    },
    SaveStarted,
    SaveFinished(Result<SaveOutcome, SaveError>),
    RetakeStarted,
    Retaken {
        session_running: bool,
    },
    Failed(AppError),
    DismissAlert,
    DismissError,
}

/// Observable holder of the [`UiState`]
#[derive(Debug)]
pub struct StateStore {
    tx: watch::Sender<UiState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(UiState::default());
        Self { tx }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> UiState {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.tx.subscribe()
    }

    pub fn apply(&self, event: UiEvent) {
        self.tx.send_modify(|state| state.apply(event));
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
