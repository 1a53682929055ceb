// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! User actions start a [`CameraModel`](crate::model::CameraModel) operation
//! with `Task::perform`; the outcome returns as a message and is applied to
//! the state store here, on the UI context.

use super::{AppModel, Message};
use crate::config::Config;
use crate::preview::packed_rgba;
use crate::state::UiEvent;
use cosmic::Task;
use cosmic::cosmic_config::CosmicConfigEntry;
use cosmic::widget;
use tracing::{debug, error, info, warn};

impl AppModel {
    pub fn update(&mut self, message: Message) -> Task<cosmic::Action<Message>> {
        match message {
            Message::Checked(outcome) => {
                for event in outcome.into_events() {
                    self.apply(event);
                }
                self.remember_camera();
                Task::none()
            }
            Message::PreviewFrame(frame) => {
                match packed_rgba(&frame) {
                    Some(pixels) => {
                        self.preview = Some(widget::image::Handle::from_rgba(
                            frame.width,
                            frame.height,
                            pixels,
                        ));
                    }
                    None => debug!(format = ?frame.format, "Dropping unusable preview frame"),
                }
                Task::none()
            }
            Message::Capture => self.handle_capture(),
            Message::Captured(outcome) => {
                self.apply(outcome.into());
                Task::none()
            }
            Message::Save => self.handle_save(),
            Message::Saved(result) => {
                if let Ok(crate::model::SaveOutcome::Saved(path)) = &result {
                    info!(path = %path.display(), "Photo saved");
                }
                self.apply(UiEvent::SaveFinished(result));
                Task::none()
            }
            Message::Retake => self.handle_retake(),
            Message::Retaken(outcome) => {
                for event in outcome.into_events() {
                    self.apply(event);
                }
                Task::none()
            }
            Message::DismissAlert => {
                self.apply(UiEvent::DismissAlert);
                Task::none()
            }
            Message::DismissError => {
                self.apply(UiEvent::DismissError);
                Task::none()
            }
            Message::UpdateConfig(config) => self.handle_update_config(config),
        }
    }

    fn apply(&mut self, event: UiEvent) {
        self.store.apply(event);
        self.ui = self.store.snapshot();
    }

    /// Store the opened device so the next launch picks it again
    fn remember_camera(&mut self) {
        let Some(device) = self.model.active_device() else {
            return;
        };
        if self.config.last_camera_path.as_deref() == Some(device.path.as_str()) {
            return;
        }

        info!(device = %device.name, path = %device.path, "Remembering camera");
        self.config.last_camera_path = Some(device.path);
        if let Some(handler) = self.config_handler.as_ref()
            && let Err(err) = self.config.write_entry(handler)
        {
            error!(?err, "Failed to save camera setting");
        }
    }

    fn handle_capture(&mut self) -> Task<cosmic::Action<Message>> {
        if !self.ui.can_capture() {
            debug!("Capture ignored in current state");
            return Task::none();
        }
        self.apply(UiEvent::CaptureStarted);

        let model = self.model.clone();
        Task::perform(async move { model.capture().await }, |outcome| {
            cosmic::Action::App(Message::Captured(outcome))
        })
    }

    fn handle_save(&mut self) -> Task<cosmic::Action<Message>> {
        if !self.ui.can_save() {
            debug!("Save ignored in current state");
            return Task::none();
        }
        self.apply(UiEvent::SaveStarted);

        let model = self.model.clone();
        Task::perform(async move { model.save().await }, |result| {
            cosmic::Action::App(Message::Saved(result))
        })
    }

    fn handle_retake(&mut self) -> Task<cosmic::Action<Message>> {
        if !self.ui.can_retake() {
            debug!("Retake ignored in current state");
            return Task::none();
        }
        self.apply(UiEvent::RetakeStarted);

        let model = self.model.clone();
        Task::perform(async move { model.retake().await }, |outcome| {
            cosmic::Action::App(Message::Retaken(outcome))
        })
    }

    fn handle_update_config(&mut self, config: Config) -> Task<cosmic::Action<Message>> {
        info!("UpdateConfig received");
        let theme_changed = config.app_theme != self.config.app_theme;
        if config.backend != self.config.backend
            || config.photo_settings() != self.config.photo_settings()
        {
            // The session is built once per launch
            warn!("Camera settings changed, they apply after restart");
        }
        self.config = config;

        if theme_changed {
            cosmic::command::set_theme(self.config.app_theme.theme())
        } else {
            Task::none()
        }
    }
}
