// SPDX-License-Identifier: MPL-2.0

//! Capture screen for the COSMIC desktop
//!
//! - `update`: applies worker outcomes to the UI state
//! - `view`: preview, capture / save / retake controls, permission alert
//!
//! All camera work goes through [`CameraModel`]; its async operations are run
//! with `Task::perform` and their outcomes come back as messages, so the
//! [`StateStore`] is only touched from `update`.

mod update;
mod view;

use crate::backends::camera::CameraFrame;
use crate::config::Config;
use crate::constants::APP_ID;
use crate::errors::SaveError;
use crate::fl;
use crate::model::{CameraModel, CaptureOutcome, CheckOutcome, RetakeOutcome, SaveOutcome};
use crate::permission::PortalPermission;
use crate::preview::PreviewSurface;
use crate::state::{StateStore, UiState};
use cosmic::cosmic_config;
use cosmic::iced::Subscription;
use cosmic::widget;
use cosmic::{Element, Task};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Application state
pub struct AppModel {
    core: cosmic::Core,
    config: Config,
    config_handler: Option<cosmic_config::Config>,
    model: CameraModel,
    store: StateStore,
    /// Copy of the store's state, refreshed after every event
    ui: UiState,
    /// Latest preview frame converted for the image widget
    preview: Option<widget::image::Handle>,
}

/// Messages emitted by the application and its widgets
#[derive(Debug, Clone)]
pub enum Message {
    Checked(CheckOutcome),
    PreviewFrame(Arc<CameraFrame>),
    Capture,
    Captured(CaptureOutcome),
    Save,
    Saved(Result<SaveOutcome, SaveError>),
    Retake,
    Retaken(RetakeOutcome),
    DismissAlert,
    DismissError,
    UpdateConfig(Config),
}

impl cosmic::Application for AppModel {
    type Executor = cosmic::executor::Default;

    type Flags = ();

    type Message = Message;

    const APP_ID: &'static str = APP_ID;

    fn core(&self) -> &cosmic::Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut cosmic::Core {
        &mut self.core
    }

    /// Load settings, build the camera model and run the permission check
    fn init(
        core: cosmic::Core,
        _flags: Self::Flags,
    ) -> (Self, Task<cosmic::Action<Self::Message>>) {
        let (config_handler, config) = Config::load();

        if let Err(e) = gstreamer::init() {
            error!(error = %e, "Failed to initialize GStreamer");
        }

        let model = CameraModel::new(config.model_parts(Arc::new(PortalPermission::new())));

        let store = StateStore::new();
        let ui = store.snapshot();

        let app = AppModel {
            core,
            config,
            config_handler,
            model,
            store,
            ui,
            preview: None,
        };

        info!(backend = %app.config.backend, "Checking camera authorization");
        let model = app.model.clone();
        let check_task = Task::perform(async move { model.check().await }, |outcome| {
            cosmic::Action::App(Message::Checked(outcome))
        });

        (app, check_task)
    }

    /// Permission alert
    fn dialog(&self) -> Option<Element<'_, Self::Message>> {
        if !self.ui.alert {
            return None;
        }
        Some(
            widget::dialog()
                .title(fl!("camera-access-title"))
                .body(fl!("camera-access-body"))
                .primary_action(
                    widget::button::suggested(fl!("dismiss")).on_press(Message::DismissAlert),
                )
                .into(),
        )
    }

    fn view(&self) -> Element<'_, Self::Message> {
        self.view()
    }

    /// Preview frames and settings changes
    fn subscription(&self) -> Subscription<Self::Message> {
        use cosmic::iced::futures::SinkExt;

        let config_sub = self
            .core()
            .watch_config::<Config>(Self::APP_ID)
            .map(|update| Message::UpdateConfig(update.config));

        // The preview channel belongs to the session and never changes, so
        // one subscription serves the whole process
        let receiver = self.model.preview_receiver();
        let preview_sub = Subscription::run_with_id(
            "preview",
            cosmic::iced::stream::channel(4, move |mut output| async move {
                let mut surface = PreviewSurface::new(receiver);
                info!("Preview surface bound");

                while let Some(frame) = surface.next_frame().await {
                    let Some(frame) = frame else {
                        continue;
                    };
                    if output.send(Message::PreviewFrame(frame)).await.is_err() {
                        warn!("Preview channel closed");
                        break;
                    }
                }
                info!("Preview surface released");
            }),
        );

        Subscription::batch([config_sub, preview_sub])
    }

    fn update(&mut self, message: Self::Message) -> Task<cosmic::Action<Self::Message>> {
        self.update(message)
    }
}
