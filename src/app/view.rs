// SPDX-License-Identifier: GPL-3.0-only

//! Capture screen layout
//!
//! Full-window preview with a bottom bar: the shutter button while the
//! preview runs, save and retake once a photo is taken.

use super::{AppModel, Message};
use crate::constants::ui;
use crate::fl;
use cosmic::Element;
use cosmic::iced::{Alignment, Background, Color, ContentFit, Length};
use cosmic::widget;

impl AppModel {
    pub fn view(&self) -> Element<'_, Message> {
        let content = widget::column()
            .push(self.build_preview())
            .push(self.build_status())
            .push(self.build_bottom_bar())
            .width(Length::Fill)
            .height(Length::Fill);

        widget::container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(|_theme| widget::container::Style {
                background: Some(Background::Color(Color::BLACK)),
                ..Default::default()
            })
            .into()
    }

    /// Preview frames scaled to fill, or a placeholder until the first one
    fn build_preview(&self) -> Element<'_, Message> {
        match &self.preview {
            Some(handle) => widget::image::Image::new(handle.clone())
                .content_fit(ContentFit::Cover)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => {
                let label = if self.ui.authorization.is_some() && !self.ui.session_running {
                    fl!("no-camera")
                } else {
                    fl!("starting-camera")
                };
                let text = widget::text::body(label)
                    .class(cosmic::theme::style::Text::Color(Color::WHITE));
                widget::container(text)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .center(Length::Fill)
                    .into()
            }
        }
    }

    /// Last error or the path of the saved photo
    fn build_status(&self) -> Element<'_, Message> {
        let spacing = cosmic::theme::spacing();

        let row = if let Some(err) = &self.ui.last_error {
            widget::row()
                .push(
                    widget::text::body(fl!("error-prefix", error = err.to_string()))
                        .class(cosmic::theme::style::Text::Color(Color::from_rgb(1.0, 0.45, 0.4))),
                )
                .push(widget::Space::new(Length::Fill, Length::Shrink))
                .push(widget::button::text(fl!("dismiss")).on_press(Message::DismissError))
        } else if let Some(path) = &self.ui.last_saved_path {
            widget::row().push(
                widget::text::caption(fl!("saved-to", path = path.display().to_string()))
                    .class(cosmic::theme::style::Text::Color(Color::WHITE)),
            )
        } else {
            return widget::Space::new(Length::Fill, Length::Shrink).into();
        };

        widget::container(row.align_y(Alignment::Center).spacing(spacing.space_s))
            .width(Length::Fill)
            .padding([spacing.space_xxs, spacing.space_s])
            .style(|_theme| widget::container::Style {
                background: Some(Background::Color(Color::from_rgba(
                    0.0,
                    0.0,
                    0.0,
                    ui::OVERLAY_BACKGROUND_ALPHA,
                ))),
                ..Default::default()
            })
            .into()
    }

    fn build_bottom_bar(&self) -> Element<'_, Message> {
        let spacing = cosmic::theme::spacing();

        let controls: Element<'_, Message> = if self.ui.is_taken {
            self.build_review_controls()
        } else {
            self.build_capture_button()
        };

        widget::container(controls)
            .width(Length::Fill)
            .center_x(Length::Fill)
            .padding([ui::BOTTOM_BAR_PADDING, spacing.space_m])
            .into()
    }

    /// White shutter button; inert while a capture is in flight
    fn build_capture_button(&self) -> Element<'_, Message> {
        let enabled = self.ui.can_capture();
        let color = if enabled {
            Color::WHITE
        } else if self.ui.is_capturing {
            Color::from_rgb(0.7, 0.7, 0.7)
        } else {
            Color::from_rgba(0.5, 0.5, 0.5, 0.3)
        };

        let inner = widget::container(widget::Space::new(
            Length::Fixed(ui::CAPTURE_BUTTON_INNER),
            Length::Fixed(ui::CAPTURE_BUTTON_INNER),
        ))
        .style(move |_theme| widget::container::Style {
            background: Some(Background::Color(color)),
            border: cosmic::iced::Border {
                radius: [ui::CAPTURE_BUTTON_RADIUS; 4].into(),
                ..Default::default()
            },
            ..Default::default()
        });

        let mut button = widget::button::custom(inner)
            .padding(0)
            .width(Length::Fixed(ui::CAPTURE_BUTTON_OUTER))
            .height(Length::Fixed(ui::CAPTURE_BUTTON_OUTER));
        if enabled {
            button = button.on_press(Message::Capture);
        }

        widget::container(button)
            .width(Length::Fixed(ui::CAPTURE_BUTTON_OUTER))
            .height(Length::Fixed(ui::CAPTURE_BUTTON_OUTER))
            .center_x(ui::CAPTURE_BUTTON_OUTER)
            .center_y(ui::CAPTURE_BUTTON_OUTER)
            .into()
    }

    /// Retake on the left, save on the right
    fn build_review_controls(&self) -> Element<'_, Message> {
        let spacing = cosmic::theme::spacing();

        let save_label = if self.ui.is_saved {
            fl!("saved")
        } else if self.ui.is_saving {
            fl!("saving")
        } else {
            fl!("save")
        };
        let mut save = widget::button::suggested(save_label);
        if self.ui.can_save() {
            save = save.on_press(Message::Save);
        }

        let mut retake = widget::button::standard(fl!("retake"));
        if self.ui.can_retake() {
            retake = retake.on_press(Message::Retake);
        }

        widget::row()
            .push(retake)
            .push(widget::Space::new(Length::Fill, Length::Shrink))
            .push(save)
            .align_y(Alignment::Center)
            .spacing(spacing.space_m)
            .height(Length::Fixed(ui::CAPTURE_BUTTON_OUTER))
            .width(Length::Fill)
            .into()
    }
}
