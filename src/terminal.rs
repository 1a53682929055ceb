// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based capture screen
//!
//! Same workflow as the desktop window: preview, capture, save, retake.
//! Frames are drawn with Unicode half-block characters for improved
//! vertical resolution, cropped to fill the terminal.

use crate::backends::camera::CameraFrame;
use crate::config::Config;
use crate::constants::timing;
use crate::dispatch::Dispatcher;
use crate::fl;
use crate::model::CameraModel;
use crate::permission::PortalPermission;
use crate::preview::{CropRect, PreviewSurface, fill_crop};
use crate::state::{StateStore, UiEvent, UiState};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events drained by the terminal loop
type Events = Vec<UiEvent>;

/// Run the terminal capture screen
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let (_, config) = Config::load();
    let model = CameraModel::new(config.model_parts(Arc::new(PortalPermission::new())));

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &runtime, &model);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = runtime.block_on(model.stop()) {
        warn!(error = %err, "Failed to stop session");
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &tokio::runtime::Runtime,
    model: &CameraModel,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = StateStore::new();
    let (dispatcher, mut events) = Dispatcher::<Events>::new(runtime.handle().clone());
    let mut surface = PreviewSurface::new(model.preview_receiver());
    let mut frame_widget = FrameWidget::default();

    info!("Checking camera authorization");
    let worker = model.clone();
    dispatcher.submit(async move { worker.check().await }, |outcome| {
        outcome.into_events()
    });

    loop {
        drain_events(&mut events, &store);
        if surface.has_new_frame() {
            frame_widget.frame = surface.latest();
        }
        let ui = store.snapshot();

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            frame_widget.placeholder = placeholder(&ui);
            frame_widget.crop = frame_widget.frame.as_ref().map(|frame| {
                surface.visible_region(
                    frame,
                    camera_area.width as u32,
                    camera_area.height as u32 * 2,
                )
            });
            f.render_widget(&frame_widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let message = status_message(&ui);
            f.render_widget(StatusBar { message: &message }, status_area);
        })?;

        if event::poll(Duration::from_millis(timing::TERMINAL_TICK_MS))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            if key.code == KeyCode::Char('q')
                || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
            {
                break;
            }
            handle_key(key.code, &store, &dispatcher, model);
        }
    }

    Ok(())
}

/// Apply every pending worker outcome
fn drain_events(events: &mut mpsc::UnboundedReceiver<Events>, store: &StateStore) {
    while let Ok(batch) = events.try_recv() {
        for event in batch {
            store.apply(event);
        }
    }
}

fn handle_key(
    code: KeyCode,
    store: &StateStore,
    dispatcher: &Dispatcher<Events>,
    model: &CameraModel,
) {
    let ui = store.snapshot();
    let worker = model.clone();

    match code {
        KeyCode::Char(' ') if ui.can_capture() => {
            store.apply(UiEvent::CaptureStarted);
            dispatcher.submit(async move { worker.capture().await }, |outcome| {
                vec![outcome.into()]
            });
        }
        KeyCode::Char('s') if ui.can_save() => {
            store.apply(UiEvent::SaveStarted);
            dispatcher.submit(async move { worker.save().await }, |result| {
                vec![UiEvent::SaveFinished(result)]
            });
        }
        KeyCode::Char('r') if ui.can_retake() => {
            store.apply(UiEvent::RetakeStarted);
            dispatcher.submit(async move { worker.retake().await }, |outcome| {
                outcome.into_events()
            });
        }
        KeyCode::Esc => {
            dispatcher.post(vec![UiEvent::DismissAlert, UiEvent::DismissError]);
        }
        _ => {}
    }
}

/// Text shown in place of the preview
fn placeholder(ui: &UiState) -> String {
    if ui.alert {
        fl!("camera-access-body")
    } else if ui.authorization.is_some() && !ui.session_running && !ui.is_taken {
        fl!("no-camera")
    } else {
        fl!("starting-camera")
    }
}

fn status_message(ui: &UiState) -> String {
    if let Some(err) = &ui.last_error {
        fl!("error-prefix", error = err.to_string())
    } else if ui.is_saving {
        fl!("saving")
    } else if let Some(path) = &ui.last_saved_path {
        fl!("saved-to", path = path.display().to_string())
    } else {
        fl!("terminal-help")
    }
}

/// Widget that renders a camera frame using half-block characters
#[derive(Default)]
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
    /// Source region to draw; the whole frame cropped to fill when unset
    crop: Option<CropRect>,
    placeholder: String,
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            let msg = self.placeholder.as_str();
            let x = area.x + (area.width.saturating_sub(msg.chars().count() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };
        if area.width == 0 || area.height == 0 || frame.width == 0 || frame.height == 0 {
            return;
        }

        // Each cell shows two vertical pixels
        let dst_w = area.width as u32;
        let dst_h = area.height as u32 * 2;
        let crop = self
            .crop
            .unwrap_or_else(|| fill_crop(frame.width, frame.height, dst_w, dst_h));
        if crop.width == 0 || crop.height == 0 {
            return;
        }

        for ty in 0..area.height as u32 {
            for tx in 0..dst_w {
                let src_x = crop.x + tx * crop.width / dst_w;
                let src_top = crop.y + (ty * 2) * crop.height / dst_h;
                let src_bottom = crop.y + (ty * 2 + 1) * crop.height / dst_h;

                let (r, g, b) = frame.sample_rgb(src_x, src_top);
                let top = Color::Rgb(r, g, b);
                let (r, g, b) = frame.sample_rgb(src_x, src_bottom);
                let bottom = Color::Rgb(r, g, b);

                if let Some(cell) = buf.cell_mut((area.x + tx as u16, area.y + ty as u16)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}
