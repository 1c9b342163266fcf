//! Main window

use eframe::egui;
use egui::RichText;
use std::time::Duration;
use tracing::{error, info};

use crate::app::HangulApp;
use crate::config::AppConfig;
use crate::dashboard::components::{DrawingPad, StatusCard};
use crate::dashboard::components::status_card::CardStatus;
use crate::dashboard::theme::{self, ThemeColors};
use crate::shared::Command;

/// Poll interval while background work is outstanding
const BUSY_REPAINT: Duration = Duration::from_millis(50);

/// Height of the drawing pad in points
const PAD_HEIGHT: f32 = 360.0;

/// Alternate picks offered under the pad
const MAX_ALTERNATES: usize = 4;

/// The recognition window
pub struct DashboardApp {
    app: HangulApp,
    pad: DrawingPad,
    theme_applied: bool,
    minimized: bool,
}

impl DashboardApp {
    pub fn new(app: HangulApp) -> Self {
        Self {
            app,
            pad: DrawingPad::default(),
            theme_applied: false,
            minimized: false,
        }
    }

    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([720.0, 640.0])
                .with_min_inner_size([420.0, 520.0])
                .with_title("HangulScribe"),
            ..Default::default()
        }
    }

    /// Release the bitmap while minimized and rebuild it on restore
    fn track_visibility(&mut self, ctx: &egui::Context) {
        let minimized = ctx.input(|i| i.viewport().minimized).unwrap_or(false);
        if minimized == self.minimized {
            return;
        }
        self.minimized = minimized;
        if minimized {
            self.app.detach();
        } else {
            self.app.attach();
            self.pad.invalidate();
        }
    }

    fn run_commands(&mut self, commands: Vec<Command>) {
        if commands.is_empty() {
            return;
        }
        for command in commands {
            self.app.dispatch(command);
        }
        self.pad.invalidate();
    }

    fn render_controls(&self, ui: &mut egui::Ui, commands: &mut Vec<Command>) {
        let session = self.app.session();
        ui.horizontal(|ui| {
            if ui.button("Clear").clicked() {
                commands.push(Command::Clear);
            }
            let classify = ui.add_enabled(self.app.can_classify(), egui::Button::new("Classify"));
            if classify.clicked() {
                commands.push(Command::Classify);
            }
            if ui.button("Backspace").clicked() {
                commands.push(Command::Backspace);
            }
            if ui.button("Space").clicked() {
                commands.push(Command::Space);
            }
            let can_submit = !session.text.is_empty() && !session.is_translating();
            if ui.add_enabled(can_submit, egui::Button::new("Translate")).clicked() {
                commands.push(Command::Submit);
            }
        });
    }

    fn render_alternates(&self, ui: &mut egui::Ui, commands: &mut Vec<Command>) {
        let mut alternates = self.app.session().alternates().take(MAX_ALTERNATES).peekable();
        if alternates.peek().is_none() {
            return;
        }
        ui.horizontal(|ui| {
            ui.label(RichText::new("Did you mean").color(ThemeColors::TEXT_MUTED));
            for (index, label) in alternates {
                if ui.button(label).clicked() {
                    commands.push(Command::PickAlternate(index));
                }
            }
        });
    }

    fn render_text(&self, ui: &mut egui::Ui) {
        let session = self.app.session();

        ui.label(RichText::new("Recognized").color(ThemeColors::TEXT_MUTED));
        let mut text = session.text.as_str();
        ui.add(egui::TextEdit::singleline(&mut text).desired_width(f32::INFINITY));

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label(RichText::new("Translation").color(ThemeColors::TEXT_MUTED));
            if session.is_translating() {
                ui.spinner();
            }
        });
        let mut translation = session.translation.as_str();
        ui.add(egui::TextEdit::multiline(&mut translation).desired_rows(2).desired_width(f32::INFINITY));

        if let Some(message) = &session.last_error {
            ui.add_space(6.0);
            ui.label(RichText::new(message).color(ThemeColors::ACCENT_ERROR));
        }
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        StatusCard::classifier(&self.app.status()).show(ui);
        ui.add_space(8.0);

        let translation = &self.app.config().translation;
        let card = if translation.is_configured() {
            let pair = format!("{} -> {}", translation.source_lang, translation.target_lang);
            let status = if self.app.session().is_translating() {
                CardStatus::Busy
            } else {
                CardStatus::Ready
            };
            StatusCard::new("Translation", pair, status)
        } else {
            StatusCard::new("Translation", "Not configured", CardStatus::Idle)
                .with_detail("Set [translation] endpoint and api_key")
        };
        card.show(ui);
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            theme::install_hangul_font(ctx);
            self.theme_applied = true;
        }

        self.track_visibility(ctx);
        if self.app.poll_events() {
            self.pad.invalidate();
        }

        let mut commands = Vec::new();

        egui::SidePanel::right("status")
            .resizable(false)
            .default_width(200.0)
            .show(ctx, |ui| {
                ui.add_space(12.0);
                self.render_status(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().inner_margin(16.0).show(ui, |ui| {
                ui.heading("HangulScribe");
                ui.add_space(8.0);
                self.pad.show(ui, &mut self.app, PAD_HEIGHT);
                ui.add_space(8.0);
                self.render_controls(ui, &mut commands);
                self.render_alternates(ui, &mut commands);
                ui.add_space(8.0);
                self.render_text(ui);
            });
        });

        self.run_commands(commands);

        if self.app.is_busy() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}

/// Start the classifier and run the window until it is closed
pub fn run_dashboard(config: AppConfig) -> anyhow::Result<()> {
    let mut app = HangulApp::new(config)?;
    if let Err(e) = app.start_classifier() {
        error!("Failed to start classifier: {:#}", e);
    }

    info!("Opening recognition window");
    let dashboard = DashboardApp::new(app);
    eframe::run_native(
        "HangulScribe",
        DashboardApp::options(),
        Box::new(|_cc| Ok(Box::new(dashboard))),
    )
    .map_err(|e| anyhow::anyhow!("Window error: {}", e))
}
