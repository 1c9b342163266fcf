//! Status card showing the state of a background service

use egui::{Color32, RichText, Rounding, Vec2};

use crate::dashboard::theme::ThemeColors;
use crate::shared::ClassifierStatus;

/// Health shown by the indicator dot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardStatus {
    Ready,
    Busy,
    Idle,
    Error,
}

impl CardStatus {
    pub fn color(&self) -> Color32 {
        match self {
            CardStatus::Ready => ThemeColors::ACCENT_SUCCESS,
            CardStatus::Busy => ThemeColors::ACCENT_WARNING,
            CardStatus::Idle => ThemeColors::TEXT_SECONDARY,
            CardStatus::Error => ThemeColors::ACCENT_ERROR,
        }
    }
}

impl From<&ClassifierStatus> for CardStatus {
    fn from(status: &ClassifierStatus) -> Self {
        match status {
            ClassifierStatus::Unloaded => CardStatus::Idle,
            ClassifierStatus::Loading => CardStatus::Busy,
            ClassifierStatus::Ready => CardStatus::Ready,
            ClassifierStatus::Failed(_) => CardStatus::Error,
        }
    }
}

/// A titled card with a value line and an optional detail line
pub struct StatusCard {
    title: String,
    value: String,
    detail: Option<String>,
    status: CardStatus,
}

impl StatusCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>, status: CardStatus) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            detail: None,
            status,
        }
    }

    /// Card for the classifier; a failure reason becomes the detail line
    pub fn classifier(status: &ClassifierStatus) -> Self {
        let card = Self::new("Classifier", status.label(), CardStatus::from(status));
        match status {
            ClassifierStatus::Failed(reason) => card.with_detail(reason.clone()),
            _ => card,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(ThemeColors::BG_MEDIUM)
            .rounding(Rounding::same(8.0))
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.horizontal(|ui| {
                    let dot = ui.cursor().left_top() + Vec2::new(6.0, 10.0);
                    ui.painter().circle_filled(dot, 4.0, self.status.color());
                    ui.add_space(16.0);

                    ui.vertical(|ui| {
                        ui.label(RichText::new(&self.title).size(12.0).color(ThemeColors::TEXT_MUTED));
                        ui.label(
                            RichText::new(&self.value)
                                .size(16.0)
                                .color(ThemeColors::TEXT_PRIMARY)
                                .strong(),
                        );
                        if let Some(detail) = &self.detail {
                            ui.label(RichText::new(detail).size(11.0).color(self.status.color()));
                        }
                    });
                });
            });
    }
}
