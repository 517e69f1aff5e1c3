use egui::{RichText, Ui};
use egui_phosphor::regular as icons;

use crate::timeline::{DateWindow, TimelineScale};
use crate::ui::theme;

/// What the user asked for from the toolbar this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    Prev,
    Today,
    Next,
    Scale(TimelineScale),
    Refresh,
}

/// Render the navigation bar above the chart.
pub fn show_toolbar(
    ui: &mut Ui,
    scale: TimelineScale,
    window: &DateWindow,
    busy: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        if ui
            .button(icons::CARET_LEFT)
            .on_hover_text(format!("Previous {}", scale.label().to_lowercase()))
            .clicked()
        {
            action = ToolbarAction::Prev;
        }
        if ui.button(format!("{} Today", icons::CALENDAR)).clicked() {
            action = ToolbarAction::Today;
        }
        if ui
            .button(icons::CARET_RIGHT)
            .on_hover_text(format!("Next {}", scale.label().to_lowercase()))
            .clicked()
        {
            action = ToolbarAction::Next;
        }

        ui.separator();
        for option in TimelineScale::ALL {
            if ui.selectable_label(scale == option, option.label()).clicked() && scale != option {
                action = ToolbarAction::Scale(option);
            }
        }

        ui.separator();
        ui.label(
            RichText::new(window_title(window, scale))
                .font(theme::font_header())
                .color(theme::TEXT_PRIMARY),
        );

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let refresh = ui.add_enabled(!busy, egui::Button::new(format!("{} Refresh", icons::ARROWS_CLOCKWISE)));
            if refresh.clicked() {
                action = ToolbarAction::Refresh;
            }
            if busy {
                ui.spinner();
            }
        });
    });

    action
}

fn window_title(window: &DateWindow, scale: TimelineScale) -> String {
    let first = window.start.date();
    let last = window.end.date();
    match scale {
        TimelineScale::Day => first.format("%A, %d %B %Y").to_string(),
        TimelineScale::Week => format!(
            "Week {}  ·  {} – {}",
            first.format("%V"),
            first.format("%d %b"),
            last.format("%d %b %Y"),
        ),
        TimelineScale::Month => first.format("%B %Y").to_string(),
    }
}
