use chrono::{Datelike, Duration, NaiveTime};
use egui::{Color32, Id, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};

use crate::timeline::{
    DateWindow, GridWidth, PointerButton, ProjectedTask, ScheduleChange, Timeline, TimelineScale,
};
use crate::ui::theme;

const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const LABEL_WIDTH: f32 = theme::LABEL_WIDTH;

/// What the chart produced this frame.
#[derive(Debug, Clone, Default)]
pub struct ChartOutput {
    /// Set on the frame a drag is released.
    pub commit: Option<ScheduleChange>,
}

/// Render the timeline: header, rows, connectors, and draggable bars.
pub fn show_gantt_chart(timeline: &mut Timeline, ui: &mut Ui) -> ChartOutput {
    let row_height = timeline.row_height();
    let projected: Vec<ProjectedTask> = timeline.projected().to_vec();
    let available = ui.available_size();
    let chart_height = (HEADER_HEIGHT + projected.len() as f32 * row_height + 20.0).max(available.y);

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let (response, painter) =
                ui.allocate_painter(Vec2::new(available.x, chart_height), Sense::hover());
            let rect = response.rect;
            let grid_rect = Rect::from_min_max(Pos2::new(rect.left() + LABEL_WIDTH, rect.top()), rect.max);
            let grid = GridWidth::from_pixels(grid_rect.width());
            let mut output = ChartOutput::default();

            painter.rect_filled(rect, 0.0, theme::BG_DARK);
            draw_timeline_header(&painter, grid_rect, timeline.window(), timeline.viewport().scale);

            // Rows and the label gutter
            let rows_top = rect.top() + HEADER_HEIGHT;
            for (i, task) in projected.iter().enumerate() {
                let y = rows_top + i as f32 * row_height;
                if i % 2 == 0 {
                    painter.rect_filled(
                        Rect::from_min_size(Pos2::new(rect.left(), y), Vec2::new(rect.width(), row_height)),
                        0.0,
                        theme::BG_PANEL,
                    );
                }
                painter.line_segment(
                    [Pos2::new(rect.left(), y + row_height), Pos2::new(rect.right(), y + row_height)],
                    Stroke::new(0.5, theme::BORDER_SUBTLE),
                );
                draw_row_label(&painter, rect.left(), y, row_height, task);
            }
            painter.line_segment(
                [Pos2::new(grid_rect.left(), rect.top()), Pos2::new(grid_rect.left(), rect.bottom())],
                Stroke::new(1.0, theme::BORDER_SUBTLE),
            );

            if let Some(now) = timeline.now_marker() {
                draw_today_line(&painter, grid_rect, now, rows_top, chart_height);
            }

            // Connectors sit under the bars
            let origin = Vec2::new(grid_rect.left(), rows_top);
            for connector in timeline.connectors(grid) {
                let points: Vec<Pos2> = connector
                    .path
                    .iter()
                    .map(|p| Pos2::new(p.x, p.y) + origin)
                    .collect();
                painter.add(Shape::line(points, Stroke::new(1.2, theme::CONNECTOR)));
                let head: Vec<Pos2> = connector
                    .arrowhead(theme::ARROW_SIZE)
                    .iter()
                    .map(|p| Pos2::new(p.x, p.y) + origin)
                    .collect();
                painter.add(Shape::convex_polygon(head, theme::CONNECTOR, Stroke::NONE));
            }

            // Bars
            let dragging = timeline.drag().is_dragging();
            for (i, task) in projected.iter().enumerate() {
                let y = rows_top + i as f32 * row_height;
                let left = timeline.display_left(task, grid);
                let x = grid_rect.left() + (left / 100.0) as f32 * grid_rect.width();
                let width = ((task.width / 100.0) as f32 * grid_rect.width()).max(4.0);
                let bar_rect = Rect::from_min_size(
                    Pos2::new(x, y + theme::BAR_INSET),
                    Vec2::new(width, row_height - theme::BAR_INSET * 2.0),
                );

                let is_dragged = timeline
                    .drag()
                    .session()
                    .is_some_and(|s| s.task_id == task.id);
                let is_committing = timeline.drag().committing_task() == Some(&task.id);
                draw_task_bar(&painter, task, bar_rect, is_dragged, is_committing);

                let response = ui.interact(
                    bar_rect,
                    ui.make_persistent_id(("task-bar", &task.id)),
                    Sense::click_and_drag(),
                );

                if response.drag_started() {
                    let press = ui
                        .input(|i| i.pointer.press_origin())
                        .or(response.interact_pointer_pos());
                    if let Some(press) = press {
                        timeline.pointer_down(&task.id, pressed_button(&response), press.x);
                    }
                }

                if response.hovered() && !dragging {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
                    egui::show_tooltip_at_pointer(
                        ui.ctx(),
                        ui.layer_id(),
                        Id::new(("task-tip", &task.id)),
                        |ui| {
                            ui.strong(&task.title);
                            ui.label(format!("{} · {} priority", task.status.label(), task.priority.label()));
                            ui.label(format!(
                                "{} → {}",
                                task.effective_start.format("%d/%m/%Y %H:%M"),
                                task.effective_end.format("%d/%m/%Y %H:%M"),
                            ));
                            if task.is_clipped() {
                                ui.label(
                                    egui::RichText::new("Continues outside this window")
                                        .small()
                                        .color(theme::TEXT_DIM),
                                );
                            }
                        },
                    );
                }
            }

            // The gesture is tracked globally so it survives leaving the bar.
            if timeline.drag().is_dragging() {
                let (latest, released) = ui.input(|i| (i.pointer.latest_pos(), i.pointer.primary_released()));
                let x = latest
                    .map(|p| p.x)
                    .or_else(|| timeline.drag().session().map(|s| s.origin_x + s.delta_px));
                if let Some(x) = x {
                    if released {
                        output.commit = timeline.pointer_up(x, grid);
                    } else {
                        timeline.pointer_move(x, grid);
                        ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
                        ui.ctx().request_repaint();
                    }
                }
            }

            output
        })
        .inner
}

fn pressed_button(response: &egui::Response) -> PointerButton {
    if response.dragged_by(egui::PointerButton::Primary) {
        PointerButton::Primary
    } else if response.dragged_by(egui::PointerButton::Middle) {
        PointerButton::Middle
    } else {
        PointerButton::Secondary
    }
}

fn x_at(grid_rect: Rect, percent: f64) -> f32 {
    grid_rect.left() + (percent / 100.0) as f32 * grid_rect.width()
}

fn draw_timeline_header(
    painter: &egui::Painter,
    grid_rect: Rect,
    window: &DateWindow,
    scale: TimelineScale,
) {
    painter.rect_filled(
        Rect::from_min_size(grid_rect.min, Vec2::new(grid_rect.width(), HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(grid_rect.left(), grid_rect.top() + HEADER_HEIGHT),
            Pos2::new(grid_rect.right(), grid_rect.top() + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let grid_line = |x: f32| {
        painter.line_segment(
            [Pos2::new(x, grid_rect.top() + HEADER_HEIGHT), Pos2::new(x, grid_rect.bottom())],
            Stroke::new(0.5, theme::GRID_LINE),
        );
    };

    if scale == TimelineScale::Day {
        let day = window.start;
        for hour in (0..24).step_by(3) {
            let x = x_at(grid_rect, f64::from(hour) / 24.0 * 100.0);
            grid_line(x);
            painter.text(
                Pos2::new(x + 3.0, grid_rect.top() + 28.0),
                egui::Align2::LEFT_CENTER,
                format!("{hour:02}:00"),
                theme::font_sub(),
                theme::TEXT_SECONDARY,
            );
        }
        painter.text(
            Pos2::new(grid_rect.left() + 3.0, grid_rect.top() + 12.0),
            egui::Align2::LEFT_CENTER,
            day.format("%a %d %b %Y").to_string(),
            theme::font_header(),
            theme::TEXT_PRIMARY,
        );
        return;
    }

    for date in &window.days {
        let start = date.and_time(NaiveTime::MIN);
        let left = window.position_of(start).unwrap_or(0.0);
        let right = window
            .position_of(start + Duration::days(1))
            .unwrap_or(100.0);
        let (x0, x1) = (x_at(grid_rect, left), x_at(grid_rect, right));

        if date.weekday().num_days_from_monday() >= 5 {
            painter.rect_filled(
                Rect::from_min_max(
                    Pos2::new(x0, grid_rect.top() + HEADER_HEIGHT),
                    Pos2::new(x1, grid_rect.bottom()),
                ),
                0.0,
                theme::BG_WEEKEND,
            );
        }
        grid_line(x0);

        let label = match scale {
            TimelineScale::Week => date.format("%a %d").to_string(),
            _ => date.format("%d").to_string(),
        };
        if x1 - x0 >= 16.0 {
            painter.text(
                Pos2::new(x0 + 3.0, grid_rect.top() + 28.0),
                egui::Align2::LEFT_CENTER,
                label,
                theme::font_sub(),
                theme::TEXT_SECONDARY,
            );
        }
        if date.day() == 1 || *date == window.start.date() {
            painter.text(
                Pos2::new(x0 + 3.0, grid_rect.top() + 12.0),
                egui::Align2::LEFT_CENTER,
                date.format("%b %Y").to_string(),
                theme::font_header(),
                theme::TEXT_PRIMARY,
            );
        }
    }
}

fn draw_row_label(painter: &egui::Painter, left: f32, y: f32, row_height: f32, task: &ProjectedTask) {
    let center_y = y + row_height / 2.0;
    painter.circle_filled(Pos2::new(left + 10.0, center_y), 4.0, theme::status_color(task.status));
    let clip = Rect::from_min_size(Pos2::new(left, y), Vec2::new(LABEL_WIDTH - 6.0, row_height));
    painter.with_clip_rect(clip).text(
        Pos2::new(left + 20.0, center_y),
        egui::Align2::LEFT_CENTER,
        &task.title,
        theme::font_bar(),
        theme::TEXT_PRIMARY,
    );
}

fn draw_today_line(painter: &egui::Painter, grid_rect: Rect, percent: f64, top: f32, height: f32) {
    let x = x_at(grid_rect, percent);
    painter.line_segment(
        [Pos2::new(x, top), Pos2::new(x, grid_rect.top() + height)],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    let badge_w = 42.0;
    let badge_rect = Rect::from_min_size(Pos2::new(x - badge_w / 2.0, top - 1.0), Vec2::new(badge_w, 14.0));
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Now",
        theme::font_small(),
        Color32::WHITE,
    );
}

fn draw_task_bar(
    painter: &egui::Painter,
    task: &ProjectedTask,
    bar_rect: Rect,
    is_dragged: bool,
    is_committing: bool,
) {
    let rounding = Rounding::same(theme::BAR_ROUNDING);
    let mut fill = theme::status_color(task.status);
    if is_committing {
        fill = fill.gamma_multiply(0.6);
    }

    painter.rect_filled(bar_rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
    painter.rect_filled(bar_rect, rounding, fill);

    // Priority stripe on the leading edge
    let stripe = Rect::from_min_size(
        bar_rect.min,
        Vec2::new(theme::PRIORITY_STRIPE.min(bar_rect.width()), bar_rect.height()),
    );
    painter.rect_filled(
        stripe,
        Rounding {
            nw: theme::BAR_ROUNDING,
            sw: theme::BAR_ROUNDING,
            ne: 0.0,
            se: 0.0,
        },
        theme::priority_color(task.priority),
    );

    if is_dragged {
        painter.rect_stroke(
            bar_rect.expand(1.5),
            Rounding::same(theme::BAR_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    if bar_rect.width() > 30.0 {
        let galley = painter.layout_no_wrap(task.title.clone(), theme::font_bar(), theme::TEXT_ON_BAR);
        let text_y = bar_rect.top() + (bar_rect.height() - galley.size().y) / 2.0;
        painter.with_clip_rect(bar_rect).galley(
            Pos2::new(bar_rect.left() + theme::PRIORITY_STRIPE + 5.0, text_y),
            galley,
            Color32::TRANSPARENT,
        );
    }
}
