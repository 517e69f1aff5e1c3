use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::model::TaskId;
use crate::timeline::projector::ProjectedTask;
use crate::timeline::router::GridWidth;
use crate::timeline::window::DateWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Snapshot taken when a bar is grabbed. Lives only for the gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub task_id: TaskId,
    pub original_left: f64,
    pub original_width: f64,
    pub original_start: NaiveDateTime,
    pub original_end: NaiveDateTime,
    pub origin_x: f32,
    pub delta_px: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
    /// Pointer released; the write for `task_id` is still in flight.
    Committing { task_id: TaskId },
}

/// New schedule produced by a drag, handed to the store as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleChange {
    pub task_id: TaskId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Turns pointer events on task bars into schedule changes.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn committing_task(&self) -> Option<&TaskId> {
        match &self.state {
            DragState::Committing { task_id } => Some(task_id),
            _ => None,
        }
    }

    /// Grab `task` at pointer position `x`. Only the primary button starts a
    /// session, and only when none is active. A commit still in flight does not
    /// block a new gesture.
    pub fn pointer_down(&mut self, task: &ProjectedTask, button: PointerButton, x: f32) -> bool {
        if button != PointerButton::Primary || self.is_dragging() {
            return false;
        }
        debug!(task = %task.id, x, "drag started");
        self.state = DragState::Dragging(DragSession {
            task_id: task.id.clone(),
            original_left: task.left,
            original_width: task.width,
            original_start: task.effective_start,
            original_end: task.effective_end,
            origin_x: x,
            delta_px: 0.0,
        });
        true
    }

    /// Track the pointer. Returns the live offset in percent of the grid, or
    /// `None` when no session is active.
    pub fn pointer_move(&mut self, x: f32, grid: GridWidth) -> Option<f64> {
        let DragState::Dragging(session) = &mut self.state else {
            return None;
        };
        session.delta_px = x - session.origin_x;
        Some(grid.to_percent(session.delta_px).unwrap_or(0.0))
    }

    /// Live offset, in percent, to add to the `left` of task `id`.
    pub fn offset_for(&self, id: &TaskId, grid: GridWidth) -> f64 {
        match &self.state {
            DragState::Dragging(session) if session.task_id == *id => {
                grid.to_percent(session.delta_px).unwrap_or(0.0)
            }
            _ => 0.0,
        }
    }

    /// Release the pointer. The session ends immediately and the translated
    /// schedule is returned for committing; the duration is preserved exactly.
    pub fn pointer_up(
        &mut self,
        x: f32,
        grid: GridWidth,
        window: &DateWindow,
    ) -> Option<ScheduleChange> {
        if !self.is_dragging() {
            return None;
        }
        let DragState::Dragging(session) = std::mem::take(&mut self.state) else {
            return None;
        };
        let delta_px = x - session.origin_x;
        let mut delta = time_delta(delta_px, grid, window);
        let shifted = session
            .original_start
            .checked_add_signed(delta)
            .zip(session.original_end.checked_add_signed(delta));
        let (start, end) = match shifted {
            Some(pair) => pair,
            None => {
                warn!(task = %session.task_id, delta_px, "drag shift out of calendar range, keeping dates");
                delta = Duration::zero();
                (session.original_start, session.original_end)
            }
        };
        let change = ScheduleChange {
            task_id: session.task_id.clone(),
            start,
            end,
        };
        info!(
            task = %change.task_id,
            delta_px,
            delta_ms = delta.num_milliseconds(),
            "drag released, committing"
        );
        self.state = DragState::Committing {
            task_id: session.task_id,
        };
        Some(change)
    }

    /// Abort the gesture without committing (Escape key).
    pub fn cancel(&mut self) -> bool {
        if !self.is_dragging() {
            return false;
        }
        debug!("drag cancelled");
        self.state = DragState::Idle;
        true
    }

    /// The window lost focus mid-gesture; the offset is dropped and nothing is
    /// written.
    pub fn focus_lost(&mut self) -> bool {
        if self.is_dragging() {
            debug!("focus lost during drag");
        }
        self.cancel()
    }

    /// The store answered the write for `task_id`. Either way the controller
    /// settles back to idle; the next projection reflects whatever the store holds.
    pub fn commit_resolved<E: std::fmt::Display>(&mut self, task_id: &TaskId, result: Result<(), E>) {
        if let Err(err) = &result {
            warn!(task = %task_id, error = %err, "schedule commit failed");
        }
        if matches!(&self.state, DragState::Committing { task_id: pending } if pending == task_id) {
            self.state = DragState::Idle;
        }
    }
}

/// Pixel offset to calendar time: `delta_px / grid_width * window_duration`.
pub fn time_delta(delta_px: f32, grid: GridWidth, window: &DateWindow) -> Duration {
    let Some(width) = grid.pixels() else {
        return Duration::zero();
    };
    let ms = f64::from(delta_px) / f64::from(width) * window.duration_ms() as f64;
    if !ms.is_finite() {
        return Duration::zero();
    }
    Duration::try_milliseconds(ms.round() as i64).unwrap_or_else(|| {
        if ms > 0.0 {
            Duration::MAX
        } else {
            Duration::MIN
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskPriority, TaskStatus};
    use crate::timeline::projector::project;
    use crate::timeline::window::{resolve, TimelineScale};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn week() -> DateWindow {
        resolve(at(2024, 6, 12, 12), TimelineScale::Week)
    }

    fn bar() -> ProjectedTask {
        let task = Task {
            id: TaskId::Number(42),
            title: "Deploy".into(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            start_date: Some(at(2024, 6, 11, 8)),
            due_date: Some(at(2024, 6, 13, 17)),
            created_at: Some(at(2024, 6, 1, 0)),
            dependencies: Vec::new(),
        };
        project(&task, &week(), at(2024, 6, 12, 0)).unwrap()
    }

    #[test]
    fn secondary_button_never_starts_a_session() {
        let mut ctl = DragController::new();
        assert!(!ctl.pointer_down(&bar(), PointerButton::Secondary, 10.0));
        assert!(!ctl.pointer_down(&bar(), PointerButton::Middle, 10.0));
        assert_eq!(ctl.state(), &DragState::Idle);
    }

    #[test]
    fn move_offsets_only_the_dragged_task() {
        let grid = GridWidth::Measured(700.0);
        let mut ctl = DragController::new();
        ctl.pointer_down(&bar(), PointerButton::Primary, 100.0);

        let pct = ctl.pointer_move(170.0, grid).unwrap();
        assert!((pct - 10.0).abs() < 1e-9);
        assert!((ctl.offset_for(&TaskId::Number(42), grid) - 10.0).abs() < 1e-9);
        assert_eq!(ctl.offset_for(&TaskId::Number(7), grid), 0.0);
    }

    #[test]
    fn release_translates_and_preserves_duration() {
        let grid = GridWidth::Measured(700.0);
        let window = week();
        let original = bar();
        let mut ctl = DragController::new();
        ctl.pointer_down(&original, PointerButton::Primary, 200.0);
        ctl.pointer_move(250.0, grid);

        // 100 px of 700 px is one seventh of the week, just under a day.
        let change = ctl.pointer_up(300.0, grid, &window).unwrap();
        let expected_ms = (100.0 / 700.0 * window.duration_ms() as f64).round() as i64;
        assert_eq!(
            (change.start - original.effective_start).num_milliseconds(),
            expected_ms
        );
        assert_eq!(
            change.end - change.start,
            original.effective_end - original.effective_start
        );
        assert_eq!(
            ctl.state(),
            &DragState::Committing {
                task_id: TaskId::Number(42)
            }
        );
        assert_eq!(ctl.offset_for(&TaskId::Number(42), grid), 0.0);
    }

    #[test]
    fn zero_delta_release_still_commits_original_schedule() {
        let original = bar();
        let mut ctl = DragController::new();
        ctl.pointer_down(&original, PointerButton::Primary, 50.0);
        let change = ctl
            .pointer_up(50.0, GridWidth::Measured(500.0), &week())
            .unwrap();
        assert_eq!(change.start, original.effective_start);
        assert_eq!(change.end, original.effective_end);
    }

    #[test]
    fn second_release_is_a_no_op() {
        let mut ctl = DragController::new();
        ctl.pointer_down(&bar(), PointerButton::Primary, 0.0);
        assert!(ctl.pointer_up(10.0, GridWidth::Measured(100.0), &week()).is_some());
        assert!(ctl.pointer_up(10.0, GridWidth::Measured(100.0), &week()).is_none());
    }

    #[test]
    fn commit_resolution_returns_to_idle_on_failure_too() {
        let mut ctl = DragController::new();
        ctl.pointer_down(&bar(), PointerButton::Primary, 0.0);
        ctl.pointer_up(35.0, GridWidth::Measured(700.0), &week());
        ctl.commit_resolved(&TaskId::Number(42), Err("503 Service Unavailable"));
        assert_eq!(ctl.state(), &DragState::Idle);
    }

    #[test]
    fn focus_loss_and_cancel_drop_the_session_without_commit() {
        let mut ctl = DragController::new();
        ctl.pointer_down(&bar(), PointerButton::Primary, 0.0);
        ctl.pointer_move(80.0, GridWidth::Measured(700.0));
        assert!(ctl.focus_lost());
        assert_eq!(ctl.state(), &DragState::Idle);
        assert!(ctl.pointer_up(80.0, GridWidth::Measured(700.0), &week()).is_none());

        ctl.pointer_down(&bar(), PointerButton::Primary, 0.0);
        assert!(ctl.cancel());
        assert!(!ctl.cancel());
    }

    #[test]
    fn new_drag_allowed_while_previous_commit_in_flight() {
        let mut ctl = DragController::new();
        ctl.pointer_down(&bar(), PointerButton::Primary, 0.0);
        ctl.pointer_up(10.0, GridWidth::Measured(700.0), &week());
        assert!(ctl.pointer_down(&bar(), PointerButton::Primary, 5.0));

        // The late answer for the first write leaves the new session alone.
        ctl.commit_resolved::<&str>(&TaskId::Number(42), Ok(()));
        assert!(ctl.is_dragging());
    }

    #[test]
    fn zero_measured_width_behaves_like_unmeasured() {
        let grid = GridWidth::Measured(0.0);
        let original = bar();
        let mut ctl = DragController::new();
        ctl.pointer_down(&original, PointerButton::Primary, 100.0);

        assert_eq!(ctl.pointer_move(40.0, grid), Some(0.0));
        assert_eq!(ctl.offset_for(&TaskId::Number(42), grid), 0.0);
        let change = ctl.pointer_up(40.0, grid, &week()).unwrap();
        assert_eq!(change.start, original.effective_start);
        assert_eq!(change.end, original.effective_end);
    }

    #[test]
    fn tiny_width_cannot_push_dates_out_of_range() {
        let original = bar();
        let mut ctl = DragController::new();
        ctl.pointer_down(&original, PointerButton::Primary, 0.0);
        let change = ctl
            .pointer_up(5_000.0, GridWidth::Measured(f32::MIN_POSITIVE), &week())
            .unwrap();
        assert_eq!(change.end - change.start, original.effective_end - original.effective_start);
    }

    #[test]
    fn unmeasured_grid_commits_no_time_shift() {
        assert_eq!(
            time_delta(120.0, GridWidth::Unmeasured, &week()),
            Duration::zero()
        );
    }
}
