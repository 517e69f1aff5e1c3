use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::model::{Task, TaskId, TaskPriority, TaskStatus};
use crate::timeline::window::DateWindow;

/// Span given to tasks that have no due date.
pub const DEFAULT_DURATION_DAYS: i64 = 3;

/// Narrowest bar, in percent of the window, so zero-length tasks stay clickable.
pub const MIN_VISIBLE_WIDTH: f64 = 1.0;

/// A task placed on the current window, in resolution-independent percent space.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedTask {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub dependencies: Vec<TaskId>,
    /// Left edge, 0-100.
    pub left: f64,
    /// Width, with `left + width <= 100`.
    pub width: f64,
    /// Interval after the date fallbacks, before clamping.
    pub effective_start: NaiveDateTime,
    pub effective_end: NaiveDateTime,
    /// Interval actually drawn, clamped to the window.
    pub visible_start: NaiveDateTime,
    pub visible_end: NaiveDateTime,
}

impl ProjectedTask {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// True when the task extends past either side of the window.
    pub fn is_clipped(&self) -> bool {
        self.visible_start != self.effective_start || self.visible_end != self.effective_end
    }
}

/// Start and end after applying the fallback chain:
/// `start_date -> created_at -> now` and `due_date -> start + 3 days`.
pub fn effective_interval(task: &Task, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let start = task.start_date.or(task.created_at).unwrap_or(now);
    let end = task
        .due_date
        .unwrap_or_else(|| start + Duration::days(DEFAULT_DURATION_DAYS));
    (start, end)
}

/// Place `task` on `window`, or `None` when the two do not overlap.
pub fn project(task: &Task, window: &DateWindow, now: NaiveDateTime) -> Option<ProjectedTask> {
    let (start, end) = effective_interval(task, now);
    if end < window.start || start > window.end {
        return None;
    }

    let visible_start = start.max(window.start);
    let visible_end = end.min(window.end);

    let span = window.duration_ms() as f64;
    let offset = (visible_start - window.start).num_milliseconds() as f64;
    let length = (visible_end - visible_start).num_milliseconds() as f64;

    let width = (length / span * 100.0).max(MIN_VISIBLE_WIDTH).min(100.0);
    let left = (offset / span * 100.0).clamp(0.0, 100.0 - width);

    Some(ProjectedTask {
        id: task.id.clone(),
        title: task.title.clone(),
        status: task.status,
        priority: task.priority,
        dependencies: task.dependencies.clone(),
        left,
        width,
        effective_start: start,
        effective_end: end,
        visible_start,
        visible_end,
    })
}

/// Project every task, keeping the input order and dropping the ones outside
/// the window.
pub fn project_all(tasks: &[Task], window: &DateWindow, now: NaiveDateTime) -> Vec<ProjectedTask> {
    let projected: Vec<_> = tasks
        .iter()
        .filter_map(|task| project(task, window, now))
        .collect();
    debug!(
        total = tasks.len(),
        visible = projected.len(),
        "projected tasks onto window"
    );
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::window::{resolve, TimelineScale};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    // Monday 2024-06-10 .. Sunday 2024-06-16
    fn week() -> DateWindow {
        resolve(at(2024, 6, 12, 12), TimelineScale::Week)
    }

    fn now() -> NaiveDateTime {
        at(2024, 6, 12, 9)
    }

    fn task(start: Option<NaiveDateTime>, due: Option<NaiveDateTime>) -> Task {
        Task {
            id: TaskId::Number(1),
            title: "t".into(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            start_date: start,
            due_date: due,
            created_at: Some(at(2024, 6, 1, 0)),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn tasks_outside_the_window_are_excluded() {
        let before = task(Some(at(2024, 6, 1, 0)), Some(at(2024, 6, 9, 23)));
        let after = task(Some(at(2024, 6, 17, 0)), Some(at(2024, 6, 20, 0)));
        assert!(project(&before, &week(), now()).is_none());
        assert!(project(&after, &week(), now()).is_none());
    }

    #[test]
    fn overlap_on_first_day_starts_at_zero() {
        let t = task(Some(at(2024, 6, 5, 0)), Some(at(2024, 6, 10, 12)));
        let p = project(&t, &week(), now()).unwrap();
        assert_eq!(p.left, 0.0);
        assert!(p.is_clipped());
        assert_eq!(p.visible_start, week().start);
        assert_eq!(p.effective_start, at(2024, 6, 5, 0));
    }

    #[test]
    fn covering_task_fills_the_window() {
        let t = task(Some(at(2024, 5, 1, 0)), Some(at(2024, 7, 1, 0)));
        let p = project(&t, &week(), now()).unwrap();
        assert_eq!(p.left, 0.0);
        assert!((p.right() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_length_task_keeps_minimum_width() {
        let t = task(Some(at(2024, 6, 12, 0)), Some(at(2024, 6, 12, 0)));
        let p = project(&t, &week(), now()).unwrap();
        assert!(p.width >= MIN_VISIBLE_WIDTH);
    }

    #[test]
    fn minimum_width_never_pushes_past_the_right_edge() {
        let w = week();
        let t = task(Some(w.end), Some(w.end));
        let p = project(&t, &w, now()).unwrap();
        assert!(p.right() <= 100.0 + 1e-9);
        assert!(p.left >= 0.0);
    }

    #[test]
    fn one_day_in_a_week_is_a_seventh() {
        let t = task(Some(at(2024, 6, 11, 0)), Some(at(2024, 6, 12, 0)));
        let p = project(&t, &week(), now()).unwrap();
        assert!((p.left - 100.0 / 7.0).abs() < 1e-4);
        assert!((p.width - 100.0 / 7.0).abs() < 1e-4);
    }

    #[test]
    fn missing_start_falls_back_to_created_at() {
        let mut t = task(None, None);
        t.created_at = Some(at(2024, 6, 11, 0));
        let (start, end) = effective_interval(&t, now());
        assert_eq!(start, at(2024, 6, 11, 0));
        assert_eq!(end, at(2024, 6, 14, 0));
    }

    #[test]
    fn missing_created_at_falls_back_to_now() {
        let mut t = task(None, None);
        t.created_at = None;
        let (start, end) = effective_interval(&t, now());
        assert_eq!(start, now());
        assert_eq!(end, now() + Duration::days(3));
    }

    #[test]
    fn projection_is_deterministic() {
        let t = task(Some(at(2024, 6, 11, 6)), Some(at(2024, 6, 13, 18)));
        assert_eq!(project(&t, &week(), now()), project(&t, &week(), now()));
    }

    #[test]
    fn project_all_keeps_order_and_drops_invisible() {
        let mut a = task(Some(at(2024, 6, 11, 0)), Some(at(2024, 6, 12, 0)));
        a.id = TaskId::from("a");
        let mut gone = task(Some(at(2024, 1, 1, 0)), Some(at(2024, 1, 2, 0)));
        gone.id = TaskId::from("gone");
        let mut b = task(Some(at(2024, 6, 10, 0)), Some(at(2024, 6, 11, 0)));
        b.id = TaskId::from("b");

        let ids: Vec<_> = project_all(&[a, gone, b], &week(), now())
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![TaskId::from("a"), TaskId::from("b")]);
    }
}
