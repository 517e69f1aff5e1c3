//! Timeline layout and rescheduling.
//!
//! Data flows one way: the viewport resolves a [`DateWindow`], tasks are
//! projected onto it in percent space, and both the connector router and the
//! drag controller convert to pixels using the grid width the renderer
//! measured. Projections are rebuilt wholesale whenever the window or the task
//! snapshot changes; nothing is patched in place.

pub mod drag;
pub mod projector;
pub mod router;
pub mod window;

use chrono::{Local, NaiveDateTime};

use crate::model::{Task, TaskId};

pub use drag::{DragController, DragSession, DragState, PointerButton, ScheduleChange};
pub use projector::{ProjectedTask, DEFAULT_DURATION_DAYS, MIN_VISIBLE_WIDTH};
pub use router::{Connector, GridWidth, Point, DEFAULT_ROW_HEIGHT};
pub use window::{DateWindow, TimelineScale, TimelineViewport};

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Owns everything the timeline view derives from a task snapshot.
#[derive(Debug)]
pub struct Timeline {
    viewport: TimelineViewport,
    window: DateWindow,
    tasks: Vec<Task>,
    projected: Vec<ProjectedTask>,
    drag: DragController,
    row_height: f32,
    clock: fn() -> NaiveDateTime,
}

impl Timeline {
    pub fn new(viewport: TimelineViewport, row_height: f32) -> Self {
        let window = viewport.window();
        Self {
            viewport,
            window,
            tasks: Vec::new(),
            projected: Vec::new(),
            drag: DragController::new(),
            row_height,
            clock: local_now,
        }
    }

    /// Replace the clock used for "today" and for tasks with no dates at all.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self.rebuild();
        self
    }

    pub fn viewport(&self) -> &TimelineViewport {
        &self.viewport
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn projected(&self) -> &[ProjectedTask] {
        &self.projected
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn projected_task(&self, id: &TaskId) -> Option<&ProjectedTask> {
        self.projected.iter().find(|p| p.id == *id)
    }

    /// Install a fresh snapshot from the store.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.rebuild();
    }

    pub fn next(&mut self) {
        self.viewport.next();
        self.window_changed();
    }

    pub fn prev(&mut self) {
        self.viewport.prev();
        self.window_changed();
    }

    pub fn today(&mut self) {
        let now = self.now();
        self.viewport.today_at(now);
        self.window_changed();
    }

    pub fn set_scale(&mut self, scale: TimelineScale) {
        if self.viewport.scale != scale {
            self.viewport.set_scale(scale);
            self.window_changed();
        }
    }

    fn window_changed(&mut self) {
        // A gesture measured against the old window cannot be converted
        // against the new one.
        self.drag.cancel();
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.window = self.viewport.window();
        self.projected = projector::project_all(&self.tasks, &self.window, self.now());
    }

    /// Elbow connectors for the current projection.
    pub fn connectors(&self, grid: GridWidth) -> Vec<Connector> {
        router::route(&self.projected, grid, self.row_height)
    }

    /// Left edge to draw `task` at, including any live drag offset.
    pub fn display_left(&self, task: &ProjectedTask, grid: GridWidth) -> f64 {
        task.left + self.drag.offset_for(&task.id, grid)
    }

    /// Position of the current moment, if it falls inside the window.
    pub fn now_marker(&self) -> Option<f64> {
        self.window.position_of(self.now())
    }

    pub fn pointer_down(&mut self, id: &TaskId, button: PointerButton, x: f32) -> bool {
        match self.projected.iter().find(|p| p.id == *id) {
            Some(task) => self.drag.pointer_down(task, button, x),
            None => false,
        }
    }

    pub fn pointer_move(&mut self, x: f32, grid: GridWidth) -> Option<f64> {
        self.drag.pointer_move(x, grid)
    }

    pub fn pointer_up(&mut self, x: f32, grid: GridWidth) -> Option<ScheduleChange> {
        self.drag.pointer_up(x, grid, &self.window)
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.cancel()
    }

    pub fn focus_lost(&mut self) -> bool {
        self.drag.focus_lost()
    }

    pub fn commit_resolved<E: std::fmt::Display>(&mut self, task_id: &TaskId, result: Result<(), E>) {
        self.drag.commit_resolved(task_id, result);
    }
}
