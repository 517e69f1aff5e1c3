use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::model::TaskId;
use crate::timeline::projector::ProjectedTask;

pub const DEFAULT_ROW_HEIGHT: f32 = 36.0;

/// Rendered pixel width of the timeline grid. Before the first layout pass
/// the width is not known and nothing that depends on it can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GridWidth {
    #[default]
    Unmeasured,
    Measured(f32),
}

impl GridWidth {
    /// Zero, negative, and non-finite widths count as unmeasured.
    pub fn from_pixels(px: f32) -> Self {
        if px.is_finite() && px > 0.0 {
            GridWidth::Measured(px)
        } else {
            GridWidth::Unmeasured
        }
    }

    /// The usable width, if any. A `Measured` value that is not a positive
    /// finite number is treated like `Unmeasured`.
    pub fn pixels(self) -> Option<f32> {
        match self {
            GridWidth::Measured(px) if px.is_finite() && px > 0.0 => Some(px),
            _ => None,
        }
    }

    pub fn is_measured(self) -> bool {
        self.pixels().is_some()
    }

    /// Convert a 0-100 position into pixels from the grid's left edge.
    pub fn to_pixels(self, percent: f64) -> Option<f32> {
        self.pixels()
            .map(|px| (percent / 100.0 * f64::from(px)) as f32)
    }

    /// Convert a pixel distance into percent of the grid.
    pub fn to_percent(self, pixels: f32) -> Option<f64> {
        self.pixels()
            .map(|px| f64::from(pixels) / f64::from(px) * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An orthogonal elbow from a predecessor's right edge to a successor's left
/// edge: out, across, in.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub from: TaskId,
    pub to: TaskId,
    pub path: [Point; 4],
}

impl Connector {
    /// Where the arrowhead attaches: the successor's left edge, row centre.
    pub fn tip(&self) -> Point {
        self.path[3]
    }

    /// Triangle for the arrowhead, pointing along the last segment.
    pub fn arrowhead(&self, size: f32) -> [Point; 3] {
        let tip = self.tip();
        let dir = if self.path[3].x < self.path[2].x { -1.0 } else { 1.0 };
        let back = tip.x - dir * size;
        [
            tip,
            Point::new(back, tip.y - size / 2.0),
            Point::new(back, tip.y + size / 2.0),
        ]
    }
}

/// Vertical centre of the row at `index`.
pub fn row_center(index: usize, row_height: f32) -> f32 {
    index as f32 * row_height + row_height / 2.0
}

/// Build one connector per (predecessor, successor) pair where both tasks are
/// visible. Each pair is routed independently, so cyclic or self-referencing
/// dependencies terminate and simply draw every edge.
pub fn route(tasks: &[ProjectedTask], grid: GridWidth, row_height: f32) -> Vec<Connector> {
    let Some(width) = grid.pixels() else {
        trace!("grid width unmeasured, skipping connectors");
        return Vec::new();
    };
    let to_px = |percent: f64| (percent / 100.0 * f64::from(width)) as f32;

    let mut rows: HashMap<&TaskId, usize> = HashMap::with_capacity(tasks.len());
    for (index, task) in tasks.iter().enumerate() {
        rows.entry(&task.id).or_insert(index);
    }

    let mut seen: HashSet<(&TaskId, &TaskId)> = HashSet::new();
    let mut connectors = Vec::new();
    for (succ_index, succ) in tasks.iter().enumerate() {
        for pred_id in &succ.dependencies {
            let Some(&pred_index) = rows.get(pred_id) else {
                trace!(from = %pred_id, to = %succ.id, "predecessor not visible");
                continue;
            };
            if !seen.insert((pred_id, &succ.id)) {
                continue;
            }
            let pred = &tasks[pred_index];

            let x1 = to_px(pred.right());
            let y1 = row_center(pred_index, row_height);
            let x2 = to_px(succ.left);
            let y2 = row_center(succ_index, row_height);
            let mid = (x1 + x2) / 2.0;

            connectors.push(Connector {
                from: pred.id.clone(),
                to: succ.id.clone(),
                path: [
                    Point::new(x1, y1),
                    Point::new(mid, y1),
                    Point::new(mid, y2),
                    Point::new(x2, y2),
                ],
            });
        }
    }
    connectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskPriority, TaskStatus};
    use chrono::NaiveDate;

    fn projected(id: &str, left: f64, width: f64, deps: &[&str]) -> ProjectedTask {
        let t = NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ProjectedTask {
            id: TaskId::from(id),
            title: id.to_owned(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            dependencies: deps.iter().map(|d| TaskId::from(*d)).collect(),
            left,
            width,
            effective_start: t,
            effective_end: t,
            visible_start: t,
            visible_end: t,
        }
    }

    #[test]
    fn elbow_runs_from_predecessor_end_to_successor_start() {
        let tasks = vec![
            projected("a", 10.0, 20.0, &[]),
            projected("b", 50.0, 10.0, &["a"]),
        ];
        let connectors = route(&tasks, GridWidth::Measured(1000.0), 40.0);
        assert_eq!(connectors.len(), 1);

        let c = &connectors[0];
        assert_eq!(c.from, TaskId::from("a"));
        assert_eq!(c.to, TaskId::from("b"));
        assert_eq!(
            c.path,
            [
                Point::new(300.0, 20.0),
                Point::new(400.0, 20.0),
                Point::new(400.0, 60.0),
                Point::new(500.0, 60.0),
            ]
        );
        assert_eq!(c.tip(), Point::new(500.0, 60.0));
    }

    #[test]
    fn invisible_predecessor_produces_nothing() {
        let tasks = vec![projected("b", 50.0, 10.0, &["excluded"])];
        assert!(route(&tasks, GridWidth::Measured(800.0), 40.0).is_empty());
    }

    #[test]
    fn unmeasured_width_suppresses_all_connectors() {
        let tasks = vec![
            projected("a", 0.0, 10.0, &[]),
            projected("b", 20.0, 10.0, &["a"]),
        ];
        assert!(route(&tasks, GridWidth::Unmeasured, 40.0).is_empty());
        assert!(route(&tasks, GridWidth::from_pixels(0.0), 40.0).is_empty());
        assert!(route(&tasks, GridWidth::from_pixels(f32::NAN), 40.0).is_empty());
    }

    #[test]
    fn degenerate_measured_width_routes_nothing() {
        let tasks = vec![
            projected("a", 0.0, 10.0, &[]),
            projected("b", 20.0, 10.0, &["a"]),
        ];
        for px in [0.0, -320.0, f32::INFINITY, f32::NAN] {
            let grid = GridWidth::Measured(px);
            assert!(!grid.is_measured(), "{px}");
            assert_eq!(grid.to_percent(50.0), None);
            assert!(route(&tasks, grid, 40.0).is_empty(), "{px}");
        }
    }

    #[test]
    fn cycles_draw_each_edge_once() {
        let tasks = vec![
            projected("a", 0.0, 10.0, &["b"]),
            projected("b", 20.0, 10.0, &["a", "a"]),
            projected("c", 40.0, 10.0, &["c"]),
        ];
        let connectors = route(&tasks, GridWidth::Measured(500.0), 30.0);
        let pairs: Vec<_> = connectors
            .iter()
            .map(|c| (c.from.to_string(), c.to.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("b".to_owned(), "a".to_owned()),
                ("a".to_owned(), "b".to_owned()),
                ("c".to_owned(), "c".to_owned()),
            ]
        );
    }

    #[test]
    fn arrowhead_follows_the_last_segment() {
        let tasks = vec![
            projected("a", 60.0, 20.0, &[]),
            projected("b", 10.0, 10.0, &["a"]),
        ];
        let c = &route(&tasks, GridWidth::Measured(100.0), 20.0)[0];
        let [tip, upper, lower] = c.arrowhead(6.0);
        assert_eq!(tip, Point::new(10.0, 30.0));
        assert_eq!(upper.x, 16.0);
        assert_eq!(lower.y, 33.0);
    }
}
