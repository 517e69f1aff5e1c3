use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{Task, TaskId, TaskPriority, TaskStatus};
use crate::store::TaskStore;

#[derive(Debug, Default)]
struct Inner {
    tasks: RwLock<Vec<Task>>,
    reject_updates: AtomicBool,
}

/// In-process store. Cheap to clone; clones share the same tasks.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    inner: Arc<Inner>,
}

impl MemoryTaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: RwLock::new(tasks),
                reject_updates: AtomicBool::new(false),
            }),
        }
    }

    /// Load a JSON array of tasks, in the same shape the REST API returns.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::IoPath {
            path: path.to_path_buf(),
            source,
        })?;
        let tasks: Vec<Task> = serde_json::from_str(&contents)?;
        debug!(count = tasks.len(), path = %path.display(), "loaded seed tasks");
        Ok(Self::new(tasks))
    }

    /// Make every subsequent update fail, as a flaky backend would.
    pub fn reject_updates(&self, reject: bool) {
        self.inner.reject_updates.store(reject, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.inner.tasks.read().await.clone()
    }

    /// A small project laid out around `today`.
    pub fn sample(today: NaiveDate) -> Self {
        let day = |offset: i64| (today + Duration::days(offset)).and_time(NaiveTime::MIN);
        let created = day(-14);
        let task = |id: &str, title: &str, status: TaskStatus, priority: TaskPriority| Task {
            id: TaskId::from(id),
            title: title.to_owned(),
            status,
            priority,
            start_date: None,
            due_date: None,
            created_at: Some(created),
            dependencies: Vec::new(),
        };

        let kickoff = Task {
            start_date: Some(day(-5)),
            due_date: Some(day(-2)),
            ..task("kickoff", "Project Kickoff", TaskStatus::Done, TaskPriority::Medium)
        };
        let requirements = Task {
            start_date: Some(day(-2)),
            due_date: Some(day(3)),
            ..task("requirements", "Requirements Gathering", TaskStatus::InProgress, TaskPriority::High)
        }
        .depends_on("kickoff");
        let design = Task {
            start_date: Some(day(2)),
            due_date: Some(day(9)),
            ..task("design", "UI Design", TaskStatus::Review, TaskPriority::Medium)
        }
        .depends_on("requirements");
        let backend = Task {
            start_date: Some(day(3)),
            due_date: Some(day(20)),
            ..task("backend", "Backend Development", TaskStatus::Todo, TaskPriority::Critical)
        }
        .depends_on("requirements");
        // No start date: placed from its creation time.
        let infra = Task {
            due_date: Some(day(1)),
            ..task("infra", "Provision Environments", TaskStatus::InProgress, TaskPriority::Low)
        };
        // No dates at all: gets the default span from its creation time.
        let triage = task("triage", "Bug Triage", TaskStatus::Todo, TaskPriority::Low);
        let qa = Task {
            start_date: Some(day(15)),
            due_date: Some(day(22)),
            ..task("qa", "Testing & QA", TaskStatus::Todo, TaskPriority::High)
        }
        .depends_on("design")
        .depends_on("backend");
        let launch = Task {
            start_date: Some(day(24)),
            due_date: Some(day(24)),
            ..task("launch", "Launch", TaskStatus::Todo, TaskPriority::Critical)
        }
        .depends_on("qa");

        Self::new(vec![
            kickoff,
            requirements,
            design,
            backend,
            infra,
            triage,
            qa,
            launch,
        ])
    }
}

impl TaskStore for MemoryTaskStore {
    async fn list_tasks_for_view(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.snapshot().await)
    }

    async fn update_task_schedule(
        &self,
        id: &TaskId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(), StoreError> {
        if self.inner.reject_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected(format!("task {id} is read-only")));
        }
        let mut tasks = self.inner.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        task.start_date = Some(start);
        task.due_date = Some(end);
        Ok(())
    }
}
