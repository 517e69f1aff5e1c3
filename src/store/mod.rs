//! The external record store the timeline reads from and commits to.
//!
//! The timeline needs exactly two things from it: the current task snapshot
//! and a way to write a new schedule for one task. Everything else the remote
//! API offers lives elsewhere.

pub mod http;
pub mod memory;
pub mod worker;

use std::future::Future;

use chrono::{Local, NaiveDateTime, SecondsFormat, TimeZone};

use crate::error::StoreError;
use crate::model::{Task, TaskId};

pub use http::HttpTaskStore;
pub use memory::MemoryTaskStore;
pub use worker::{StoreClient, StoreCommand, StoreMessage, StoreWorker};

pub trait TaskStore: Send + Sync + 'static {
    /// Snapshot of the tasks to show, already filtered by the caller's view.
    fn list_tasks_for_view(&self) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Write a new start/due pair for one task.
    fn update_task_schedule(
        &self,
        id: &TaskId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// RFC 3339 with millisecond precision and the local UTC offset.
pub fn iso8601(ts: NaiveDateTime) -> String {
    match Local.from_local_datetime(&ts).earliest() {
        Some(local) => local.to_rfc3339_opts(SecondsFormat::Millis, false),
        // Inside a DST gap there is no offset to attach.
        None => ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
    }
}
