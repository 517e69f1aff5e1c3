//! Background store access.
//!
//! The UI thread never awaits the store. It sends [`StoreCommand`]s and polls
//! [`StoreMessage`]s once per frame; each command runs as its own tokio task so
//! a slow write never holds up a refresh.
//!
//! Refreshes can therefore finish out of order. Both ends number them in the
//! order they were sent, and the client drops a snapshot that is older than
//! one it already handed out, or that was requested before the last
//! successful write while a newer refresh is still on its way.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::Task;
use crate::store::TaskStore;
use crate::timeline::ScheduleChange;

/// Commands sent from the UI to the store worker.
#[derive(Debug, Clone)]
pub enum StoreCommand {
    /// Re-request the task snapshot.
    Refresh,
    /// Write a dragged task's new schedule.
    Commit(ScheduleChange),
    /// Stop the worker.
    Shutdown,
}

/// Messages sent from the store worker back to the UI.
#[derive(Debug, Clone)]
pub enum StoreMessage {
    TasksLoaded(Vec<Task>),
    RefreshFailed(String),
    Committed(ScheduleChange),
    CommitFailed { change: ScheduleChange, error: String },
}

type Notify = Arc<dyn Fn() + Send + Sync>;

/// A worker message plus the number of the refresh that produced it.
#[derive(Debug)]
struct Stamped {
    refresh: Option<u64>,
    message: StoreMessage,
}

/// UI-side handle to a running [`StoreWorker`].
#[derive(Debug)]
pub struct StoreClient {
    commands: mpsc::UnboundedSender<StoreCommand>,
    messages: mpsc::UnboundedReceiver<Stamped>,
    /// Refreshes sent so far.
    requested: u64,
    /// Newest refresh whose result was handed out.
    delivered: u64,
    /// Refreshes sent before the last successful write.
    committed_after: u64,
}

impl StoreClient {
    /// Returns `false` once the worker is gone.
    pub fn send(&mut self, command: StoreCommand) -> bool {
        let is_refresh = matches!(command, StoreCommand::Refresh);
        let sent = self.commands.send(command).is_ok();
        if sent && is_refresh {
            self.requested += 1;
        }
        sent
    }

    pub fn refresh(&mut self) -> bool {
        self.send(StoreCommand::Refresh)
    }

    pub fn commit(&mut self, change: ScheduleChange) -> bool {
        self.send(StoreCommand::Commit(change))
    }

    /// Non-blocking poll, for the frame loop.
    pub fn try_next(&mut self) -> Option<StoreMessage> {
        loop {
            let stamped = self.messages.try_recv().ok()?;
            if let Some(message) = self.accept(stamped) {
                return Some(message);
            }
        }
    }

    pub async fn next(&mut self) -> Option<StoreMessage> {
        loop {
            let stamped = self.messages.recv().await?;
            if let Some(message) = self.accept(stamped) {
                return Some(message);
            }
        }
    }

    fn accept(&mut self, stamped: Stamped) -> Option<StoreMessage> {
        let Stamped { refresh, message } = stamped;
        match refresh {
            Some(n) => {
                let superseded = n < self.delivered;
                let predates_write = n <= self.committed_after && self.requested > self.committed_after;
                if superseded || predates_write {
                    debug!(refresh = n, "dropping stale task snapshot");
                    return None;
                }
                self.delivered = n;
            }
            None => {
                if matches!(message, StoreMessage::Committed(_)) {
                    self.committed_after = self.requested;
                }
            }
        }
        Some(message)
    }
}

pub struct StoreWorker;

impl StoreWorker {
    /// Start the worker on `handle`. `notify` is called after every message so
    /// an idle UI can wake up and repaint.
    pub fn spawn<S: TaskStore>(
        handle: &Handle,
        store: S,
        notify: Option<Notify>,
    ) -> (StoreClient, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let join = handle.spawn(run(Arc::new(store), cmd_rx, msg_tx, notify));
        (
            StoreClient {
                commands: cmd_tx,
                messages: msg_rx,
                requested: 0,
                delivered: 0,
                committed_after: 0,
            },
            join,
        )
    }
}

async fn run<S: TaskStore>(
    store: Arc<S>,
    mut commands: mpsc::UnboundedReceiver<StoreCommand>,
    messages: mpsc::UnboundedSender<Stamped>,
    notify: Option<Notify>,
) {
    // Counted in receive order, which matches the client's send order.
    let mut refreshes: u64 = 0;
    while let Some(command) = commands.recv().await {
        let store = Arc::clone(&store);
        let messages = messages.clone();
        let notify = notify.clone();
        match command {
            StoreCommand::Refresh => {
                refreshes += 1;
                let number = refreshes;
                tokio::spawn(async move {
                    let message = match store.list_tasks_for_view().await {
                        Ok(tasks) => {
                            debug!(count = tasks.len(), "task snapshot refreshed");
                            StoreMessage::TasksLoaded(tasks)
                        }
                        Err(err) => {
                            warn!(error = %err, "task refresh failed");
                            StoreMessage::RefreshFailed(err.to_string())
                        }
                    };
                    deliver(&messages, Some(number), message, notify.as_ref());
                });
            }
            StoreCommand::Commit(change) => {
                tokio::spawn(async move {
                    let result = store
                        .update_task_schedule(&change.task_id, change.start, change.end)
                        .await;
                    let message = match result {
                        Ok(()) => {
                            info!(task = %change.task_id, "schedule committed");
                            StoreMessage::Committed(change)
                        }
                        Err(err) => StoreMessage::CommitFailed {
                            change,
                            error: err.to_string(),
                        },
                    };
                    deliver(&messages, None, message, notify.as_ref());
                });
            }
            StoreCommand::Shutdown => break,
        }
    }
    debug!("store worker stopped");
}

fn deliver(
    messages: &mpsc::UnboundedSender<Stamped>,
    refresh: Option<u64>,
    message: StoreMessage,
    notify: Option<&Notify>,
) {
    if messages.send(Stamped { refresh, message }).is_ok() {
        if let Some(notify) = notify {
            notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskId;
    use chrono::NaiveDate;

    fn client() -> (StoreClient, mpsc::UnboundedSender<Stamped>, mpsc::UnboundedReceiver<StoreCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let client = StoreClient {
            commands: cmd_tx,
            messages: msg_rx,
            requested: 0,
            delivered: 0,
            committed_after: 0,
        };
        (client, msg_tx, cmd_rx)
    }

    fn snapshot(title: &str) -> StoreMessage {
        StoreMessage::TasksLoaded(vec![Task::new(title).with_id(1)])
    }

    fn title(message: StoreMessage) -> String {
        match message {
            StoreMessage::TasksLoaded(tasks) => tasks[0].title.clone(),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn change() -> ScheduleChange {
        let at = NaiveDate::from_ymd_opt(2024, 6, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ScheduleChange {
            task_id: TaskId::Number(1),
            start: at,
            end: at,
        }
    }

    #[test]
    fn older_snapshot_is_dropped_after_a_newer_one() {
        let (mut client, tx, _cmds) = client();
        client.refresh();
        client.refresh();
        tx.send(Stamped { refresh: Some(2), message: snapshot("second") }).unwrap();
        tx.send(Stamped { refresh: Some(1), message: snapshot("first") }).unwrap();

        assert_eq!(title(client.try_next().unwrap()), "second");
        assert!(client.try_next().is_none());
    }

    #[test]
    fn snapshot_requested_before_a_write_waits_for_the_next_refresh() {
        let (mut client, tx, _cmds) = client();
        client.refresh();
        client.commit(change());
        tx.send(Stamped { refresh: None, message: StoreMessage::Committed(change()) }).unwrap();
        assert!(matches!(client.try_next(), Some(StoreMessage::Committed(_))));

        client.refresh();
        tx.send(Stamped { refresh: Some(1), message: snapshot("before write") }).unwrap();
        tx.send(Stamped { refresh: Some(2), message: snapshot("after write") }).unwrap();
        assert_eq!(title(client.try_next().unwrap()), "after write");
        assert!(client.try_next().is_none());
    }

    #[test]
    fn snapshot_is_kept_when_no_newer_refresh_was_sent() {
        let (mut client, tx, _cmds) = client();
        client.refresh();
        tx.send(Stamped { refresh: None, message: StoreMessage::Committed(change()) }).unwrap();
        client.try_next();

        tx.send(Stamped { refresh: Some(1), message: snapshot("only") }).unwrap();
        assert_eq!(title(client.try_next().unwrap()), "only");
    }
}
