use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{Task, TaskId};
use crate::store::{iso8601, TaskStore};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Serialize)]
struct ScheduleBody {
    start_date: String,
    due_date: String,
}

/// Task store backed by the dashboard's REST API.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: Client,
    base_url: String,
}

impl HttpTaskStore {
    /// Commits have no client-side timeout; a slow write just resolves later.
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let client = Client::builder().build().map_err(|source| StoreError::Http {
            url: base_url.clone(),
            source,
        })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    fn task_url(&self, id: &TaskId) -> String {
        format!("{}/tasks/{}", self.base_url, id)
    }
}

async fn read_success(url: &str, response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await.map_err(|source| StoreError::Http {
        url: url.to_owned(),
        source,
    })?;
    if !status.is_success() {
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

impl TaskStore for HttpTaskStore {
    async fn list_tasks_for_view(&self) -> Result<Vec<Task>, StoreError> {
        let url = self.tasks_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                url: url.clone(),
                source,
            })?;
        let body = read_success(&url, response).await?;
        let tasks: Vec<Task> = serde_json::from_str(&body)?;
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    async fn update_task_schedule(
        &self,
        id: &TaskId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let url = self.task_url(id);
        let body = ScheduleBody {
            start_date: iso8601(start),
            due_date: iso8601(end),
        };
        let response = self
            .client
            .patch(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                url: url.clone(),
                source,
            })?;
        read_success(&url, response).await?;
        Ok(())
    }
}
