use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Identifier of a task in the external store. The API hands out either
/// integers or strings; both are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Number(i64),
    Text(String),
}

impl TaskId {
    /// Mint a fresh id for tasks created locally (sample data, memory store).
    pub fn generate() -> Self {
        TaskId::Text(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Number(n) => write!(f, "{n}"),
            TaskId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        TaskId::Number(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        TaskId::Text(value.to_owned())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        TaskId::Text(value)
    }
}

/// Workflow status. Only affects how a bar is coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    /// Parse an API status name, case-insensitively. Unknown names map to `Todo`.
    pub fn parse(raw: &str) -> Self {
        match normalize_enum_name(raw).as_str() {
            "IN_PROGRESS" | "INPROGRESS" | "DOING" => TaskStatus::InProgress,
            "REVIEW" | "IN_REVIEW" => TaskStatus::Review,
            "DONE" | "COMPLETED" | "CLOSED" => TaskStatus::Done,
            _ => TaskStatus::Todo,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Todo => "To do",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Review => "Review",
            TaskStatus::Done => "Done",
        }
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TaskStatus::parse(&raw))
    }
}

/// Priority. Only affects how a bar is coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    /// Parse an API priority name, case-insensitively. Unknown names map to `Medium`.
    pub fn parse(raw: &str) -> Self {
        match normalize_enum_name(raw).as_str() {
            "LOW" => TaskPriority::Low,
            "HIGH" => TaskPriority::High,
            "CRITICAL" | "URGENT" => TaskPriority::Critical,
            _ => TaskPriority::Medium,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
            TaskPriority::Critical => "Critical",
        }
    }
}

impl<'de> Deserialize<'de> for TaskPriority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TaskPriority::parse(&raw))
    }
}

fn normalize_enum_name(raw: &str) -> String {
    raw.trim().replace(['-', ' '], "_").to_ascii_uppercase()
}

/// A task as read from the external store. The engine only ever holds a
/// read-only snapshot of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    /// Absent means "unscheduled start".
    #[serde(default, with = "lenient_datetime")]
    pub start_date: Option<NaiveDateTime>,
    /// Absent means "unscheduled end".
    #[serde(default, with = "lenient_datetime")]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default, with = "lenient_datetime")]
    pub created_at: Option<NaiveDateTime>,
    /// Predecessors, in the order the store lists them.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

impl Task {
    /// Create an unscheduled task stamped with the current local time.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            title: title.into(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            start_date: None,
            due_date: None,
            created_at: Some(Local::now().naive_local()),
            dependencies: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn scheduled(mut self, start: NaiveDateTime, due: NaiveDateTime) -> Self {
        self.start_date = Some(start);
        self.due_date = Some(due);
        self
    }

    pub fn depends_on(mut self, predecessor: impl Into<TaskId>) -> Self {
        self.dependencies.push(predecessor.into());
        self
    }
}

/// Timestamps are accepted in whatever shape the API produces. Anything that
/// does not parse is treated as absent rather than failing the whole payload.
pub mod lenient_datetime {
    use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Other(IgnoredAny),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) => parse(&text),
            Some(Raw::Other(_)) | None => None,
        })
    }

    /// Parse an RFC 3339, naive ISO-8601, or bare date string into local
    /// wall-clock time.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Local).naive_local());
        }
        if let Some(ts) = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        {
            return Some(ts);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}
