use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

// Owner of a task set, the tenant boundary for every store call
pub type OwnerId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub user_id: OwnerId,
    pub task_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: i16,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub is_recurring: bool,
    pub recurring_frequency: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Create payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub task_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: i16,
    #[serde(default, deserialize_with = "flexible_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_frequency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    // only pending and completed are backed by a stored flag
    pub fn completion(self) -> Option<bool> {
        match self {
            TaskStatus::Pending => Some(false),
            TaskStatus::Completed => Some(true),
            TaskStatus::InProgress | TaskStatus::Cancelled => None,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!(
                "unsupported status '{other}', expected pending, in_progress, completed or cancelled"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteTaskRequest {
    #[serde(default = "default_true")]
    pub is_completed: bool,
}

fn default_true() -> bool {
    true
}

// Query string of GET /tasks/search, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tasks: Vec<Task>,
    pub count: usize,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

// RFC 3339, a bare ISO 8601 datetime (read as UTC) or a plain date
fn flexible_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Some(naive.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(midnight.and_utc()));
        }
    }
    Err(serde::de::Error::custom(format!("cannot parse date '{raw}'")))
}
