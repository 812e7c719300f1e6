// Every view loads the owner's snapshot before the pipeline runs, so a store
// failure returns before any worker is spawned.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::time::Duration;

use crate::error::AppError;
use crate::filter::FilterPipeline;
use crate::models::{OwnerId, SearchParams, Task, TaskStatus};
use crate::store::TaskStore;

// shown when a user has not categorised anything yet
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Work",
    "Personal",
    "Shopping",
    "Health",
    "Education",
    "Finance",
    "Travel",
    "Family",
    "Hobbies",
    "Study",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DueWindow {
    On(NaiveDate),
    // half-open: start <= due < end
    Between(DateTime<Utc>, DateTime<Utc>),
    Before(DateTime<Utc>),
}

impl DueWindow {
    fn contains(self, due: DateTime<Utc>) -> bool {
        match self {
            DueWindow::On(date) => due.date_naive() == date,
            DueWindow::Between(start, end) => start <= due && due < end,
            DueWindow::Before(cutoff) => due < cutoff,
        }
    }
}

/// Free-text query plus equality and due-date filters, composed into one
/// predicate. A filter left unset accepts every task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    text: Option<String>,
    category: Option<String>,
    priority: Option<i16>,
    status: Option<TaskStatus>,
    due: Option<DueWindow>,
}

impl TaskQuery {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = (!text.is_empty()).then(|| text.to_lowercase());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn priority(mut self, priority: i16) -> Self {
        self.priority = Some(priority);
        self
    }

    // in_progress and cancelled are never stored, so they match nothing
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due = Some(DueWindow::On(date));
        self
    }

    pub fn due_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.due = Some(DueWindow::Between(start, end));
        self
    }

    pub fn due_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.due = Some(DueWindow::Before(cutoff));
        self
    }

    pub fn due_today(now: DateTime<Utc>) -> Self {
        TaskQuery::default().due_on(now.date_naive())
    }

    // Sunday to Sunday, in UTC calendar days
    pub fn due_this_week(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let start = today - TimeDelta::days(i64::from(today.weekday().num_days_from_sunday()));
        let start = start.and_time(NaiveTime::MIN).and_utc();
        TaskQuery::default().due_between(start, start + TimeDelta::days(7))
    }

    pub fn overdue(now: DateTime<Utc>) -> Self {
        TaskQuery::default()
            .due_before(now)
            .status(TaskStatus::Pending)
    }

    /// Builds a query from search parameters. Empty values are ignored, and so
    /// is a priority that is not a number or a status with no stored flag.
    pub fn from_params(params: &SearchParams) -> Self {
        let mut query = TaskQuery::default();

        if let Some(text) = params.q.as_deref() {
            query = query.text(text);
        }
        if let Some(category) = params.category.as_deref().filter(|c| !c.is_empty()) {
            query = query.category(category);
        }
        if let Some(priority) = params
            .priority
            .as_deref()
            .and_then(|p| p.trim().parse::<i16>().ok())
        {
            query = query.priority(priority);
        }
        if let Some(status) = params
            .status
            .as_deref()
            .and_then(|s| s.parse::<TaskStatus>().ok())
            .filter(|s| s.completion().is_some())
        {
            query = query.status(status);
        }

        query
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(text) = &self.text {
            let in_name = task.task_name.to_lowercase().contains(text.as_str());
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(text.as_str()));
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if task.category.as_ref() != Some(category) {
                return false;
            }
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if let Some(status) = self.status {
            if status.completion() != Some(task.is_completed) {
                return false;
            }
        }
        if let Some(due) = self.due {
            if !task.due_date.is_some_and(|d| due.contains(d)) {
                return false;
            }
        }
        true
    }
}

// unordered; fails with a filter error once `deadline` passes
pub async fn find_tasks(
    store: &dyn TaskStore,
    pipeline: &FilterPipeline,
    owner: OwnerId,
    query: TaskQuery,
    deadline: Duration,
) -> Result<Vec<Task>, AppError> {
    let snapshot = store.list(owner)?;
    let total = snapshot.len();

    let matches = pipeline
        .filter_within(snapshot, move |task: &Task| query.matches(task), deadline)
        .await?;

    tracing::debug!(owner, total, matched = matches.len(), "filtered tasks");
    Ok(matches)
}

pub async fn user_categories(
    store: &dyn TaskStore,
    pipeline: &FilterPipeline,
    owner: OwnerId,
) -> Result<Vec<String>, AppError> {
    let snapshot = store.list(owner)?;

    let mut categories = pipeline
        .distinct(snapshot, |task: &Task| {
            task.category.clone().filter(|c| !c.is_empty())
        })
        .await;

    if categories.is_empty() {
        return Ok(DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect());
    }
    categories.sort();
    Ok(categories)
}
