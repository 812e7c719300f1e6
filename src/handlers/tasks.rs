use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;

use crate::error::AppError;
use crate::handlers::User;
use crate::models::{
    CategoriesResponse, CompleteTaskRequest, NewTask, OwnerId, SearchParams, SearchResponse, Task,
    TaskListResponse, TaskStatus,
};
use crate::search::{TaskQuery, find_tasks, user_categories};
use crate::state::AppState;

pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Json(payload): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    if payload.task_name.trim().is_empty() {
        return Err(AppError::BadRequest("task_name must not be empty".to_string()));
    }

    let task = state.store.create(owner, payload)?;
    tracing::info!(owner, task_id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
) -> Result<Json<TaskListResponse>, AppError> {
    let tasks = state.store.list(owner)?;
    Ok(Json(TaskListResponse {
        count: tasks.len(),
        tasks,
    }))
}

pub async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Path(id): Path<u64>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(state.store.get(owner, id)?))
}

pub async fn complete_task_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Path(id): Path<u64>,
    Json(payload): Json<CompleteTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = state.store.set_completed(owner, id, payload.is_completed)?;
    tracing::info!(owner, task_id = id, completed = task.is_completed, "task status changed");
    Ok(Json(task))
}

pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    state.store.delete(owner, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /tasks/search?q=&category=&priority=&status=
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = TaskQuery::from_params(&params);
    let tasks = find_tasks(
        state.store.as_ref(),
        &state.pipeline,
        owner,
        query,
        state.filter_deadline,
    )
    .await?;

    Ok(Json(SearchResponse {
        count: tasks.len(),
        tasks,
        query: params.q.unwrap_or_default(),
    }))
}

pub async fn categories_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
) -> Result<Json<CategoriesResponse>, AppError> {
    let categories = user_categories(state.store.as_ref(), &state.pipeline, owner).await?;
    Ok(Json(CategoriesResponse { categories }))
}

pub async fn tasks_by_category_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Path(category): Path<String>,
) -> Result<Json<TaskListResponse>, AppError> {
    filtered(&state, owner, TaskQuery::default().category(category)).await
}

pub async fn tasks_by_priority_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Path(priority): Path<String>,
) -> Result<Json<TaskListResponse>, AppError> {
    let priority = priority
        .parse::<i16>()
        .map_err(|_| AppError::BadRequest(format!("invalid priority '{priority}'")))?;
    filtered(&state, owner, TaskQuery::default().priority(priority)).await
}

pub async fn tasks_by_status_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
    Path(status): Path<String>,
) -> Result<Json<TaskListResponse>, AppError> {
    let status: TaskStatus = status.parse().map_err(AppError::BadRequest)?;
    filtered(&state, owner, TaskQuery::default().status(status)).await
}

pub async fn tasks_due_today_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
) -> Result<Json<TaskListResponse>, AppError> {
    filtered(&state, owner, TaskQuery::due_today(Utc::now())).await
}

pub async fn tasks_due_this_week_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
) -> Result<Json<TaskListResponse>, AppError> {
    filtered(&state, owner, TaskQuery::due_this_week(Utc::now())).await
}

pub async fn overdue_tasks_handler(
    State(state): State<Arc<AppState>>,
    User(owner): User,
) -> Result<Json<TaskListResponse>, AppError> {
    filtered(&state, owner, TaskQuery::overdue(Utc::now())).await
}

async fn filtered(
    state: &AppState,
    owner: OwnerId,
    query: TaskQuery,
) -> Result<Json<TaskListResponse>, AppError> {
    let tasks = find_tasks(
        state.store.as_ref(),
        &state.pipeline,
        owner,
        query,
        state.filter_deadline,
    )
    .await?;
    Ok(Json(TaskListResponse {
        count: tasks.len(),
        tasks,
    }))
}
