use axum::{
    Router, middleware,
    routing::{get, patch},
};
use std::sync::Arc;

use crate::handlers::{
    admission_layer, categories_handler, complete_task_handler, create_task_handler,
    delete_task_handler, get_task_handler, health_handler, list_tasks_handler, metrics_handler,
    overdue_tasks_handler, search_handler, tasks_by_category_handler, tasks_by_priority_handler,
    tasks_by_status_handler, tasks_due_this_week_handler, tasks_due_today_handler,
};
use crate::state::AppState;

/// All routes, each behind the admission check.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/search", get(search_handler))
        .route("/tasks/categories", get(categories_handler))
        .route("/tasks/category/{category}", get(tasks_by_category_handler))
        .route("/tasks/priority/{priority}", get(tasks_by_priority_handler))
        .route("/tasks/status/{status}", get(tasks_by_status_handler))
        .route("/tasks/due/today", get(tasks_due_today_handler))
        .route("/tasks/due/week", get(tasks_due_this_week_handler))
        .route("/tasks/overdue", get(overdue_tasks_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler).delete(delete_task_handler),
        )
        .route("/tasks/{id}/complete", patch(complete_task_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            admission_layer,
        ))
        .with_state(state)
}
