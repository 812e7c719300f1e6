mod admission;
mod health;
mod identity;
mod metrics;
mod tasks;

pub use admission::{admission_layer, client_key};
pub use health::health_handler;
pub use identity::{USER_ID_HEADER, User};
pub use metrics::metrics_handler;
pub use tasks::{
    categories_handler, complete_task_handler, create_task_handler, delete_task_handler,
    get_task_handler, list_tasks_handler, overdue_tasks_handler, search_handler,
    tasks_by_category_handler, tasks_by_priority_handler, tasks_by_status_handler,
    tasks_due_this_week_handler, tasks_due_today_handler,
};
