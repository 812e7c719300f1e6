use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::StoreError;
use crate::models::{NewTask, OwnerId, Task};

/// Owner-scoped task storage. An owner can never read or modify
/// another owner's tasks through this interface.
pub trait TaskStore: Send + Sync {
    fn create(&self, owner: OwnerId, task: NewTask) -> Result<Task, StoreError>;

    /// Full snapshot of the owner's tasks, newest first.
    fn list(&self, owner: OwnerId) -> Result<Vec<Task>, StoreError>;

    fn get(&self, owner: OwnerId, id: u64) -> Result<Task, StoreError>;

    fn set_completed(&self, owner: OwnerId, id: u64, completed: bool)
    -> Result<Task, StoreError>;

    fn delete(&self, owner: OwnerId, id: u64) -> Result<(), StoreError>;
}

// Process-local store, one shard entry per owner
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<OwnerId, Vec<Task>>,
    next_id: AtomicU64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn create(&self, owner: OwnerId, task: NewTask) -> Result<Task, StoreError> {
        let created = Task {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            user_id: owner,
            task_name: task.task_name,
            description: task.description,
            category: task.category,
            priority: task.priority,
            due_date: task.due_date,
            is_completed: false,
            is_recurring: task.is_recurring,
            recurring_frequency: task.recurring_frequency,
            created_at: Utc::now(),
        };

        self.tasks.entry(owner).or_default().push(created.clone());
        Ok(created)
    }

    fn list(&self, owner: OwnerId) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .get(&owner)
            .map(|tasks| tasks.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, owner: OwnerId, id: u64) -> Result<Task, StoreError> {
        self.tasks
            .get(&owner)
            .and_then(|tasks| tasks.iter().find(|t| t.id == id).cloned())
            .ok_or(StoreError::NotFound(id))
    }

    fn set_completed(
        &self,
        owner: OwnerId,
        id: u64,
        completed: bool,
    ) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.get_mut(&owner).ok_or(StoreError::NotFound(id))?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        task.is_completed = completed;
        Ok(task.clone())
    }

    fn delete(&self, owner: OwnerId, id: u64) -> Result<(), StoreError> {
        let mut tasks = self.tasks.get_mut(&owner).ok_or(StoreError::NotFound(id))?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
