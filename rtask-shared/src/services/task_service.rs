/// Owner-scoped task operations
///
/// Every method takes the caller's [`OwnerId`]; a task owned by someone else
/// is indistinguishable from a missing one (`NotFound`).
///
/// # Example
///
/// ```
/// use rtask_shared::models::task::{OwnerId, TaskInput, TaskPatch, TaskStatus};
/// use rtask_shared::services::task_service::TaskService;
/// use rtask_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tasks = TaskService::new(Arc::new(MemoryStore::new()));
/// let owner = OwnerId::new(Uuid::new_v4());
///
/// let task = tasks.create(owner, TaskInput::titled("Buy milk")).await?;
/// let done = tasks
///     .update(owner, task.id, TaskPatch { status: Some(TaskStatus::Completed), ..Default::default() })
///     .await?;
/// assert!(done.completed);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::models::task::{OwnerId, Task, TaskInput, TaskPatch};
use crate::store::TaskStore;

/// Longest accepted title, in characters
pub const MAX_TITLE_LENGTH: usize = 200;

const NOT_FOUND: &str = "Task not found";

fn validate_title(title: &str) -> ServiceResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

/// Task operations over an injected store
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Creates a task for `owner`
    ///
    /// # Errors
    ///
    /// `Validation` for a blank or overlong title, `Conflict` if the owner
    /// already has a task with this title (case-insensitive).
    pub async fn create(&self, owner: OwnerId, input: TaskInput) -> ServiceResult<Task> {
        validate_title(&input.title)?;

        let task = self.store.insert(owner, input.into_create()).await?;

        info!(owner = %owner, task_id = %task.id, "Task created");
        Ok(task)
    }

    /// The owner's tasks, newest first
    pub async fn list(&self, owner: OwnerId) -> ServiceResult<Vec<Task>> {
        Ok(self.store.list(owner).await?)
    }

    pub async fn get(&self, owner: OwnerId, id: Uuid) -> ServiceResult<Task> {
        self.store
            .find(owner, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(NOT_FOUND.to_string()))
    }

    /// Merges `patch` into an owned task
    ///
    /// The completion flag is reconciled with the status first; see
    /// [`TaskPatch::reconcile`].
    pub async fn update(&self, owner: OwnerId, id: Uuid, patch: TaskPatch) -> ServiceResult<Task> {
        if let Some(ref title) = patch.title {
            validate_title(title)?;
        }

        let changes = patch.reconcile();
        debug!(owner = %owner, task_id = %id, ?changes, "Updating task");

        self.store
            .update(owner, id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} or not yours", NOT_FOUND)))
    }

    pub async fn delete(&self, owner: OwnerId, id: Uuid) -> ServiceResult<()> {
        if !self.store.delete(owner, id).await? {
            return Err(ServiceError::NotFound(format!("{} or not yours", NOT_FOUND)));
        }

        info!(owner = %owner, task_id = %id, "Task deleted");
        Ok(())
    }

    /// Returns true if no other owned task uses `title` (case-insensitive)
    ///
    /// `exclude` is the task being edited. Nothing is reserved; a racing
    /// create can still take the title.
    pub async fn is_title_unique(
        &self,
        owner: OwnerId,
        title: &str,
        exclude: Option<Uuid>,
    ) -> ServiceResult<bool> {
        if title.trim().is_empty() {
            return Err(ServiceError::Validation("Title is required".to_string()));
        }

        Ok(!self.store.title_exists(owner, title, exclude).await?)
    }
}
