/// Task model and owner-scoped database operations
///
/// Every query in this module takes an [`OwnerId`] and filters on it, so a
/// task can only ever be read or modified through its owner's identity.
///
/// # Status
///
/// ```text
/// PENDING ⇄ IN_PROGRESS ⇄ COMPLETED
/// ```
///
/// Any transition is allowed. The `completed` flag shadows the status and is
/// kept consistent by [`TaskInput::into_create`] and [`TaskPatch::reconcile`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('Low', 'Medium', 'High');
/// CREATE TYPE task_status AS ENUM ('PENDING', 'IN_PROGRESS', 'COMPLETED');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     priority task_priority NOT NULL DEFAULT 'Low',
///     status task_status NOT NULL DEFAULT 'PENDING',
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX tasks_owner_title_key ON tasks (owner_id, lower(title));
/// ```
///
/// # Example
///
/// ```no_run
/// use rtask_shared::models::task::{OwnerId, Task, TaskInput};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let owner = OwnerId::new(user_id);
///
/// let task = Task::create(&pool, owner, TaskInput::titled("Buy milk").into_create()).await?;
/// let mine = Task::list_by_owner(&pool, owner).await?;
/// assert_eq!(mine[0].id, task.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

const TASK_COLUMNS: &str =
    "id, owner_id, title, description, priority, status, completed, due_date, created_at";

/// Identity of the authenticated user a task operation acts for
///
/// Only obtainable from a verified bearer token in the HTTP layer (or
/// constructed directly in tests); never deserialized from request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Wraps an authenticated user id
    pub fn new(user_id: Uuid) -> Self {
        Self(user_id)
    }

    /// Returns the underlying user id
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "PascalCase")]
pub enum TaskPriority {
    #[default]
    Low,
    Medium,
    High,
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Pending,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Value the `completed` flag takes when this status is set without an
    /// explicit flag
    pub fn implied_completion(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// User who owns the task
    pub owner_id: Uuid,

    /// Title, unique per owner (case-insensitive)
    pub title: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Priority
    pub priority: TaskPriority,

    /// Lifecycle status
    pub status: TaskStatus,

    /// Completion flag, shadowing `status`
    pub completed: bool,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Returns true if `owner` owns this task
    pub fn is_owned_by(&self, owner: OwnerId) -> bool {
        self.owner_id == owner.as_uuid()
    }
}

/// Task creation input as supplied by a client, before defaults are applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,

    /// Decoded completion flag (`None` when the client omitted it)
    pub completed: Option<bool>,
}

impl TaskInput {
    /// Input with only a title, everything else defaulted
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Applies creation defaults
    ///
    /// Status defaults to `PENDING` and the completion flag to `false`.
    /// A `COMPLETED` status always yields `completed = true`.
    pub fn into_create(self) -> CreateTask {
        let status = self.status.unwrap_or_default();
        let completed = status.implied_completion() || self.completed.unwrap_or(false);

        CreateTask {
            title: self.title.trim().to_string(),
            description: self.description.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            status,
            completed,
            due_date: self.due_date,
        }
    }
}

/// Fully resolved values for a new task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update as supplied by a client
///
/// `None` means "leave unchanged". For `due_date`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Resolves the completion flag against the status in this patch
    ///
    /// Applied in order:
    /// 1. an explicit `completed` is taken as given
    /// 2. status `COMPLETED` forces `completed = true`
    /// 3. status `PENDING`/`IN_PROGRESS` without an explicit flag forces
    ///    `completed = false`
    ///
    /// A patch with neither field leaves the stored flag alone.
    pub fn reconcile(self) -> UpdateTask {
        let completed = match (self.status, self.completed) {
            (Some(TaskStatus::Completed), _) => Some(true),
            (Some(status), None) => Some(status.implied_completion()),
            (_, explicit) => explicit,
        };

        UpdateTask {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            priority: self.priority,
            status: self.status,
            completed,
            due_date: self.due_date,
        }
    }
}

/// Column changes for an existing task
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        *self == UpdateTask::default()
    }

    /// Applies these changes to an in-memory task
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

impl Task {
    /// Inserts a task for `owner`
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `tasks_owner_title_key` if the owner
    /// already has a task with the same title (case-insensitive).
    pub async fn create(pool: &PgPool, owner: OwnerId, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (owner_id, title, description, priority, status, completed, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner.as_uuid())
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.status)
            .bind(data.completed)
            .bind(data.due_date)
            .fetch_one(pool)
            .await
    }

    /// Lists the owner's tasks, newest first
    pub async fn list_by_owner(pool: &PgPool, owner: OwnerId) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner.as_uuid())
            .fetch_all(pool)
            .await
    }

    /// Finds a task by ID, only if `owner` owns it
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        owner: OwnerId,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner_id = $2");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner.as_uuid())
            .fetch_optional(pool)
            .await
    }

    /// Updates an owned task
    ///
    /// Returns None if no task with this ID belongs to `owner`.
    pub async fn update(
        pool: &PgPool,
        owner: OwnerId,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id_and_owner(pool, owner, id).await;
        }

        // Build dynamic update query based on which fields are present
        let columns = [
            ("title", data.title.is_some()),
            ("description", data.description.is_some()),
            ("priority", data.priority.is_some()),
            ("status", data.status.is_some()),
            ("completed", data.completed.is_some()),
            ("due_date", data.due_date.is_some()),
        ];

        // $1 and $2 are the id and owner
        let sets: Vec<String> = columns
            .iter()
            .filter(|(_, present)| *present)
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ${}", column, i + 3))
            .collect();

        let query = format!(
            "UPDATE tasks SET {} WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}",
            sets.join(", ")
        );

        let mut q = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner.as_uuid());

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(completed) = data.completed {
            q = q.bind(completed);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes an owned task
    ///
    /// Returns true if a task was deleted.
    pub async fn delete(pool: &PgPool, owner: OwnerId, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner.as_uuid())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks whether the owner already has a task titled `title`
    ///
    /// Comparison is case-insensitive. `exclude` skips one task (the one being
    /// edited).
    pub async fn title_exists(
        pool: &PgPool,
        owner: OwnerId,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tasks
                WHERE owner_id = $1
                  AND lower(title) = lower($2)
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(owner.as_uuid())
        .bind(title.trim())
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
