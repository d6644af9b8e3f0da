/// Storage seams for services
///
/// Services never touch a connection pool directly. They hold
/// `Arc<dyn TaskStore>` / `Arc<dyn UserStore>` handles, constructed once at
/// startup and injected, so tests can run the same services against
/// [`memory::MemoryStore`].
///
/// Every [`TaskStore`] method takes the caller's [`OwnerId`]: there is no way
/// to express an unscoped task lookup through this interface.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: production store over `sqlx::PgPool`
/// - [`memory::MemoryStore`]: in-process store with the same uniqueness rules

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::task::{CreateTask, OwnerId, Task, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Unique constraint on `users.email`
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// Unique constraint on `users.google_id`
pub const USERS_GOOGLE_ID_KEY: &str = "users_google_id_key";

/// Unique index on `(tasks.owner_id, lower(tasks.title))`
pub const TASKS_OWNER_TITLE_KEY: &str = "tasks_owner_title_key";

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    Conflict { constraint: String },

    /// Database unreachable or query failed
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn conflict(constraint: &str) -> Self {
        StoreError::Conflict {
            constraint: constraint.to_string(),
        }
    }

    /// Returns true if this is a violation of `constraint`
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Conflict { constraint: c } if c == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }

        StoreError::Database(err.to_string())
    }
}

/// Result of presenting a password reset token
#[derive(Debug, Clone)]
pub enum ResetTokenOutcome {
    /// Token accepted; password changed and token cleared
    Consumed(User),

    /// Token exists but its expiry has passed
    Expired,

    /// No account holds this token (never issued, or already used)
    Unknown,
}

/// Owner-scoped task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task; fails with a conflict on duplicate (owner, title)
    async fn insert(&self, owner: OwnerId, task: CreateTask) -> Result<Task, StoreError>;

    /// All of the owner's tasks, newest first
    async fn list(&self, owner: OwnerId) -> Result<Vec<Task>, StoreError>;

    async fn find(&self, owner: OwnerId, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Applies changes to an owned task; None if the owner has no such task
    async fn update(
        &self,
        owner: OwnerId,
        id: Uuid,
        changes: UpdateTask,
    ) -> Result<Option<Task>, StoreError>;

    /// Returns true if an owned task was removed
    async fn delete(&self, owner: OwnerId, id: Uuid) -> Result<bool, StoreError>;

    /// Case-insensitive title lookup among the owner's tasks, skipping `exclude`
    async fn title_exists(
        &self,
        owner: OwnerId,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError>;
}

/// Account persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; fails with a conflict on duplicate email or Google id
    async fn insert(&self, user: CreateUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError>;

    async fn update(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError>;

    /// Records a reset token digest, replacing any outstanding one
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Atomically checks the token, sets the new password hash and clears it
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
    ) -> Result<ResetTokenOutcome, StoreError>;

    /// Verifies the backing store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}
