/// PostgreSQL-backed store
///
/// Thin adapter from the store traits onto the model operations in
/// [`crate::models`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ResetTokenOutcome, StoreError, TaskStore, UserStore};
use crate::db::pool::health_check;
use crate::models::task::{CreateTask, OwnerId, Task, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Store over a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert(&self, owner: OwnerId, task: CreateTask) -> Result<Task, StoreError> {
        Ok(Task::create(&self.pool, owner, task).await?)
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_owner(&self.pool, owner).await?)
    }

    async fn find(&self, owner: OwnerId, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id_and_owner(&self.pool, owner, id).await?)
    }

    async fn update(
        &self,
        owner: OwnerId,
        id: Uuid,
        changes: UpdateTask,
    ) -> Result<Option<Task>, StoreError> {
        Ok(Task::update(&self.pool, owner, id, changes).await?)
    }

    async fn delete(&self, owner: OwnerId, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::delete(&self.pool, owner, id).await?)
    }

    async fn title_exists(
        &self,
        owner: OwnerId,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        Ok(Task::title_exists(&self.pool, owner, title, exclude).await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: CreateUser) -> Result<User, StoreError> {
        Ok(User::create(&self.pool, user).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_google_id(&self.pool, google_id).await?)
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError> {
        Ok(User::update(&self.pool, id, changes).await?)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(User::set_reset_token(&self.pool, id, token_hash, expires_at).await?)
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
    ) -> Result<ResetTokenOutcome, StoreError> {
        if let Some(user) = User::consume_reset_token(&self.pool, token_hash, new_password_hash).await? {
            return Ok(ResetTokenOutcome::Consumed(user));
        }

        // Not consumed: tell an expired token apart from an unknown one
        match User::find_by_reset_token(&self.pool, token_hash).await? {
            Some(_) => Ok(ResetTokenOutcome::Expired),
            None => Ok(ResetTokenOutcome::Unknown),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }
}
