/// In-memory store for tests and local demos
///
/// Mirrors the PostgreSQL schema's uniqueness rules (`users_email_key`,
/// `users_google_id_key`, `tasks_owner_title_key`) so services behave the same
/// against either store. Data lives behind a single `RwLock`; each operation is
/// atomic with respect to the others.
///
/// # Example
///
/// ```
/// use rtask_shared::models::task::{OwnerId, TaskInput};
/// use rtask_shared::store::{memory::MemoryStore, TaskStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let owner = OwnerId::new(Uuid::new_v4());
///
/// TaskStore::insert(&store, owner, TaskInput::titled("Buy milk").into_create()).await?;
/// assert!(store.title_exists(owner, "BUY MILK", None).await?);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ResetTokenOutcome, StoreError, TaskStore, UserStore, TASKS_OWNER_TITLE_KEY,
    USERS_EMAIL_KEY, USERS_GOOGLE_ID_KEY,
};
use crate::models::task::{CreateTask, OwnerId, Task, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,

    /// Tasks in insertion order
    tasks: Vec<Task>,
}

impl Inner {
    fn title_taken(&self, owner: OwnerId, title: &str, exclude: Option<Uuid>) -> bool {
        let wanted = title.trim().to_lowercase();
        self.tasks.iter().any(|t| {
            t.is_owned_by(owner) && Some(t.id) != exclude && t.title.to_lowercase() == wanted
        })
    }

    fn owned_task_mut(&mut self, owner: OwnerId, id: Uuid) -> Option<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id && t.is_owned_by(owner))
    }
}

/// Store keeping all records in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a user's reset token expiry
    ///
    /// Lets tests move a token past its expiry without waiting.
    pub async fn set_reset_token_expiry(&self, id: Uuid, expires_at: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(user) if user.reset_token_hash.is_some() => {
                user.reset_token_expires_at = Some(expires_at);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert(&self, owner: OwnerId, task: CreateTask) -> Result<Task, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.title_taken(owner, &task.title, None) {
            return Err(StoreError::conflict(TASKS_OWNER_TITLE_KEY));
        }

        let task = Task {
            id: Uuid::new_v4(),
            owner_id: owner.as_uuid(),
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            completed: task.completed,
            due_date: task.due_date,
            created_at: Utc::now(),
        };
        inner.tasks.push(task.clone());

        Ok(task)
    }

    async fn list(&self, owner: OwnerId) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.read().await;

        // Reverse insertion order first so equal timestamps stay newest-first
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .rev()
            .filter(|t| t.is_owned_by(owner))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(tasks)
    }

    async fn find(&self, owner: OwnerId, id: Uuid) -> Result<Option<Task>, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner
            .tasks
            .iter()
            .find(|t| t.id == id && t.is_owned_by(owner))
            .cloned())
    }

    async fn update(
        &self,
        owner: OwnerId,
        id: Uuid,
        changes: UpdateTask,
    ) -> Result<Option<Task>, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.owned_task_mut(owner, id).is_none() {
            return Ok(None);
        }
        if let Some(ref title) = changes.title {
            if inner.title_taken(owner, title, Some(id)) {
                return Err(StoreError::conflict(TASKS_OWNER_TITLE_KEY));
            }
        }

        Ok(inner.owned_task_mut(owner, id).map(|task| {
            changes.apply_to(task);
            task.clone()
        }))
    }

    async fn delete(&self, owner: OwnerId, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;

        let before = inner.tasks.len();
        inner.tasks.retain(|t| !(t.id == id && t.is_owned_by(owner)));

        Ok(inner.tasks.len() < before)
    }

    async fn title_exists(
        &self,
        owner: OwnerId,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.title_taken(owner, title, exclude))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: CreateUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::conflict(USERS_EMAIL_KEY));
        }
        if let Some(ref google_id) = user.google_id {
            if inner.users.values().any(|u| u.google_id.as_ref() == Some(google_id)) {
                return Err(StoreError::conflict(USERS_GOOGLE_ID_KEY));
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            google_id: user.google_id,
            avatar_path: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(ref google_id) = changes.google_id {
            let taken = inner
                .users
                .values()
                .any(|u| u.id != id && u.google_id.as_ref() == Some(google_id));
            if taken {
                return Err(StoreError::conflict(USERS_GOOGLE_ID_KEY));
            }
        }

        Ok(inner.users.get_mut(&id).map(|user| {
            changes.apply_to(user);
            user.clone()
        }))
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;

        Ok(match inner.users.get_mut(&id) {
            Some(user) => {
                user.reset_token_hash = Some(token_hash.to_string());
                user.reset_token_expires_at = Some(expires_at);
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
    ) -> Result<ResetTokenOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let Some(user) = inner
            .users
            .values_mut()
            .find(|u| u.reset_token_hash.as_deref() == Some(token_hash))
        else {
            return Ok(ResetTokenOutcome::Unknown);
        };

        match user.reset_token_expires_at {
            Some(expires_at) if expires_at > now => {
                user.password_hash = Some(new_password_hash.to_string());
                user.reset_token_hash = None;
                user.reset_token_expires_at = None;
                user.updated_at = now;
                Ok(ResetTokenOutcome::Consumed(user.clone()))
            }
            _ => Ok(ResetTokenOutcome::Expired),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
