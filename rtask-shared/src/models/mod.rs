/// Database models for RTask
///
/// This module contains the persisted records and their PostgreSQL
/// operations. Services reach them through the [`crate::store`] traits.
///
/// # Models
///
/// - `user`: accounts, credentials and password reset state
/// - `task`: owner-scoped tasks
///
/// # Example
///
/// ```no_run
/// use rtask_shared::models::user::{User, CreateUser};
/// use rtask_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
///     google_id: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;
