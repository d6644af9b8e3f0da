/// Application services
///
/// Handlers call into these; services own validation and business rules and
/// reach storage, mail and identity providers only through injected handles.
///
/// - [`task_service::TaskService`]: owner-scoped task CRUD and title checks
/// - [`account_service::AccountService`]: registration, login, profile,
///   password reset, Google sign-in and avatars

pub mod account_service;
pub mod task_service;

use crate::auth::{jwt::JwtError, password::PasswordError};
use crate::avatar::AvatarError;
use crate::identity::IdentityError;
use crate::store::{StoreError, TASKS_OWNER_TITLE_KEY, USERS_EMAIL_KEY, USERS_GOOGLE_ID_KEY};

/// Error type shared by all services
///
/// Each variant maps to one HTTP status in the API crate.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or token
    #[error("{0}")]
    Unauthorized(String),

    /// Uniqueness rule violated
    #[error("{0}")]
    Conflict(String),

    /// No such resource, or not owned by the caller
    #[error("{0}")]
    NotFound(String),

    /// An external provider is unreachable or not configured
    #[error("{0}")]
    Upstream(String),

    /// Anything else; details are logged, not shown to clients
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { ref constraint } if constraint == TASKS_OWNER_TITLE_KEY => {
                ServiceError::Conflict("A task with this title already exists.".to_string())
            }
            StoreError::Conflict { ref constraint } if constraint == USERS_EMAIL_KEY => {
                ServiceError::Conflict("User already exists.".to_string())
            }
            StoreError::Conflict { ref constraint } if constraint == USERS_GOOGLE_ID_KEY => {
                ServiceError::Conflict("Google account already linked to another user.".to_string())
            }
            StoreError::Conflict { constraint } => {
                ServiceError::Conflict(format!("Duplicate value ({})", constraint))
            }
            StoreError::Database(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredential(_) => {
                ServiceError::Unauthorized("Google authentication failed.".to_string())
            }
            IdentityError::Unavailable(msg) => {
                ServiceError::Upstream(format!("Google sign-in unavailable: {}", msg))
            }
            IdentityError::NotConfigured => {
                ServiceError::Upstream("Google sign-in is not configured.".to_string())
            }
        }
    }
}

impl From<AvatarError> for ServiceError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::Io(e) => ServiceError::Internal(format!("Avatar storage failed: {}", e)),
            rejected => ServiceError::Validation(rejected.to_string()),
        }
    }
}
