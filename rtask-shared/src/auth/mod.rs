/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the minimum length rule
/// - [`jwt`]: bearer token signing and validation
/// - [`reset_token`]: single-use password reset tokens (SHA-256 at rest)
/// - [`middleware`]: Axum middleware and the [`middleware::AuthContext`] extractor
///
/// # Example
///
/// ```
/// use rtask_shared::auth::password::{hash_password, verify_password};
/// use rtask_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(Uuid::new_v4()), "secret-key")?;
/// assert!(validate_token(&token, "secret-key").is_ok());
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
