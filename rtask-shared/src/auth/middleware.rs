/// Bearer token authentication for Axum
///
/// [`authenticate`] checks the `Authorization` header against the shared
/// [`TokenIssuer`]; the API's auth layer stores the resulting [`AuthContext`]
/// in the request extensions. Handlers take `AuthContext` as an extractor; on
/// routes without the layer the extractor rejects with 401.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap};
/// use chrono::Duration;
/// use rtask_shared::auth::jwt::TokenIssuer;
/// use rtask_shared::auth::middleware::authenticate;
/// use uuid::Uuid;
///
/// let issuer = TokenIssuer::new("a-secret-of-at-least-thirty-two-bytes", Duration::hours(24));
/// let user_id = Uuid::new_v4();
///
/// let mut headers = HeaderMap::new();
/// let bearer = format!("Bearer {}", issuer.issue(user_id).unwrap());
/// headers.insert(header::AUTHORIZATION, bearer.parse().unwrap());
///
/// assert_eq!(authenticate(&issuer, &headers).unwrap().user_id, user_id);
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{JwtError, TokenIssuer};
use crate::models::task::OwnerId;

/// Identity of the caller, added to request extensions after authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    /// Owner identity for task operations
    pub fn owner(&self) -> OwnerId {
        OwnerId::new(self.user_id)
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// No Authorization header
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Signature, issuer or expiry check failed
    InvalidToken(String),
}

impl AuthError {
    fn message(&self) -> &str {
        match self {
            AuthError::MissingCredentials => "Not authorized, no token.",
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": "UNAUTHORIZED",
            "message": self.message(),
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Verifies the `Authorization: Bearer <token>` header
///
/// # Errors
///
/// `MissingCredentials` without a header, `InvalidFormat` for anything but a
/// bearer token, `InvalidToken` when signature, issuer or expiry checks fail.
pub fn authenticate(issuer: &TokenIssuer, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token.".to_string()))?;

    let claims = issuer.verify(token).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired.".to_string()),
        _ => AuthError::InvalidToken("Not authorized, token failed.".to_string()),
    })?;

    Ok(AuthContext::new(claims.sub))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_context_owner() {
        let user_id = Uuid::new_v4();
        let context = AuthContext::new(user_id);

        assert_eq!(context.owner().as_uuid(), user_id);
    }

    #[test]
    fn test_auth_error_into_response() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidFormat("x".to_string()),
            AuthError::InvalidToken("x".to_string()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key-at-least-32-bytes-long", chrono::Duration::hours(1))
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_authenticate_valid_token() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue(user_id).unwrap();

        let context = authenticate(&issuer, &bearer(&format!("Bearer {}", token))).unwrap();
        assert_eq!(context.user_id, user_id);
    }

    #[test]
    fn test_authenticate_rejections() {
        let issuer = issuer();

        assert!(matches!(
            authenticate(&issuer, &HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authenticate(&issuer, &bearer("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            authenticate(&issuer, &bearer("Bearer ")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            authenticate(&issuer, &bearer("Bearer not-a-token")),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_authenticate_expired_token() {
        let issuer = TokenIssuer::new("test-secret-key-at-least-32-bytes-long", chrono::Duration::hours(-2));
        let token = issuer.issue(Uuid::new_v4()).unwrap();

        match authenticate(&issuer, &bearer(&format!("Bearer {}", token))) {
            Err(AuthError::InvalidToken(msg)) => assert_eq!(msg, "Token expired."),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extractor_rejects_without_context() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();

        let result = AuthContext::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_extractor_reads_context() {
        let user_id = Uuid::new_v4();
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        parts.extensions.insert(AuthContext::new(user_id));

        let context = AuthContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context.user_id, user_id);
    }
}
