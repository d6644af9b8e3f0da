/// Account endpoints
///
/// # Endpoints
///
/// Public:
/// - `POST /api/user/register` - Create an account
/// - `POST /api/user/login` - Sign in with email and password
/// - `POST /api/user/forgot-password` - Email a password reset link
/// - `POST /api/user/reset-password` - Set a new password with a reset token
/// - `POST /api/user/google-auth` - Sign in with a Google ID token
///
/// Bearer token required:
/// - `GET    /api/user/me` - Current account
/// - `PUT    /api/user/profile` - Change display name
/// - `PUT    /api/user/password` - Change password
/// - `POST   /api/user/avatar` - Upload avatar (multipart field `avatar`)
/// - `DELETE /api/user/avatar` - Remove avatar

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    wire::{ApiJson, UserBody},
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use rtask_shared::{
    auth::middleware::AuthContext,
    services::account_service::{Registration, Session, FORGOT_PASSWORD_MESSAGE},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

/// Multipart field carrying the avatar image
pub const AVATAR_FIELD: &str = "avatar";

/// Register request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email."))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
}

/// Login request
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Profile update request
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
}

/// Password change request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,

    #[serde(default)]
    pub new_password: String,
}

/// Forgot password request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(email(message = "Valid email required."))]
    pub email: String,
}

/// Reset password request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub new_password: String,
}

/// Google sign-in request
#[derive(Debug, Default, Deserialize)]
pub struct GoogleAuthRequest {
    /// Google ID token from the client library
    #[serde(default)]
    pub credential: String,
}

/// Token and account returned by sign-in endpoints
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserBody,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            success: true,
            token: session.token,
            user: session.user.into(),
        }
    }
}

/// Account response
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserBody,
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Avatar upload response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub success: bool,
    pub message: String,
    pub avatar: String,
    pub full_avatar_url: String,
}

/// Avatar removal response
#[derive(Debug, Serialize)]
pub struct RemoveAvatarResponse {
    pub success: bool,
    pub message: String,
    pub user: UserBody,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: text.to_string(),
    })
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /api/user/register
///
/// { "name": "Ada", "email": "ada@example.com", "password": "longpass1" }
/// ```
///
/// # Response (201)
///
/// ```json
/// { "success": true, "token": "eyJ...", "user": { "id": "...", "name": "Ada", "email": "ada@example.com", "avatar": null } }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing field, invalid email or short password
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.email = req.email.trim().to_string();

    if req.name.trim().is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("All fields are required.".to_string()));
    }
    req.validate()?;

    let session = state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Sign in with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `401 Unauthorized`: "Invalid credentials." for any mismatch
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(session.into()))
}

/// Current account
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<UserResponse>> {
    let user = state.accounts.current_user(auth.user_id).await?;

    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}

/// Change display name
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.accounts.update_profile(auth.user_id, &req.name).await?;

    Ok(Json(UserResponse {
        success: true,
        user: user.into(),
    }))
}

/// Change password
///
/// # Errors
///
/// - `400 Bad Request`: Missing current password or new password too short
/// - `401 Unauthorized`: Current password incorrect
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .accounts
        .change_password(auth.user_id, &req.current_password, &req.new_password)
        .await?;

    Ok(message("Password changed."))
}

/// Email a password reset link
///
/// Answers with the same message whether or not the email is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.email = req.email.trim().to_string();
    req.validate()?;

    state.accounts.forgot_password(&req.email).await?;
    Ok(message(FORGOT_PASSWORD_MESSAGE))
}

/// Set a new password with a reset token
///
/// # Errors
///
/// - `400 Bad Request`: Missing token, short password, unknown or expired token
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .accounts
        .reset_password(&req.token, &req.new_password)
        .await?;

    Ok(message("Password has been reset successfully."))
}

/// Sign in with a Google ID token
///
/// # Errors
///
/// - `401 Unauthorized`: Credential rejected
/// - `503 Service Unavailable`: Google unreachable or sign-in not configured
pub async fn google_auth(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GoogleAuthRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let session = state.accounts.google_auth(&req.credential).await?;
    Ok(Json(session.into()))
}

/// Upload a new avatar
///
/// # Endpoint
///
/// ```text
/// POST /api/user/avatar
/// Content-Type: multipart/form-data; boundary=...
///
/// avatar=<JPEG, PNG or GIF, at most 5 MiB>
/// ```
///
/// # Response
///
/// ```json
/// { "success": true, "message": "Avatar uploaded successfully", "avatar": "/uploads/avatars/avatar-1700000000000-42.png", "fullAvatarUrl": "http://localhost:4000/uploads/avatars/avatar-1700000000000-42.png" }
/// ```
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AVATAR_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;

        let user = state
            .accounts
            .upload_avatar(
                auth.user_id,
                content_type.as_deref(),
                file_name.as_deref(),
                data,
            )
            .await?;

        let avatar = user
            .avatar_path
            .ok_or_else(|| ApiError::InternalError("Avatar path missing after upload".to_string()))?;

        return Ok(Json(AvatarResponse {
            success: true,
            message: "Avatar uploaded successfully".to_string(),
            full_avatar_url: state.config.public_link(&avatar),
            avatar,
        }));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// Remove the avatar
pub async fn remove_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<RemoveAvatarResponse>> {
    let user = state.accounts.remove_avatar(auth.user_id).await?;

    Ok(Json(RemoveAvatarResponse {
        success: true,
        message: "Avatar removed successfully".to_string(),
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation_messages() {
        let req = RegisterRequest {
            name: "Ada".to_string(),
            email: "not-an-email".to_string(),
            password: "longpass1".to_string(),
        };
        let err = ApiError::from(req.validate().unwrap_err());
        let ApiError::ValidationError(details) = err else {
            panic!("expected field errors");
        };
        assert_eq!(details[0].field, "email");
        assert_eq!(details[0].message, "Invalid email.");

        let req = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_camel_case_password_fields() {
        let req: ResetPasswordRequest =
            serde_json::from_str(r#"{"token": "abc", "newPassword": "longpass1"}"#).unwrap();
        assert_eq!(req.new_password, "longpass1");

        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"currentPassword": "a", "newPassword": "b"}"#).unwrap();
        assert_eq!(req.current_password, "a");
    }
}
