/// Integration tests for the account endpoints

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{avatar_request, RecordingMailer, TestContext, GOOGLE_CREDENTIAL};
use rtask_shared::store::UserStore;
use serde_json::json;

const FORGOT_MESSAGE: &str = "If your email is registered, you will receive a password reset link.";

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], rtask_shared::VERSION);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({ "name": "Ada", "email": "  Ada@Example.COM ", "password": "longpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(ctx.mailer.sent.lock().await.len(), 1);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "longpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = ctx.send(Method::GET, "/api/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada");
    assert!(body["user"]["avatar"].is_null());
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();

    let cases = [
        (json!({ "name": "Ada", "email": "ada@example.com" }), "All fields are required."),
        (
            json!({ "name": "Ada", "email": "not-an-email", "password": "longpass1" }),
            "Invalid email.",
        ),
        (
            json!({ "name": "Ada", "email": "ada@example.com", "password": "short" }),
            "Password must be at least 8 characters.",
        ),
    ];

    for (body, message) in cases {
        let (status, response) = ctx
            .send(Method::POST, "/api/user/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], message);
    }
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let ctx = TestContext::new();
    ctx.register("Ada", "ada@example.com").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({ "name": "Ada 2", "email": "ADA@example.com", "password": "longpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists.");
}

#[tokio::test]
async fn test_registration_survives_mail_failure() {
    let ctx = TestContext::with_mailer(RecordingMailer {
        fail: true,
        ..Default::default()
    });

    ctx.register("Ada", "ada@example.com").await;
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let ctx = TestContext::new();
    ctx.register("Ada", "ada@example.com").await;

    let (status, wrong) = ctx
        .send(
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrongpass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = ctx
        .send(
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "longpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["message"], unknown["message"]);
    assert_eq!(wrong["message"], "Invalid credentials.");

    let (status, body) = ctx
        .send(Method::POST, "/api/user/login", None, Some(json!({ "email": "ada@example.com" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email and password required.");
}

#[tokio::test]
async fn test_profile_and_password_change() {
    let ctx = TestContext::new();
    let token = ctx.register("Ada", "ada@example.com").await;

    let (status, body) = ctx
        .send(Method::PUT, "/api/user/profile", Some(&token), Some(json!({ "name": "Ada L." })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada L.");

    let (status, body) = ctx
        .send(Method::PUT, "/api/user/profile", Some(&token), Some(json!({ "name": " " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name is required.");

    let (status, _) = ctx
        .send(
            Method::PUT,
            "/api/user/password",
            Some(&token),
            Some(json!({ "currentPassword": "wrongpass", "newPassword": "newpass12" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(
            Method::PUT,
            "/api/user/password",
            Some(&token),
            Some(json!({ "currentPassword": "longpass1", "newPassword": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .send(
            Method::PUT,
            "/api/user/password",
            Some(&token),
            Some(json!({ "currentPassword": "longpass1", "newPassword": "newpass12" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed.");

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "newpass12" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_response_is_uniform() {
    let ctx = TestContext::new();
    ctx.register("Ada", "ada@example.com").await;

    let (status, known) = ctx
        .send(
            Method::POST,
            "/api/user/forgot-password",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, unknown) = ctx
        .send(
            Method::POST,
            "/api/user/forgot-password",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(known, unknown);
    assert_eq!(known["message"], FORGOT_MESSAGE);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/forgot-password",
            None,
            Some(json!({ "email": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Valid email required.");
}

#[tokio::test]
async fn test_forgot_password_uniform_when_mail_fails() {
    let ctx = TestContext::with_mailer(RecordingMailer {
        fail: true,
        ..Default::default()
    });
    ctx.register("Ada", "ada@example.com").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/forgot-password",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], FORGOT_MESSAGE);
}

#[tokio::test]
async fn test_reset_password_is_single_use() {
    let ctx = TestContext::new();
    ctx.register("Ada", "ada@example.com").await;

    ctx.send(
        Method::POST,
        "/api/user/forgot-password",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    let token = ctx.last_reset_token().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/reset-password",
            None,
            Some(json!({ "token": token, "newPassword": "resetpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password has been reset successfully.");

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "resetpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/reset-password",
            None,
            Some(json!({ "token": token, "newPassword": "another12" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid reset token. Please request a new password reset link."
    );
}

#[tokio::test]
async fn test_expired_reset_token() {
    let ctx = TestContext::new();
    ctx.register("Ada", "ada@example.com").await;

    ctx.send(
        Method::POST,
        "/api/user/forgot-password",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    let token = ctx.last_reset_token().await;

    let user = ctx.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    ctx.store
        .set_reset_token_expiry(user.id, Utc::now() - Duration::minutes(5))
        .await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/reset-password",
            None,
            Some(json!({ "token": token, "newPassword": "resetpass1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Reset token has expired. Please request a new one.");
}

#[tokio::test]
async fn test_google_auth() {
    let ctx = TestContext::new();
    let password_token = ctx.register("Ada", "ada@example.com").await;

    let (_, me) = ctx
        .send(Method::GET, "/api/user/me", Some(&password_token), None)
        .await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/google-auth",
            None,
            Some(json!({ "credential": GOOGLE_CREDENTIAL })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], me["user"]["id"]);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/user/google-auth",
            None,
            Some(json!({ "credential": "forged" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_avatar_upload_serve_and_remove() {
    let ctx = TestContext::new();
    let token = ctx.register("Ada", "ada@example.com").await;

    let png = b"\x89PNG\r\n\x1a\nnot really an image";
    let (status, body) = ctx
        .call(avatar_request(&token, "me.png", "image/png", png))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let avatar = body["avatar"].as_str().unwrap().to_string();
    assert!(avatar.starts_with("/uploads/avatars/avatar-"));
    assert!(avatar.ends_with(".png"));
    assert_eq!(
        body["fullAvatarUrl"],
        format!("http://localhost:4000{avatar}")
    );

    let (status, bytes) = ctx.get_raw(&avatar).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, png.to_vec());

    let (_, me) = ctx.send(Method::GET, "/api/user/me", Some(&token), None).await;
    assert_eq!(me["user"]["avatar"], avatar.as_str());

    let (status, body) = ctx
        .send(Method::DELETE, "/api/user/avatar", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"]["avatar"].is_null());

    let (status, _) = ctx.get_raw(&avatar).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(ctx.uploads.path().join("avatars").exists());
}

#[tokio::test]
async fn test_avatar_rejects_other_types() {
    let ctx = TestContext::new();
    let token = ctx.register("Ada", "ada@example.com").await;

    let (status, body) = ctx
        .call(avatar_request(&token, "notes.txt", "text/plain", b"hello"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    for (method, uri) in [
        (Method::GET, "/api/user/me"),
        (Method::PUT, "/api/user/profile"),
        (Method::PUT, "/api/user/password"),
        (Method::DELETE, "/api/user/avatar"),
    ] {
        let (status, _) = ctx.send(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}
