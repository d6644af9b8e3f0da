/// Common test utilities for integration tests
///
/// Builds the real router over the in-memory store, with a mailer that
/// records messages and a Google verifier that accepts fixed credentials.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use rtask_api::app::{build_router, AppState};
use rtask_api::config::Config;
use rtask_shared::identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
use rtask_shared::mail::{Email, MailError, Mailer};
use rtask_shared::store::memory::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Mailer that keeps every message, or fails every send
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected {
                status: 500,
                body: "provider down".to_string(),
            });
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}

/// Accepts `valid-google-token` as ada@example.com
pub struct FakeGoogle;

pub const GOOGLE_CREDENTIAL: &str = "valid-google-token";

#[async_trait]
impl IdentityVerifier for FakeGoogle {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        if credential == GOOGLE_CREDENTIAL {
            Ok(VerifiedIdentity {
                subject: "google-sub-1".to_string(),
                email: "ada@example.com".to_string(),
                name: Some("Ada Lovelace".to_string()),
            })
        } else {
            Err(IdentityError::InvalidCredential("signature".to_string()))
        }
    }
}

/// Test context containing the router and its collaborators
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub uploads: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);

        let state = AppState::new(
            store.clone(),
            mailer.clone(),
            Arc::new(FakeGoogle),
            Config::for_tests(uploads.path()),
        );

        Self {
            app: build_router(state),
            store,
            mailer,
            uploads,
        }
    }

    /// Sends a JSON request and returns status and parsed body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.call(request).await
    }

    /// Sends a prepared request and returns status and parsed body
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, body)
    }

    /// Raw response for non-JSON endpoints (static files)
    pub async fn get_raw(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = self
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, bytes.to_vec())
    }

    /// Registers an account and returns its bearer token
    pub async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/user/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "longpass1" })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a task and returns its id
    pub async fn create_task(&self, token: &str, body: Value) -> String {
        let (status, body) = self
            .send(Method::POST, "/api/tasks", Some(token), Some(body))
            .await;

        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["task"]["_id"].as_str().unwrap().to_string()
    }

    /// Reset token from the most recent reset email
    pub async fn last_reset_token(&self) -> String {
        let sent = self.mailer.sent.lock().await;
        let email = sent
            .iter()
            .rev()
            .find(|e| e.subject.contains("Reset"))
            .expect("no reset email sent");

        let start = email.html.find("token=").unwrap() + "token=".len();
        email.html[start..start + 64].to_string()
    }
}

/// Builds a multipart avatar upload request
pub fn avatar_request(token: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "rtask-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/user/avatar")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}
