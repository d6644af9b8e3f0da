/// Outbound email
///
/// Services depend on the [`Mailer`] trait. Production uses [`ResendMailer`]
/// (Resend HTTP API over `reqwest`); without an API key the server falls back
/// to [`LogMailer`], which only logs what would have been sent.
///
/// # Example
///
/// ```no_run
/// use rtask_shared::mail::{welcome_email, Mailer, ResendMailer};
///
/// # async fn example() -> Result<(), rtask_shared::mail::MailError> {
/// let mailer = ResendMailer::new("re_123", "RTASK <noreply@rtask.app>")?;
/// mailer.send(welcome_email("Ada", "ada@example.com")).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Error type for email delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Could not reach the provider
    #[error("Email provider unreachable: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A rendered HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Sends rendered emails
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Mailer backed by the Resend HTTP API
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    /// Builds the HTTP client; fails if the TLS backend cannot initialize
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MailError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let request = ResendRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Mailer that logs instead of sending
///
/// Used when no provider key is configured.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            "Email delivery disabled; message not sent"
        );
        Ok(())
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(heading: &str, body: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #333; text-align: center;">{heading}</h1>
  {body}
  <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
  <p style="color: #999; font-size: 12px; text-align: center;">This is an automated message, please do not reply to this email.</p>
</div>"#
    )
}

/// Welcome message sent after registration
pub fn welcome_email(name: &str, to: &str) -> Email {
    let body = format!(
        r#"<p style="color: #666; font-size: 16px;">Hello {name},</p>
  <p style="color: #666; font-size: 16px;">Welcome to RTASK! Create your first task, set priorities and due dates, and keep track of what is done.</p>"#,
        name = escape_html(name)
    );

    Email {
        to: to.to_string(),
        subject: "Welcome to RTASK!".to_string(),
        html: layout("Welcome to RTASK!", &body),
    }
}

/// Password reset message carrying the single-use link
pub fn password_reset_email(name: &str, to: &str, reset_url: &str, ttl_minutes: i64) -> Email {
    let body = format!(
        r#"<p style="color: #666; font-size: 16px;">Hello {name},</p>
  <p style="color: #666; font-size: 16px;">We received a request to reset the password for your RTASK account.</p>
  <div style="text-align: center; margin: 30px 0;">
    <a href="{url}" style="background-color: #00FFFF; color: #0A0A0A; padding: 12px 24px; text-decoration: none; border-radius: 6px; font-weight: bold;">Reset Password</a>
  </div>
  <p style="color: #666; font-size: 14px;">This link expires in {ttl_minutes} minutes. If you did not request a reset, you can ignore this email.</p>"#,
        name = escape_html(name),
        url = escape_html(reset_url),
    );

    Email {
        to: to.to_string(),
        subject: "Reset Your RTASK Password".to_string(),
        html: layout("Reset Your Password", &body),
    }
}
