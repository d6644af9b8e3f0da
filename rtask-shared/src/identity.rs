/// Federated identity verification
///
/// Google sign-in hands the client an ID token; the server checks it through
/// an [`IdentityVerifier`] and gets back a [`VerifiedIdentity`]. Production
/// uses [`GoogleTokenInfoVerifier`]; tests inject a fake.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::debug;

const TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Error type for identity verification
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The credential was rejected (bad signature, expired, wrong audience)
    #[error("Invalid identity credential: {0}")]
    InvalidCredential(String),

    /// The provider could not be reached or answered unexpectedly
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    /// Federated sign-in is not configured on this server
    #[error("Identity provider not configured")]
    NotConfigured,
}

/// Identity asserted by a verified credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider subject id (stable per account)
    pub subject: String,

    /// Verified email address
    pub email: String,

    /// Display name, when the provider shares one
    pub name: Option<String>,
}

/// Verifies an identity credential presented by a client
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// Verifier used when no Google client id is configured
#[derive(Debug, Default, Clone)]
pub struct DisabledVerifier;

#[async_trait]
impl IdentityVerifier for DisabledVerifier {
    async fn verify(&self, _credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}

/// Google encodes booleans in tokeninfo as either `true` or `"true"`
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::String(s) => Ok(s == "true"),
        serde_json::Value::Null => Ok(false),
        other => Err(D::Error::custom(format!("expected boolean, got {}", other))),
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    email_verified: bool,
    name: Option<String>,
}

impl TokenInfo {
    fn into_identity(self, client_id: &str) -> Result<VerifiedIdentity, IdentityError> {
        if self.aud != client_id {
            return Err(IdentityError::InvalidCredential(
                "Token was issued for another client".to_string(),
            ));
        }

        let email = match self.email {
            Some(email) if self.email_verified => email.trim().to_lowercase(),
            _ => {
                return Err(IdentityError::InvalidCredential(
                    "Token carries no verified email".to_string(),
                ))
            }
        };

        Ok(VerifiedIdentity {
            subject: self.sub,
            email,
            name: self.name.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// Verifies Google ID tokens through the `tokeninfo` endpoint
pub struct GoogleTokenInfoVerifier {
    client: reqwest::Client,
    client_id: String,
}

impl GoogleTokenInfoVerifier {
    pub fn new(client_id: impl Into<String>) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            client_id: client_id.into(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenInfoVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let response = self
            .client
            .get(TOKENINFO_ENDPOINT)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(IdentityError::InvalidCredential(format!(
                "Provider rejected token ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(IdentityError::Unavailable(format!(
                "Provider answered {}",
                status
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("Malformed tokeninfo: {}", e)))?;

        debug!(subject = %info.sub, "Google token verified");
        info.into_identity(&self.client_id)
    }
}
