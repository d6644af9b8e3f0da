/// Accounts: registration, login, profile, password reset, Google sign-in
/// and avatars
///
/// Credentials are handled here and nowhere else. Plaintext passwords and
/// reset tokens never reach storage or logs.

use bytes::Bytes;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::reset_token::{generate_reset_token, hash_reset_token};
use crate::avatar::AvatarStore;
use crate::identity::IdentityVerifier;
use crate::mail::{password_reset_email, welcome_email, Mailer};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::store::{ResetTokenOutcome, UserStore};

/// Response to every well-formed forgot-password request
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If your email is registered, you will receive a password reset link.";

const INVALID_CREDENTIALS: &str = "Invalid credentials.";
const USER_NOT_FOUND: &str = "User not found.";

/// Trims and lowercases an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Settings for links and token lifetimes
#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// Base URL of the web client, used in reset links
    pub frontend_url: String,

    /// How long a password reset token stays valid
    pub reset_token_ttl: Duration,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            reset_token_ttl: Duration::minutes(60),
        }
    }
}

/// Input for [`AccountService::register`]
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// An authenticated user with a freshly issued bearer token
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Account operations over injected storage and providers
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    identity: Arc<dyn IdentityVerifier>,
    tokens: TokenIssuer,
    avatars: AvatarStore,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        identity: Arc<dyn IdentityVerifier>,
        tokens: TokenIssuer,
        avatars: AvatarStore,
        settings: AccountSettings,
    ) -> Self {
        Self {
            users,
            mailer,
            identity,
            tokens,
            avatars,
            settings,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    fn session(&self, user: User) -> ServiceResult<Session> {
        let token = self.tokens.issue(user.id)?;
        Ok(Session { token, user })
    }

    async fn require_user(&self, user_id: Uuid) -> ServiceResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))
    }

    /// Creates an account and signs it in
    ///
    /// The welcome email is best effort: a delivery failure is logged and
    /// registration still succeeds.
    ///
    /// # Errors
    ///
    /// `Validation` for missing fields or a short password, `Conflict` if
    /// the email is taken.
    pub async fn register(&self, input: Registration) -> ServiceResult<Session> {
        let name = input.name.trim().to_string();
        let email = normalize_email(&input.email);

        if name.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(ServiceError::Validation("All fields are required.".to_string()));
        }
        validate_password_strength(&input.password).map_err(ServiceError::Validation)?;

        let user = self
            .users
            .insert(CreateUser {
                name,
                email,
                password_hash: Some(hash_password(&input.password)?),
                google_id: None,
            })
            .await?;

        info!(user_id = %user.id, "User registered");

        if let Err(e) = self.mailer.send(welcome_email(&user.name, &user.email)).await {
            warn!(user_id = %user.id, error = %e, "Welcome email failed");
        }

        self.session(user)
    }

    /// Signs in with email and password
    ///
    /// Unknown email, wrong password and password-less accounts all fail
    /// with the same `Unauthorized` message.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::Validation("Email and password required.".to_string()));
        }

        let invalid = || ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string());

        let user = self.users.find_by_email(&email).await?.ok_or_else(invalid)?;
        let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

        if !verify_password(password, hash)? {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(invalid());
        }

        self.session(user)
    }

    pub async fn current_user(&self, user_id: Uuid) -> ServiceResult<User> {
        self.require_user(user_id).await
    }

    /// Changes the display name
    pub async fn update_profile(&self, user_id: Uuid, name: &str) -> ServiceResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("Name is required.".to_string()));
        }

        let changes = UpdateUser {
            name: Some(name.to_string()),
            ..Default::default()
        };

        self.users
            .update(user_id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))
    }

    /// Replaces the password after checking the current one
    ///
    /// # Errors
    ///
    /// `Validation` if either password is missing or the new one is too
    /// short, `Unauthorized` if the current password does not match.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        if current_password.is_empty() || validate_password_strength(new_password).is_err() {
            return Err(ServiceError::Validation(
                "Passwords invalid or too short.".to_string(),
            ));
        }

        let user = self.require_user(user_id).await?;

        let matches = match user.password_hash.as_deref() {
            Some(hash) => verify_password(current_password, hash)?,
            None => false,
        };
        if !matches {
            return Err(ServiceError::Unauthorized(
                "Current password incorrect.".to_string(),
            ));
        }

        let changes = UpdateUser {
            password_hash: Some(hash_password(new_password)?),
            ..Default::default()
        };
        self.users.update(user_id, changes).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Starts a password reset
    ///
    /// Returns `Ok(())` whether or not the email belongs to an account, and
    /// also when the reset email cannot be delivered, so callers cannot tell
    /// registered addresses apart.
    pub async fn forgot_password(&self, email: &str) -> ServiceResult<()> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ServiceError::Validation("Valid email required.".to_string()));
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let (token, digest) = generate_reset_token();
        let expires_at = Utc::now() + self.settings.reset_token_ttl;
        self.users.set_reset_token(user.id, &digest, expires_at).await?;

        let reset_url = format!(
            "{}/reset-password?token={}",
            self.settings.frontend_url.trim_end_matches('/'),
            token
        );
        let email = password_reset_email(
            &user.name,
            &user.email,
            &reset_url,
            self.settings.reset_token_ttl.num_minutes(),
        );

        match self.mailer.send(email).await {
            Ok(()) => info!(user_id = %user.id, "Password reset email sent"),
            Err(e) => warn!(user_id = %user.id, error = %e, "Password reset email failed"),
        }

        Ok(())
    }

    /// Sets a new password with a reset token
    ///
    /// The token is checked and consumed in the same store operation, so it
    /// works at most once.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ServiceResult<()> {
        let token = token.trim();
        if token.is_empty() || validate_password_strength(new_password).is_err() {
            return Err(ServiceError::Validation("Invalid token or password.".to_string()));
        }

        let new_hash = hash_password(new_password)?;

        match self
            .users
            .consume_reset_token(&hash_reset_token(token), &new_hash)
            .await?
        {
            ResetTokenOutcome::Consumed(user) => {
                info!(user_id = %user.id, "Password reset");
                Ok(())
            }
            ResetTokenOutcome::Expired => Err(ServiceError::Validation(
                "Reset token has expired. Please request a new one.".to_string(),
            )),
            ResetTokenOutcome::Unknown => Err(ServiceError::Validation(
                "Invalid reset token. Please request a new password reset link.".to_string(),
            )),
        }
    }

    /// Signs in with a Google ID token
    ///
    /// Resolves the account by Google subject, then by email (linking the
    /// subject to the existing account), and otherwise creates a new account
    /// without a password.
    pub async fn google_auth(&self, credential: &str) -> ServiceResult<Session> {
        if credential.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Google credential is required.".to_string(),
            ));
        }

        let identity = self.identity.verify(credential.trim()).await?;

        if let Some(user) = self.users.find_by_google_id(&identity.subject).await? {
            return self.session(user);
        }

        if let Some(existing) = self.users.find_by_email(&identity.email).await? {
            if existing
                .google_id
                .as_deref()
                .is_some_and(|linked| linked != identity.subject)
            {
                warn!(user_id = %existing.id, "Account already linked to another Google subject");
                return Err(ServiceError::Conflict(
                    "Account is already linked to a different Google account.".to_string(),
                ));
            }

            let changes = UpdateUser {
                google_id: Some(identity.subject.clone()),
                ..Default::default()
            };
            let user = self
                .users
                .update(existing.id, changes)
                .await?
                .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;

            info!(user_id = %user.id, "Google account linked");
            return self.session(user);
        }

        let name = identity.name.clone().unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });

        let user = self
            .users
            .insert(CreateUser {
                name,
                email: identity.email,
                password_hash: None,
                google_id: Some(identity.subject),
            })
            .await?;

        info!(user_id = %user.id, "User registered with Google");

        if let Err(e) = self.mailer.send(welcome_email(&user.name, &user.email)).await {
            warn!(user_id = %user.id, error = %e, "Welcome email failed");
        }

        self.session(user)
    }

    /// Stores a new avatar image and removes the previous one
    pub async fn upload_avatar(
        &self,
        user_id: Uuid,
        content_type: Option<&str>,
        file_name: Option<&str>,
        data: Bytes,
    ) -> ServiceResult<User> {
        let previous = self.require_user(user_id).await?.avatar_path;

        let path = self.avatars.save(content_type, file_name, data).await?;

        let changes = UpdateUser {
            avatar_path: Some(Some(path.clone())),
            ..Default::default()
        };
        let Some(user) = self.users.update(user_id, changes).await? else {
            self.avatars.remove(&path).await?;
            return Err(ServiceError::NotFound(USER_NOT_FOUND.to_string()));
        };

        if let Some(old) = previous {
            if let Err(e) = self.avatars.remove(&old).await {
                warn!(user_id = %user_id, error = %e, "Could not remove previous avatar");
            }
        }

        info!(user_id = %user_id, avatar = %path, "Avatar updated");
        Ok(user)
    }

    /// Deletes the avatar file, if any, and clears the field
    pub async fn remove_avatar(&self, user_id: Uuid) -> ServiceResult<User> {
        let user = self.require_user(user_id).await?;

        if let Some(ref path) = user.avatar_path {
            self.avatars.remove(path).await?;
        }

        let changes = UpdateUser {
            avatar_path: Some(None),
            ..Default::default()
        };

        self.users
            .update(user_id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, VerifiedIdentity};
    use crate::mail::{Email, MailError};
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Email>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: Email) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Transport("offline".to_string()));
            }
            self.sent.lock().await.push(email);
            Ok(())
        }
    }

    struct FakeGoogle;

    #[async_trait]
    impl IdentityVerifier for FakeGoogle {
        async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
            match credential {
                "ada" => Ok(VerifiedIdentity {
                    subject: "google-ada".to_string(),
                    email: "ada@example.com".to_string(),
                    name: Some("Ada G.".to_string()),
                }),
                "grace" => Ok(VerifiedIdentity {
                    subject: "google-grace".to_string(),
                    email: "grace@example.com".to_string(),
                    name: None,
                }),
                _ => Err(IdentityError::InvalidCredential("bad".to_string())),
            }
        }
    }

    struct Harness {
        accounts: AccountService,
        store: Arc<MemoryStore>,
        mailer: Arc<RecordingMailer>,
        uploads: tempfile::TempDir,
    }

    fn harness_with(mailer: RecordingMailer) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let uploads = tempfile::tempdir().unwrap();

        let accounts = AccountService::new(
            store.clone(),
            mailer.clone(),
            Arc::new(FakeGoogle),
            TokenIssuer::new("test-secret-key-at-least-32-bytes-long", Duration::hours(24)),
            AvatarStore::new(uploads.path()),
            AccountSettings::default(),
        );

        Harness {
            accounts,
            store,
            mailer,
            uploads: uploads,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingMailer::default())
    }

    fn ada() -> Registration {
        Registration {
            name: "Ada".to_string(),
            email: " Ada@Example.com ".to_string(),
            password: "longpass1".to_string(),
        }
    }

    fn token_from_link(email: &Email) -> String {
        let start = email.html.find("token=").unwrap() + "token=".len();
        email.html[start..start + 64].to_string()
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let h = harness();

        let session = h.accounts.register(ada()).await.unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(
            h.accounts.tokens().verify(&session.token).unwrap().sub,
            session.user.id
        );
        assert_eq!(h.mailer.sent.lock().await.len(), 1);

        let login = h.accounts.login("ADA@example.com", "longpass1").await.unwrap();
        assert_eq!(login.user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_register_validation_and_conflict() {
        let h = harness();

        let short = Registration {
            password: "short".to_string(),
            ..ada()
        };
        assert!(matches!(
            h.accounts.register(short).await,
            Err(ServiceError::Validation(_))
        ));

        h.accounts.register(ada()).await.unwrap();
        assert!(matches!(
            h.accounts.register(ada()).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_register_survives_mail_failure() {
        let h = harness_with(RecordingMailer {
            fail: true,
            ..Default::default()
        });

        assert!(h.accounts.register(ada()).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let h = harness();
        h.accounts.register(ada()).await.unwrap();

        let wrong = h.accounts.login("ada@example.com", "wrongpass").await.unwrap_err();
        let unknown = h.accounts.login("nobody@example.com", "longpass1").await.unwrap_err();

        assert_eq!(wrong.to_string(), INVALID_CREDENTIALS);
        assert_eq!(unknown.to_string(), INVALID_CREDENTIALS);
        assert!(matches!(wrong, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let h = harness();
        let user = h.accounts.register(ada()).await.unwrap().user;

        assert!(matches!(
            h.accounts.change_password(user.id, "wrongpass", "newpass12").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            h.accounts.change_password(user.id, "longpass1", "short").await,
            Err(ServiceError::Validation(_))
        ));

        h.accounts
            .change_password(user.id, "longpass1", "newpass12")
            .await
            .unwrap();
        assert!(h.accounts.login("ada@example.com", "newpass12").await.is_ok());
        assert!(h.accounts.login("ada@example.com", "longpass1").await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let h = harness();
        let user = h.accounts.register(ada()).await.unwrap().user;

        let updated = h.accounts.update_profile(user.id, "  Ada L. ").await.unwrap();
        assert_eq!(updated.name, "Ada L.");

        assert!(matches!(
            h.accounts.update_profile(user.id, "   ").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            h.accounts.update_profile(Uuid::new_v4(), "Ghost").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let h = harness();
        h.accounts.register(ada()).await.unwrap();

        h.accounts.forgot_password("ada@example.com").await.unwrap();

        let token = {
            let sent = h.mailer.sent.lock().await;
            assert_eq!(sent.len(), 2);
            token_from_link(&sent[1])
        };

        h.accounts.reset_password(&token, "resetpass1").await.unwrap();
        assert!(h.accounts.login("ada@example.com", "resetpass1").await.is_ok());

        // Single use
        let err = h.accounts.reset_password(&token, "another12").await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid reset token"));
    }

    #[tokio::test]
    async fn test_reset_password_expired() {
        let h = harness();
        let user = h.accounts.register(ada()).await.unwrap().user;

        h.accounts.forgot_password("ada@example.com").await.unwrap();
        let token = token_from_link(&h.mailer.sent.lock().await[1]);

        h.store
            .set_reset_token_expiry(user.id, Utc::now() - Duration::minutes(1))
            .await;

        let err = h.accounts.reset_password(&token, "resetpass1").await.unwrap_err();
        assert!(err.to_string().starts_with("Reset token has expired"));
    }

    #[tokio::test]
    async fn test_forgot_password_is_uniform() {
        let h = harness_with(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        h.accounts.register(ada()).await.unwrap();

        assert!(h.accounts.forgot_password("ada@example.com").await.is_ok());
        assert!(h.accounts.forgot_password("nobody@example.com").await.is_ok());
        assert!(matches!(
            h.accounts.forgot_password("  ").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_google_auth_links_and_creates() {
        let h = harness();
        let registered = h.accounts.register(ada()).await.unwrap().user;

        // Existing email gets linked
        let linked = h.accounts.google_auth("ada").await.unwrap().user;
        assert_eq!(linked.id, registered.id);
        assert_eq!(linked.google_id.as_deref(), Some("google-ada"));

        // Second sign-in resolves by subject
        assert_eq!(h.accounts.google_auth("ada").await.unwrap().user.id, registered.id);

        // Unknown email creates a password-less account
        let grace = h.accounts.google_auth("grace").await.unwrap().user;
        assert_eq!(grace.name, "grace");
        assert!(grace.password_hash.is_none());
        assert!(h.accounts.login("grace@example.com", "anything1").await.is_err());

        assert!(matches!(
            h.accounts.google_auth("forged").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_google_auth_keeps_existing_link() {
        let h = harness();
        let registered = h.accounts.register(ada()).await.unwrap().user;
        let changes = UpdateUser {
            google_id: Some("google-other".to_string()),
            ..Default::default()
        };
        UserStore::update(h.store.as_ref(), registered.id, changes)
            .await
            .unwrap();

        assert!(matches!(
            h.accounts.google_auth("ada").await,
            Err(ServiceError::Conflict(_))
        ));

        let user = h.store.find_by_id(registered.id).await.unwrap().unwrap();
        assert_eq!(user.google_id.as_deref(), Some("google-other"));
    }

    #[tokio::test]
    async fn test_avatar_replace_and_remove() {
        let h = harness();
        let user = h.accounts.register(ada()).await.unwrap().user;

        let first = h
            .accounts
            .upload_avatar(user.id, Some("image/png"), Some("a.png"), Bytes::from_static(b"one"))
            .await
            .unwrap()
            .avatar_path
            .unwrap();
        let second = h
            .accounts
            .upload_avatar(user.id, Some("image/gif"), Some("b.gif"), Bytes::from_static(b"two"))
            .await
            .unwrap()
            .avatar_path
            .unwrap();

        assert_ne!(first, second);
        let avatars = AvatarStore::new(h.uploads.path());
        assert!(!avatars.resolve(&first).unwrap().exists());
        assert!(avatars.resolve(&second).unwrap().exists());

        let cleared = h.accounts.remove_avatar(user.id).await.unwrap();
        assert!(cleared.avatar_path.is_none());
        assert!(!avatars.resolve(&second).unwrap().exists());

        assert!(matches!(
            h.accounts
                .upload_avatar(user.id, Some("text/plain"), Some("x.txt"), Bytes::from_static(b"x"))
                .await,
            Err(ServiceError::Validation(_))
        ));
    }
}
