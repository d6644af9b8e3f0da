/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 4000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `JWT_TTL_HOURS`: Bearer token lifetime (default: 24)
/// - `RESET_TOKEN_TTL_MINUTES`: Password reset link lifetime (default: 60)
/// - `RESEND_API_KEY`: Email provider key; without it emails are only logged
/// - `MAIL_FROM`: Sender address (default: `RTASK <onboarding@resend.dev>`)
/// - `FRONTEND_URL`: Web client base URL for reset links (default: http://localhost:5173)
/// - `PUBLIC_URL`: Public base URL of this server (default: http://localhost:4000)
/// - `GOOGLE_CLIENT_ID`: Enables Google sign-in when set
/// - `UPLOAD_DIR`: Directory for uploaded files (default: uploads)
/// - `RUST_LOG`: Log level (default: debug for rtask crates)
///
/// # Example
///
/// ```no_run
/// use rtask_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub google: GoogleConfig,
    pub uploads: UploadConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,

    /// Public base URL, used for absolute avatar links
    pub public_url: String,

    /// Web client base URL, used for password reset links
    pub frontend_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Bearer token lifetime in hours
    pub ttl_hours: i64,

    /// Password reset token lifetime in minutes
    pub reset_ttl_minutes: i64,
}

/// Email delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Resend API key (None = log emails instead of sending)
    #[serde(skip_serializing)]
    pub resend_api_key: Option<String>,

    /// Sender address
    pub from: String,
}

/// Google sign-in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client id; Google sign-in is disabled without it
    pub client_id: Option<String>,
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Root directory served under `/uploads`
    pub dir: PathBuf,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(name, default)
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e))
}

/// Splits a comma-separated origin list, dropping empty entries
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric or boolean variable does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let config = Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port: parse_var("API_PORT", "4000")?,
                cors_origins: parse_origins(&var_or("CORS_ORIGINS", "*")),
                production: parse_var("PRODUCTION", "false")?,
                public_url: var_or("PUBLIC_URL", "http://localhost:4000"),
                frontend_url: var_or("FRONTEND_URL", "http://localhost:5173"),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_hours: parse_var("JWT_TTL_HOURS", "24")?,
                reset_ttl_minutes: parse_var("RESET_TOKEN_TTL_MINUTES", "60")?,
            },
            mail: MailConfig {
                resend_api_key: optional_var("RESEND_API_KEY"),
                from: var_or("MAIL_FROM", "RTASK <onboarding@resend.dev>"),
            },
            google: GoogleConfig {
                client_id: optional_var("GOOGLE_CLIENT_ID"),
            },
            uploads: UploadConfig {
                dir: PathBuf::from(var_or("UPLOAD_DIR", "uploads")),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but make no sense
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        if self.jwt.ttl_hours <= 0 {
            anyhow::bail!("JWT_TTL_HOURS must be positive");
        }
        if self.jwt.reset_ttl_minutes <= 0 {
            anyhow::bail!("RESET_TOKEN_TTL_MINUTES must be positive");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Absolute URL for a public path such as an avatar
    pub fn public_link(&self, path: &str) -> String {
        format!("{}{}", self.api.public_url.trim_end_matches('/'), path)
    }

    /// Configuration with development defaults, for tests
    pub fn for_tests(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 4000,
                cors_origins: vec!["*".to_string()],
                production: false,
                public_url: "http://localhost:4000".to_string(),
                frontend_url: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/rtask_test".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                ttl_hours: 24,
                reset_ttl_minutes: 60,
            },
            mail: MailConfig {
                resend_api_key: None,
                from: "RTASK <test@example.com>".to_string(),
            },
            google: GoogleConfig { client_id: None },
            uploads: UploadConfig {
                dir: upload_dir.into(),
            },
        }
    }
}
