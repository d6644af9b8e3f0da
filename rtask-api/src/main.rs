//! # RTask API Server
//!
//! REST API for personal task management: accounts, bearer-token auth and
//! owner-scoped tasks.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (and `.env`)
//! 2. Connect to PostgreSQL and apply migrations; failure exits non-zero
//! 3. Pick the mail and identity providers from configuration
//! 4. Serve until Ctrl-C
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p rtask-api
//! ```

use anyhow::Context;
use rtask_api::{
    app::{build_router, AppState},
    config::Config,
};
use rtask_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    identity::{DisabledVerifier, GoogleTokenInfoVerifier, IdentityVerifier},
    mail::{LogMailer, Mailer, ResendMailer},
    store::postgres::PgStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rtask_api=debug,rtask_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("RTask API Server v{} starting...", rtask_shared::VERSION);

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let mailer: Arc<dyn Mailer> = match config.mail.resend_api_key {
        Some(ref key) => Arc::new(
            ResendMailer::new(key.clone(), config.mail.from.clone())
                .context("Failed to initialize the mail provider")?,
        ),
        None => {
            tracing::warn!("RESEND_API_KEY not set; emails will be logged, not sent");
            Arc::new(LogMailer)
        }
    };

    let identity: Arc<dyn IdentityVerifier> = match config.google.client_id {
        Some(ref client_id) => Arc::new(
            GoogleTokenInfoVerifier::new(client_id.clone())
                .context("Failed to initialize Google sign-in")?,
        ),
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID not set; Google sign-in disabled");
            Arc::new(DisabledVerifier)
        }
    };

    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .with_context(|| format!("Failed to create upload directory {:?}", config.uploads.dir))?;

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), mailer, identity, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
