/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use rtask_api::{app::AppState, config::Config};
/// use rtask_shared::db::pool::{create_pool, DatabaseConfig};
/// use rtask_shared::identity::DisabledVerifier;
/// use rtask_shared::mail::LogMailer;
/// use rtask_shared::store::postgres::PgStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
///
/// let state = AppState::new(
///     Arc::new(PgStore::new(pool)),
///     Arc::new(LogMailer),
///     Arc::new(DisabledVerifier),
///     config,
/// );
/// let app = rtask_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use chrono::Duration;
use rtask_shared::{
    auth::{jwt::TokenIssuer, middleware::authenticate},
    avatar::{AvatarStore, MAX_AVATAR_BYTES},
    identity::IdentityVerifier,
    mail::Mailer,
    services::{
        account_service::{AccountService, AccountSettings},
        task_service::TaskService,
    },
    store::{TaskStore, UserStore},
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Room for multipart framing around an avatar at the size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is `Arc`-backed, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Task operations
    pub tasks: TaskService,

    /// Account operations
    pub accounts: AccountService,

    /// Account store, for health checks
    pub users: Arc<dyn UserStore>,

    /// Bearer token issuer/verifier
    pub tokens: TokenIssuer,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires services over one store and the given providers
    pub fn new<S>(
        store: Arc<S>,
        mailer: Arc<dyn Mailer>,
        identity: Arc<dyn IdentityVerifier>,
        config: Config,
    ) -> Self
    where
        S: TaskStore + UserStore + 'static,
    {
        let tasks_store: Arc<dyn TaskStore> = store.clone();
        let users: Arc<dyn UserStore> = store;

        let tokens = TokenIssuer::new(
            config.jwt.secret.clone(),
            Duration::hours(config.jwt.ttl_hours),
        );

        let settings = AccountSettings {
            frontend_url: config.api.frontend_url.clone(),
            reset_token_ttl: Duration::minutes(config.jwt.reset_ttl_minutes),
        };

        let accounts = AccountService::new(
            users.clone(),
            mailer,
            identity,
            tokens.clone(),
            AvatarStore::new(config.uploads.dir.clone()),
            settings,
        );

        Self {
            tasks: TaskService::new(tasks_store),
            accounts,
            users,
            tokens,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                    # Health check (public)
/// ├── /api/user/
/// │   ├── POST /register             # public
/// │   ├── POST /login                # public
/// │   ├── POST /forgot-password      # public
/// │   ├── POST /reset-password       # public
/// │   ├── POST /google-auth          # public
/// │   ├── GET  /me                   # bearer
/// │   ├── PUT  /profile              # bearer
/// │   ├── PUT  /password             # bearer
/// │   └── POST|DELETE /avatar        # bearer
/// ├── /api/tasks/                    # bearer
/// │   ├── POST|GET /
/// │   ├── POST /check-title
/// │   └── GET|PUT|DELETE /:id
/// └── GET /uploads/*                 # static files
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per-router basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{health, tasks, user};

    let health_routes = Router::new().route("/health", get(health::health_check));

    let public_user_routes = Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .route("/forgot-password", post(user::forgot_password))
        .route("/reset-password", post(user::reset_password))
        .route("/google-auth", post(user::google_auth));

    let protected_user_routes = Router::new()
        .route("/me", get(user::me))
        .route("/profile", put(user::update_profile))
        .route("/password", put(user::change_password))
        .route(
            "/avatar",
            post(user::upload_avatar)
                .delete(user::remove_avatar)
                .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + MULTIPART_OVERHEAD)),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let task_routes = Router::new()
        .route("/", post(tasks::create_task).get(tasks::list_tasks))
        .route("/check-title", post(tasks::check_title))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new()
        .nest("/user", public_user_routes.merge(protected_user_routes))
        .nest("/tasks", task_routes);

    let cors = cors_layer(&state.config.api.cors_origins);
    let security = SecurityHeadersLayer::new(state.config.api.production);
    let uploads = ServeDir::new(state.config.uploads.dir.clone());

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(security)
        .with_state(state)
}

/// CORS policy: permissive when origins contain `*`
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Bearer token authentication layer
///
/// Validates the `Authorization` header and injects [`AuthContext`] into
/// request extensions for handlers to extract.
///
/// [`AuthContext`]: rtask_shared::auth::middleware::AuthContext
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&state.tokens, req.headers())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
