//! NIDS AI Web Server
//!
//! Authenticated users submit network-flow features and get a traffic
//! classification back; administrators manage accounts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         NIDS AI                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌──────────────────────────┐  │
//! │  │  Pages /  │  │  Session  │  │  Detector (nids-engine)  │  │
//! │  │  JSON API │  │  Registry │  │  scale → classify →      │  │
//! │  │  (Axum)   │  │  (JWT)    │  │  decode                  │  │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬─────────────┘  │
//! │        └──────────────┼─────────────────────┘                │
//! │                       ▼                                      │
//! │                ┌─────────────┐                               │
//! │                │   SQLite    │  users, predictions           │
//! │                └─────────────┘                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod activity;
mod config;
mod credentials;
mod db;
mod detection;
mod error;
mod handlers;
mod middleware;
mod models;
mod sessions;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use nids_engine::Detector;
use sqlx::SqlitePool;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::activity::ActivityStats;
use crate::models::User;
use crate::sessions::SessionRegistry;
use crate::views::Views;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nids_server=debug,nids_engine=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("NIDS AI server starting ({})", config.environment);
    tracing::info!("Database: {}", config.database_url);

    if config.uses_dev_secret() {
        if config.is_production() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET not set, using the development key");
    }

    // Load model artifacts
    let detector = Detector::load(&config.model_dir)
        .with_context(|| format!("loading model artifacts from {}", config.model_dir.display()))?;

    // Initialize database pool
    let pool = db::create_pool(&config)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    db::ensure_admin(&pool, &config).await?;

    let state = AppState::new(pool, config.clone(), detector).await?;
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: config::Config,
    pub detector: Arc<Detector>,
    pub views: Arc<Views>,
    pub sessions: Arc<SessionRegistry>,
    pub activity: Arc<ActivityStats>,
}

impl AppState {
    /// Wire collectors and views around a migrated pool and a loaded detector
    pub async fn new(pool: SqlitePool, config: config::Config, detector: Detector) -> anyhow::Result<Self> {
        let existing_users = User::count(&pool).await?;
        let views = Views::new().context("Failed to register templates")?;

        Ok(Self {
            pool,
            config,
            detector: Arc::new(detector),
            views: Arc::new(views),
            sessions: Arc::new(SessionRegistry::new()),
            activity: Arc::new(ActivityStats::new(existing_users)),
        })
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(handlers::pages::home))
        .route("/home", get(handlers::pages::home))
        .route("/about", get(handlers::pages::about))
        .route("/login", get(handlers::auth::login_page).post(handlers::auth::login))
        .route("/register", get(handlers::auth::register_page).post(handlers::auth::register))
        .route("/logout", get(handlers::auth::logout))
        .route("/forgot_password", get(handlers::recovery::forgot_page).post(handlers::recovery::forgot))
        .route("/reset_password", get(handlers::recovery::reset_page).post(handlers::recovery::reset))
        .route("/health", get(handlers::health::check))
        .route("/api/stats", get(handlers::stats::summary))
        .route("/api/v1/auth/login", post(handlers::auth::api_login));

    // Signed-in pages
    let user_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::show).post(handlers::dashboard::submit))
        .route("/profile", get(handlers::profile::show))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth,
        ));

    // Admin console
    let admin_routes = Router::new()
        .route("/admin", get(handlers::admin::list))
        .route("/admin/delete/:id", post(handlers::admin::delete))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin_auth,
        ));

    // JSON API (bearer token)
    let api_routes = Router::new()
        .route("/api/v1/predict", post(handlers::dashboard::api_predict))
        .route("/api/v1/model", get(handlers::dashboard::model_status))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_auth,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .merge(api_routes)
        .fallback(handlers::pages::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::pages::render_error_pages,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
