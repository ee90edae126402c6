pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{load_env_file, ServerConfig};
use crate::db::Database;
use crate::services::automator::Automator;

/// Multipart framing on top of the file itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub automator: Arc<Automator>,
    pub config: Arc<ServerConfig>,
}

/// Install the `RUST_LOG`-driven subscriber (default `info`).
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the full router with public and protected routes
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    let protected_routes = Router::new()
        // Account routes
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/logout", post(routes::auth::logout))
        // Topic routes
        .route(
            "/api/topics",
            get(routes::topics::list)
                .post(routes::topics::create)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/topics/:id", get(routes::topics::get))
        .route("/api/topics/:id/schedule", get(routes::topics::schedule))
        .route("/api/topics/:id/quizzes/:quiz/grade", post(routes::topics::grade))
        // Progress routes
        .route("/api/progress/:topic_id", get(routes::progress::get))
        .route("/api/progress/:topic_id/module", post(routes::progress::complete_module))
        .route("/api/progress/:topic_id/quiz", post(routes::progress::record_quiz))
        .route(
            "/api/progress/:topic_id/flashcards",
            post(routes::progress::review_flashcards),
        )
        .route("/api/progress/:topic_id/session", post(routes::progress::create_session))
        // Dashboard
        .route("/api/dashboard", get(routes::dashboard::get))
        // Generated files
        .route("/api/files/:topic_id/:filename", get(routes::files::view))
        .route(
            "/api/files/:topic_id/:filename/download",
            get(routes::files::download),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    load_env_file(None)?;
    init_tracing();

    let config = ServerConfig::from_env()?;
    config.pipeline.ensure_dirs()?;
    std::fs::create_dir_all(&config.upload_folder)?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let automator = Automator::from_config(config.pipeline.clone())?;
    tracing::info!(
        "Pipeline ready: model {}, {} concurrent generations",
        config.pipeline.openai_model,
        config.pipeline.generation_concurrency
    );

    let addr = config.bind_addr();
    let state = AppState {
        db: Arc::new(db),
        automator: Arc::new(automator),
        config: Arc::new(config),
    };

    let app = build_router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
