//! Router configuration for the Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{admin, files, upload, AppState};
use super::middleware::{admin_sessions, body_limit, BODY_LIMIT_MARGIN};
use crate::config::MAX_FILE_SIZE_CEILING;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let upload_routes = Router::new()
        .route("/", post(upload::upload_files))
        .route("/init", post(upload::init_chunked))
        .route("/chunk", post(upload::upload_chunk))
        .route("/complete", post(upload::complete_chunked))
        .route("/status/:upload_id", get(upload::chunk_status));

    let admin_routes = Router::new()
        .route("/login", post(admin::login))
        .route("/logout", post(admin::logout))
        .route("/delete", post(admin::delete_files))
        .route("/clear-all", post(admin::clear_all));

    let api_routes = Router::new()
        .nest("/upload", upload_routes)
        .nest("/admin", admin_routes)
        .route("/files", get(files::list_files))
        .route("/download/:file_id", get(files::download_file))
        .route("/preview/:file_id", get(files::preview_file))
        .route("/stats", get(files::stats))
        .route("/config", get(admin::get_config).post(admin::update_config));

    let sessions_for_middleware = app_state.sessions.clone();
    let config_for_limit = app_state.config.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(move |req, next| {
                    let sessions = sessions_for_middleware.clone();
                    admin_sessions(sessions, req, next)
                }))
                .layer(middleware::from_fn(move |req, next| {
                    let config = config_for_limit.clone();
                    body_limit(config, req, next)
                })),
        )
        // Absolute backstop for the extractors; the effective limit is
        // enforced per request by `body_limit`.
        .layer(DefaultBodyLimit::max(
            MAX_FILE_SIZE_CEILING as usize + BODY_LIMIT_MARGIN,
        ))
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
