//! Admin handlers: login, config and bulk deletion.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::config::{ConfigUpdate, PublicConfig};
use crate::web::dto::{
    ApiResponse, ClearAllResponse, DeleteRequest, DeleteResponse, LoginRequest, LoginResponse,
    MessageResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AdminAuth, OptionalAdmin};

/// POST /api/admin/login - Exchange the admin password for a token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let expected = {
        let config = state.config.read().unwrap_or_else(|e| e.into_inner());
        config.admin_password.clone()
    };

    // The submitted password is never logged, on success or failure
    if req.password != expected {
        tracing::warn!("admin login rejected");
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let token = state.sessions.issue();
    tracing::info!("admin login accepted");
    Ok(Json(ApiResponse::new(LoginResponse {
        token,
        expires_in: state.sessions.timeout_secs(),
    })))
}

/// POST /api/admin/logout - Revoke the caller's token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AdminAuth(token): AdminAuth,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.sessions.revoke(&token);
    Ok(Json(ApiResponse::new(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

/// GET /api/config - The runtime-visible configuration.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<PublicConfig>>, ApiError> {
    let config = state.config_snapshot();
    Ok(Json(ApiResponse::new(config.public())))
}

/// POST /api/config - Update the runtime-mutable configuration.
///
/// Anyone may call this; each field is clamped to the caller's allowed
/// range, and only an authenticated admin gets the wider expiry floor.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(is_admin): OptionalAdmin,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<ApiResponse<PublicConfig>>, ApiError> {
    let public = {
        let mut config = state.config.write().unwrap_or_else(|e| e.into_inner());
        config.apply_update(&update, is_admin);
        config.public()
    };
    tracing::info!(is_admin, "configuration updated");
    Ok(Json(ApiResponse::new(public)))
}

/// POST /api/admin/delete - Delete a batch of files by id.
pub async fn delete_files(
    State(state): State<Arc<AppState>>,
    AdminAuth(_token): AdminAuth,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    if req.file_ids.is_empty() {
        return Err(ApiError::bad_request("No file ids provided"));
    }
    let outcome = state.host.delete_batch(&req.file_ids)?;
    Ok(Json(ApiResponse::new(DeleteResponse {
        deleted: outcome.deleted,
        missing: outcome.missing,
    })))
}

/// POST /api/admin/clear-all - Wipe every hosted file.
pub async fn clear_all(
    State(state): State<Arc<AppState>>,
    AdminAuth(_token): AdminAuth,
) -> Result<Json<ApiResponse<ClearAllResponse>>, ApiError> {
    let removed = state.host.clear_all()?;
    Ok(Json(ApiResponse::new(ClearAllResponse { removed })))
}
