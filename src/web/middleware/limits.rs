//! Request body limit that tracks the runtime configuration.

use axum::{
    body::Body,
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::Limited;
use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::web::error::{ApiError, ErrorCode};

/// Headroom on top of the configured per-file ceiling for multipart
/// framing and batch uploads.
pub const BODY_LIMIT_MARGIN: usize = 100 * 1024 * 1024;

/// Cap request bodies at the per-file ceiling plus margin.
///
/// The ceiling is read on every request, so an admin config update
/// takes effect without a restart. An oversized `Content-Length` is
/// rejected up front; a body streamed without one is cut off at the
/// same limit while it is read.
pub async fn body_limit(
    config: Arc<RwLock<Config>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let limit = {
        let cfg = config.read().unwrap_or_else(|e| e.into_inner());
        cfg.max_file_size as usize + BODY_LIMIT_MARGIN
    };

    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return ApiError::new(ErrorCode::PayloadTooLarge, "Request body too large")
            .into_response();
    }

    let request = request.map(|body| Body::new(Limited::new(body, limit)));
    next.run(request).await
}
