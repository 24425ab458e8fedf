//! File listing, download, preview and stats handlers.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::{ListQuery, StatsSummary};
use crate::web::dto::{
    ApiResponse, FileEntry, ListParams, PaginatedResponse, PreviewResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Strips control characters to prevent header injection and falls back
/// to an RFC 5987 `filename*` parameter for non-ASCII names.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let encoded = urlencoding::encode(filename);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// GET /api/files - List visible files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<FileEntry>>, ApiError> {
    let defaults = ListQuery::default();
    let query = ListQuery {
        search: params.search,
        sort: params.sort,
        page: params.page.unwrap_or(defaults.page),
        per_page: params.per_page.unwrap_or(defaults.per_page),
    };

    let page = state.host.list_files(&query);
    let entries = page.files.into_iter().map(FileEntry::from).collect();
    Ok(Json(PaginatedResponse::new(
        entries,
        page.page,
        page.per_page,
        page.total_files,
        page.total_pages,
    )))
}

/// GET /api/download/:file_id - Download a file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let (record, path) = state.host.open_download(&file_id)?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::error!("Failed to open stored file: {}", e);
        ApiError::internal("Failed to open file")
    })?;
    let stream = ReaderStream::new(file);

    let response = Response::builder()
        .header(header::CONTENT_TYPE, record.file_type.clone())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.original_name),
        )
        .header(header::CONTENT_LENGTH, record.file_size)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    Ok(response)
}

/// GET /api/preview/:file_id - Inline preview of a text file.
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<PreviewResponse>>, ApiError> {
    let (record, content) = state.host.preview(&file_id)?;
    Ok(Json(ApiResponse::new(PreviewResponse {
        file: record.into(),
        content,
    })))
}

/// GET /api/stats - Usage statistics.
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StatsSummary>>, ApiError> {
    Ok(Json(ApiResponse::new(state.host.stats())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_header_simple_ascii() {
        let result = content_disposition_header("document.txt");
        assert_eq!(result, "attachment; filename=\"document.txt\"");
    }

    #[test]
    fn test_content_disposition_header_non_ascii() {
        let result = content_disposition_header("日本語ファイル.txt");
        assert!(result.starts_with("attachment; filename=\""));
        assert!(result.contains("filename*=UTF-8''"));
        assert!(result.contains("%E6%97%A5%E6%9C%AC%E8%AA%9E"));
    }

    #[test]
    fn test_content_disposition_header_double_quote() {
        let result = content_disposition_header("test\"file.txt");
        assert!(result.contains("filename=\"test_file.txt\""));
        assert!(result.contains("%22"));
    }

    #[test]
    fn test_content_disposition_header_header_injection() {
        let result = content_disposition_header("test\r\nX-Injected: bad.txt");
        assert!(!result.contains('\r'));
        assert!(!result.contains('\n'));
        assert!(result.starts_with("attachment; filename="));
    }
}
