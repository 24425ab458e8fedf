//! Upload handlers: whole-file batches and chunked sessions.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::sync::Arc;

use crate::file::IncomingFile;
use crate::web::dto::{
    ApiResponse, CompleteChunkRequest, FileEntry, InitChunkRequest, SessionStatus,
    UploadResultEntry,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::OptionalAdmin;

/// POST /api/upload - Store a batch of whole files.
///
/// Request body: multipart/form-data with one or more "files" parts and
/// an optional "expire_hours" field.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(is_admin): OptionalAdmin,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Vec<UploadResultEntry>>>, ApiError> {
    let mut files: Vec<IncomingFile> = Vec::new();
    let mut expire_hours: Option<u32> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "files" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ApiError::bad_request("File part without filename"))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to read file content: {}", e);
                        ApiError::bad_request("Failed to read file")
                    })?
                    .to_vec();
                files.push(IncomingFile {
                    name: filename,
                    data,
                });
            }
            "expire_hours" => {
                let text = field.text().await.map_err(|e| {
                    tracing::error!("Failed to read expire_hours: {}", e);
                    ApiError::bad_request("Invalid expire_hours")
                })?;
                expire_hours = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("Invalid expire_hours"))?,
                );
            }
            _ => {}
        }
    }

    let outcomes = state.host.upload_batch(files, expire_hours, is_admin)?;
    let entries = outcomes.into_iter().map(UploadResultEntry::from).collect();
    Ok(Json(ApiResponse::new(entries)))
}

/// POST /api/upload/init - Start or resume a chunked upload.
pub async fn init_chunked(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitChunkRequest>,
) -> Result<Json<ApiResponse<SessionStatus>>, ApiError> {
    let session = state
        .host
        .init_chunked(&req.filename, req.file_size, req.chunk_size)?;
    Ok(Json(ApiResponse::new(session.into())))
}

/// POST /api/upload/chunk - Store one chunk.
///
/// Request body: multipart/form-data with "upload_id", "chunk_index"
/// and a "chunk" file part.
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<SessionStatus>>, ApiError> {
    let mut upload_id: Option<String> = None;
    let mut chunk_index: Option<u32> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "upload_id" => {
                upload_id = Some(field.text().await.map_err(|e| {
                    tracing::error!("Failed to read upload_id: {}", e);
                    ApiError::bad_request("Invalid upload_id")
                })?);
            }
            "chunk_index" => {
                let text = field.text().await.map_err(|e| {
                    tracing::error!("Failed to read chunk_index: {}", e);
                    ApiError::bad_request("Invalid chunk_index")
                })?;
                chunk_index = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("Invalid chunk_index"))?,
                );
            }
            "chunk" => {
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            tracing::error!("Failed to read chunk content: {}", e);
                            ApiError::bad_request("Failed to read chunk")
                        })?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let upload_id = upload_id.ok_or_else(|| ApiError::bad_request("No upload_id provided"))?;
    let chunk_index =
        chunk_index.ok_or_else(|| ApiError::bad_request("No chunk_index provided"))?;
    let data = data.ok_or_else(|| ApiError::bad_request("No chunk content"))?;

    let session = state.host.put_chunk(&upload_id, chunk_index, &data)?;
    Ok(Json(ApiResponse::new(session.into())))
}

/// POST /api/upload/complete - Assemble a finished chunked upload.
pub async fn complete_chunked(
    State(state): State<Arc<AppState>>,
    OptionalAdmin(is_admin): OptionalAdmin,
    Json(req): Json<CompleteChunkRequest>,
) -> Result<Json<ApiResponse<FileEntry>>, ApiError> {
    let record = state
        .host
        .complete_chunked(&req.upload_id, req.expire_hours, is_admin)?;
    Ok(Json(ApiResponse::new(record.into())))
}

/// GET /api/upload/status/:upload_id - Progress of a chunked upload.
pub async fn chunk_status(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<String>,
) -> Result<Json<ApiResponse<SessionStatus>>, ApiError> {
    let session = state.host.chunk_status(&upload_id)?;
    Ok(Json(ApiResponse::new(session.into())))
}
