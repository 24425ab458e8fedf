//! Response DTOs for the Web API.

use serde::Serialize;

use crate::file::{FileRecord, UploadOutcome, UploadSession};
use crate::units::format_size;

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    /// Response data.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PaginationMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Create a new paginated response.
    pub fn new(data: Vec<T>, page: usize, per_page: usize, total: usize, total_pages: usize) -> Self {
        Self {
            data,
            meta: PaginationMeta {
                page,
                per_page,
                total,
                total_pages,
            },
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: usize,
    /// Items per page.
    pub per_page: usize,
    /// Total number of items.
    pub total: usize,
    /// Total number of pages.
    pub total_pages: usize,
}

// ============================================================================
// File DTOs
// ============================================================================

/// One hosted file, as listed and returned after upload.
#[derive(Debug, Serialize)]
pub struct FileEntry {
    /// Short opaque identifier.
    pub file_id: String,
    /// Display name.
    pub original_name: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Size rendered for display.
    pub file_size_formatted: String,
    /// MIME type.
    pub file_type: String,
    /// Upload time, seconds since epoch.
    pub upload_time: i64,
    /// Expiry time, seconds since epoch.
    pub expire_time: i64,
    /// Number of completed downloads.
    pub download_count: u64,
    /// SHA-256 of the content, lowercase hex.
    pub content_hash: String,
}

impl From<FileRecord> for FileEntry {
    fn from(record: FileRecord) -> Self {
        Self {
            file_size_formatted: format_size(record.file_size),
            file_id: record.file_id,
            original_name: record.original_name,
            file_size: record.file_size,
            file_type: record.file_type,
            upload_time: record.upload_time,
            expire_time: record.expire_time,
            download_count: record.download_count,
            content_hash: record.content_hash,
        }
    }
}

/// Per-file result in a batch upload response.
#[derive(Debug, Serialize)]
pub struct UploadResultEntry {
    /// Name as submitted.
    pub name: String,
    /// Whether this file was stored.
    pub success: bool,
    /// The stored file, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileEntry>,
    /// Failure reason, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<UploadOutcome> for UploadResultEntry {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome.outcome {
            Ok(record) => Self {
                name: outcome.name,
                success: true,
                file: Some(record.into()),
                error: None,
            },
            Err(e) => Self {
                name: outcome.name,
                success: false,
                file: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// State of a chunked upload session.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    /// Session identifier.
    pub upload_id: String,
    /// Target filename.
    pub filename: String,
    /// Declared total size in bytes.
    pub file_size: u64,
    /// Chunk size in bytes.
    pub chunk_size: u64,
    /// Expected chunk count.
    pub total_chunks: u32,
    /// Received chunk indexes.
    pub uploaded_chunks: Vec<u32>,
    /// Chunk indexes still missing.
    pub missing_chunks: Vec<u32>,
    /// Completion in whole percent.
    pub progress: u32,
    /// Whether every chunk has arrived.
    pub complete: bool,
}

impl From<UploadSession> for SessionStatus {
    fn from(session: UploadSession) -> Self {
        Self {
            missing_chunks: session.missing_chunks(),
            progress: session.progress(),
            complete: session.is_complete(),
            upload_id: session.upload_id,
            filename: session.filename,
            file_size: session.file_size,
            chunk_size: session.chunk_size,
            total_chunks: session.total_chunks,
            uploaded_chunks: session.uploaded_chunks,
        }
    }
}

/// Inline text preview.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    /// The file being previewed.
    pub file: FileEntry,
    /// Decoded text content, truncated to the preview limit.
    pub content: String,
}

// ============================================================================
// Admin DTOs
// ============================================================================

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Opaque bearer token.
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Batch delete response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Ids that were deleted.
    pub deleted: Vec<String>,
    /// Ids that were unknown.
    pub missing: Vec<String>,
}

/// Clear-all response.
#[derive(Debug, Serialize)]
pub struct ClearAllResponse {
    /// Number of records removed.
    pub removed: usize,
}

/// Plain message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}
