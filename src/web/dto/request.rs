//! Request DTOs for the Web API.

use serde::Deserialize;

use crate::file::SortKey;

/// Query parameters for the file listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Case-insensitive substring filter on the display name.
    pub search: Option<String>,
    /// Sort order: `name`, `size` or `upload_time`.
    #[serde(default)]
    pub sort: SortKey,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Items per page.
    pub per_page: Option<usize>,
}

/// Body for starting a chunked upload.
#[derive(Debug, Deserialize)]
pub struct InitChunkRequest {
    /// Target filename.
    pub filename: String,
    /// Declared total size in bytes.
    pub file_size: u64,
    /// Chunk size in bytes, defaulting to 1 MiB.
    pub chunk_size: Option<u64>,
}

/// Body for completing a chunked upload.
#[derive(Debug, Deserialize)]
pub struct CompleteChunkRequest {
    /// Session identifier from init.
    pub upload_id: String,
    /// Requested expiry in hours; clamped to the caller's allowed range.
    pub expire_hours: Option<u32>,
}

/// Admin login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Admin password.
    pub password: String,
}

/// Batch delete body.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    /// Ids of the files to delete.
    pub file_ids: Vec<String>,
}
