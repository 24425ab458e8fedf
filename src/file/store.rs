//! In-memory metadata store with JSON snapshot persistence.
//!
//! The store is the single source of truth for file records; the
//! filesystem is a derived cache that must agree with every non-deleted
//! record. Callers serialize access with a lock around the whole store
//! (see [`crate::file::service::FileHost`]).

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::file::record::FileRecord;
use crate::{Result, TempstoreError};

/// Default page size for listings.
pub const DEFAULT_PER_PAGE: usize = 50;

/// Sort order for file listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Display name, ascending.
    Name,
    /// File size, descending (largest first).
    Size,
    /// Upload time, descending (newest first). The default.
    #[default]
    UploadTime,
}

/// Listing parameters: filter, sort and 1-based pagination.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Case-insensitive substring match on the display name.
    pub search: Option<String>,
    /// Sort order.
    pub sort: SortKey,
    /// 1-based page index.
    pub page: usize,
    /// Page size.
    pub per_page: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: SortKey::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct FilePage {
    /// Records on this page.
    pub files: Vec<FileRecord>,
    /// 1-based page index.
    pub page: usize,
    /// Page size.
    pub per_page: usize,
    /// Total matching records across all pages.
    pub total_files: usize,
    /// Total number of pages.
    pub total_pages: usize,
}

/// In-memory table of file records, keyed by `file_id`.
#[derive(Debug, Default, PartialEq)]
pub struct MetadataStore {
    records: HashMap<String, FileRecord>,
}

impl MetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record by `file_id`.
    ///
    /// Identifiers carry enough entropy that collisions are treated as
    /// impossible rather than handled.
    pub fn put(&mut self, record: FileRecord) {
        self.records.insert(record.file_id.clone(), record);
    }

    /// Look up a record by id.
    pub fn get(&self, file_id: &str) -> Option<&FileRecord> {
        self.records.get(file_id)
    }

    /// Mutable lookup, for download counting.
    pub fn get_mut(&mut self, file_id: &str) -> Option<&mut FileRecord> {
        self.records.get_mut(file_id)
    }

    /// Whether a record exists for this id (tombstoned or not).
    pub fn contains(&self, file_id: &str) -> bool {
        self.records.contains_key(file_id)
    }

    /// Tombstone a record. The record stays in the table for reporting.
    ///
    /// Idempotent; returns `false` only when the id is unknown.
    pub fn mark_deleted(&mut self, file_id: &str) -> bool {
        match self.records.get_mut(file_id) {
            Some(record) => {
                record.is_deleted = true;
                true
            }
            None => false,
        }
    }

    /// Number of records, tombstones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over every record, tombstones included.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Iterate over visible records: not tombstoned, not expired at `now`.
    pub fn active(&self, now: i64) -> impl Iterator<Item = &FileRecord> {
        self.records.values().filter(move |r| r.is_active(now))
    }

    /// Total bytes across non-deleted records.
    ///
    /// Expired-but-unswept records still count; they occupy disk until
    /// the next sweep removes them.
    pub fn total_bytes(&self) -> u64 {
        self.records
            .values()
            .filter(|r| !r.is_deleted)
            .map(|r| r.file_size)
            .sum()
    }

    /// List visible records with filtering, sorting and pagination.
    pub fn list(&self, query: &ListQuery, now: i64) -> FilePage {
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        let mut files: Vec<FileRecord> = self
            .active(now)
            .filter(|r| match &search {
                Some(term) => r.original_name.to_lowercase().contains(term),
                None => true,
            })
            .cloned()
            .collect();

        match query.sort {
            SortKey::Name => files.sort_by(|a, b| a.original_name.cmp(&b.original_name)),
            SortKey::Size => files.sort_by(|a, b| b.file_size.cmp(&a.file_size)),
            SortKey::UploadTime => files.sort_by(|a, b| b.upload_time.cmp(&a.upload_time)),
        }

        let per_page = query.per_page.max(1);
        let page = query.page.max(1);
        let total_files = files.len();
        let total_pages = total_files.div_ceil(per_page);

        let start = (page - 1).saturating_mul(per_page).min(total_files);
        let end = start.saturating_add(per_page).min(total_files);
        let files = files[start..end].to_vec();

        FilePage {
            files,
            page,
            per_page,
            total_files,
            total_pages,
        }
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Prune tombstoned records whose expiry lies more than `retain_secs`
    /// in the past. Bounds snapshot growth while keeping recent
    /// tombstones visible to stats.
    pub fn prune_tombstones(&mut self, now: i64, retain_secs: i64) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| !r.is_deleted || r.expire_time + retain_secs > now);
        before - self.records.len()
    }

    /// Serialize the full table to the snapshot file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| TempstoreError::Persistence(format!("snapshot encode: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| TempstoreError::Persistence(format!("snapshot write: {e}")))?;
        Ok(())
    }

    /// Load a table from a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| TempstoreError::Persistence(format!("snapshot read: {e}")))?;
        let records: HashMap<String, FileRecord> = serde_json::from_str(&json)
            .map_err(|e| TempstoreError::Persistence(format!("snapshot decode: {e}")))?;
        Ok(Self { records })
    }
}
