//! On-disk layout for tempstore.
//!
//! This module maps file identifiers to physical paths:
//! - Date-bucketed directories (`<root>/<YYYYMMDD>/<file_id>_<upload_time>`)
//! - A reserved `temp/` tree for in-progress chunked uploads
//! - The metadata snapshot file at `<root>/metadata.json`
//!
//! Date bucketing keeps any single directory's entry count bounded and
//! makes bulk clear operations cheap to target.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use crate::Result;

/// Directory name reserved for chunked-upload sessions.
pub const SESSIONS_DIR: &str = "temp";

/// Filename of the metadata snapshot inside the storage root.
pub const SNAPSHOT_FILE: &str = "metadata.json";

/// Path resolver for the storage tree.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Create a resolver rooted at `root`, creating the root and the
    /// session tree if absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join(SESSIONS_DIR))?;
        Ok(Self { root })
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Date bucket name for an upload timestamp, local time, `YYYYMMDD`.
    pub fn bucket_name(upload_time: i64) -> String {
        let dt = Local
            .timestamp_opt(upload_time, 0)
            .single()
            .unwrap_or_else(Local::now);
        dt.format("%Y%m%d").to_string()
    }

    /// The stored path for a file, a pure function of its inputs.
    ///
    /// Does not touch the filesystem; use [`resolve`](Self::resolve) when
    /// the bucket directory must exist.
    pub fn stored_path(&self, file_id: &str, upload_time: i64) -> PathBuf {
        self.root
            .join(Self::bucket_name(upload_time))
            .join(format!("{file_id}_{upload_time}"))
    }

    /// Resolve the stored path for a file, creating the date-bucket
    /// directory on demand.
    pub fn resolve(&self, file_id: &str, upload_time: i64) -> Result<PathBuf> {
        let path = self.stored_path(file_id, upload_time);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    /// Root of the chunked-upload session tree.
    pub fn sessions_root(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    /// Directory for one chunked-upload session.
    pub fn session_dir(&self, upload_id: &str) -> PathBuf {
        self.sessions_root().join(upload_id)
    }

    /// Path of the metadata snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    /// Enumerate date-bucket directories (8-digit names), skipping the
    /// reserved session tree and anything else.
    pub fn date_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.len() == 8 && name.chars().all(|c| c.is_ascii_digit()) {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }

    /// Total bytes of every regular file under the storage root.
    ///
    /// Walks the tree, so this reflects orphans as well as recorded files.
    pub fn disk_usage(&self) -> u64 {
        fn walk(dir: &Path) -> u64 {
            let mut total = 0;
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        total += walk(&path);
                    } else if let Ok(meta) = entry.metadata() {
                        total += meta.len();
                    }
                }
            }
            total
        }
        walk(&self.root)
    }
}
