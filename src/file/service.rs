//! File hosting service.
//!
//! [`FileHost`] owns the metadata store, the on-disk layout and the
//! chunk assembler, and exposes the operations the web layer calls.
//! The store sits behind a `std::sync::RwLock`; every critical section
//! is short and never held across an `.await`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{Config, MAX_EXPIRE_HOURS, MIN_EXPIRE_HOURS_ADMIN, MIN_EXPIRE_HOURS_ANON};
use crate::file::chunks::{ChunkAssembler, UploadSession};
use crate::file::paths::StoragePaths;
use crate::file::quota;
use crate::file::record::{generate_file_id, guess_file_type, sanitize_filename, FileRecord};
use crate::file::stats::{summarize, StatsSummary};
use crate::file::store::{FilePage, ListQuery, MetadataStore};
use crate::{Result, TempstoreError};

/// Default chunk size for chunked uploads (1 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// How long a tombstone outlives its expiry before snapshot pruning.
const TOMBSTONE_RETAIN_SECS: i64 = 24 * 3600;

/// One file in a batch upload.
#[derive(Debug)]
pub struct IncomingFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Per-file result of a batch upload. A batch never fails as a whole
/// because one member was oversized.
#[derive(Debug)]
pub struct UploadOutcome {
    pub name: String,
    pub outcome: Result<FileRecord>,
}

/// Result of a batch delete.
#[derive(Debug, Default)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub missing: Vec<String>,
}

/// The service core: metadata, storage layout and chunk sessions.
pub struct FileHost {
    config: Arc<RwLock<Config>>,
    store: RwLock<MetadataStore>,
    paths: StoragePaths,
    chunks: ChunkAssembler,
    total_uploads: AtomicU64,
}

fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Clamp a requested expiry to the allowed window for this caller.
fn clamp_expire_hours(requested: Option<u32>, default: u32, is_admin: bool) -> u32 {
    let floor = if is_admin {
        MIN_EXPIRE_HOURS_ADMIN
    } else {
        MIN_EXPIRE_HOURS_ANON
    };
    requested.unwrap_or(default).clamp(floor, MAX_EXPIRE_HOURS)
}

impl FileHost {
    /// Open the storage root and restore the metadata snapshot if one
    /// exists. A corrupt snapshot is logged and discarded; files left
    /// on disk without records are reclaimed by `clear_all` or stay
    /// until a manual wipe.
    pub fn new(config: Arc<RwLock<Config>>) -> Result<Self> {
        let upload_dir = {
            let cfg = config.read().unwrap_or_else(|e| e.into_inner());
            cfg.upload_dir.clone()
        };
        let paths = StoragePaths::new(upload_dir)?;

        let snapshot = paths.snapshot_path();
        let store = if snapshot.exists() {
            match MetadataStore::load(&snapshot) {
                Ok(store) => {
                    info!(records = store.len(), "restored metadata snapshot");
                    store
                }
                Err(e) => {
                    error!(error = %e, "metadata snapshot unreadable, starting empty");
                    MetadataStore::new()
                }
            }
        } else {
            MetadataStore::new()
        };

        let total_uploads = AtomicU64::new(store.len() as u64);
        let chunks = ChunkAssembler::new(paths.clone());

        Ok(Self {
            config,
            store: RwLock::new(store),
            paths,
            chunks,
            total_uploads,
        })
    }

    fn config_snapshot(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Store one batch of whole files. Each file succeeds or fails on
    /// its own; only an oversized batch is rejected outright.
    pub fn upload_batch(
        &self,
        files: Vec<IncomingFile>,
        expire_hours: Option<u32>,
        is_admin: bool,
    ) -> Result<Vec<UploadOutcome>> {
        let cfg = self.config_snapshot();

        if files.is_empty() {
            return Err(TempstoreError::Validation("no files in upload".into()));
        }
        if files.len() > cfg.max_files_per_upload {
            return Err(TempstoreError::Validation(format!(
                "at most {} files per upload",
                cfg.max_files_per_upload
            )));
        }

        let hours = clamp_expire_hours(expire_hours, cfg.file_expire_hours, is_admin);
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name.clone();
            let outcome = self.store_whole_file(file, hours, &cfg);
            outcomes.push(UploadOutcome { name, outcome });
        }
        Ok(outcomes)
    }

    fn store_whole_file(
        &self,
        file: IncomingFile,
        expire_hours: u32,
        cfg: &Config,
    ) -> Result<FileRecord> {
        if file.name.trim().is_empty() {
            return Err(TempstoreError::Validation("missing filename".into()));
        }
        let size = file.data.len() as u64;
        if size == 0 {
            return Err(TempstoreError::Validation("empty file".into()));
        }
        if size > cfg.max_file_size {
            return Err(TempstoreError::Validation(format!(
                "file exceeds size limit of {} bytes",
                cfg.max_file_size
            )));
        }

        let now = now_ts();
        let safe_name = sanitize_filename(&file.name, &cfg.blocked_extensions, now);
        let file_id = generate_file_id();
        let path = self.paths.resolve(&file_id, now)?;
        std::fs::write(&path, &file.data)?;

        let content_hash = {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(&file.data);
            format!("{:x}", hasher.finalize())
        };

        let record = FileRecord {
            file_id: file_id.clone(),
            original_name: safe_name,
            file_size: size,
            file_type: guess_file_type(&file.name),
            upload_time: now,
            expire_time: now + i64::from(expire_hours) * 3600,
            content_hash,
            download_count: 0,
            is_deleted: false,
        };

        self.commit_record(record.clone(), cfg.max_storage);
        info!(file_id, size, name = %record.original_name, "stored file");
        Ok(record)
    }

    /// Insert the record and enforce the storage ceiling in one write
    /// lock, so no reader ever observes usage above the ceiling with
    /// the new file invisible.
    fn commit_record(&self, record: FileRecord, max_storage: u64) {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store.put(record);
        quota::enforce_ceiling(&mut store, &self.paths, max_storage);
        self.total_uploads.fetch_add(1, Ordering::Relaxed);
    }

    /// Begin or resume a chunked upload.
    pub fn init_chunked(
        &self,
        filename: &str,
        file_size: u64,
        chunk_size: Option<u64>,
    ) -> Result<UploadSession> {
        let cfg = self.config_snapshot();
        if file_size > cfg.max_file_size {
            return Err(TempstoreError::Validation(format!(
                "file exceeds size limit of {} bytes",
                cfg.max_file_size
            )));
        }
        let chunk_size = chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        self.chunks.init(
            generate_file_id(),
            filename,
            file_size,
            chunk_size,
            now_ts(),
        )
    }

    /// Store one chunk.
    pub fn put_chunk(&self, upload_id: &str, index: u32, data: &[u8]) -> Result<UploadSession> {
        self.chunks.put_chunk(upload_id, index, data)
    }

    /// Progress of a chunked upload.
    pub fn chunk_status(&self, upload_id: &str) -> Result<UploadSession> {
        self.chunks.status(upload_id)
    }

    /// Assemble a completed chunked upload into a hosted file.
    pub fn complete_chunked(
        &self,
        upload_id: &str,
        expire_hours: Option<u32>,
        is_admin: bool,
    ) -> Result<FileRecord> {
        let cfg = self.config_snapshot();
        let session = self.chunks.status(upload_id)?;

        let now = now_ts();
        let file_id = generate_file_id();
        let path = self.paths.resolve(&file_id, now)?;
        let assembled = self.chunks.assemble(upload_id, &path)?;

        if assembled.size > cfg.max_file_size {
            // Chunks added up past the declared size; drop the result
            let _ = std::fs::remove_file(&path);
            return Err(TempstoreError::Validation(format!(
                "file exceeds size limit of {} bytes",
                cfg.max_file_size
            )));
        }

        let hours = clamp_expire_hours(expire_hours, cfg.file_expire_hours, is_admin);
        let record = FileRecord {
            file_id: file_id.clone(),
            original_name: sanitize_filename(&session.filename, &cfg.blocked_extensions, now),
            file_size: assembled.size,
            file_type: assembled.file_type,
            upload_time: now,
            expire_time: now + i64::from(hours) * 3600,
            content_hash: assembled.content_hash,
            download_count: 0,
            is_deleted: false,
        };

        self.commit_record(record.clone(), cfg.max_storage);
        info!(file_id, upload_id, size = record.file_size, "stored chunked upload");
        Ok(record)
    }

    /// List visible files.
    pub fn list_files(&self, query: &ListQuery) -> FilePage {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.list(query, now_ts())
    }

    /// Look up a visible record without side effects.
    pub fn get_file(&self, file_id: &str) -> Result<FileRecord> {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        visible_record(&store, file_id, now_ts()).cloned()
    }

    /// Resolve a download: bump the counter and return the record and
    /// the path to stream from.
    pub fn open_download(&self, file_id: &str) -> Result<(FileRecord, PathBuf)> {
        let record = {
            let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
            let now = now_ts();
            visible_record(&store, file_id, now)?;
            let record = store
                .get_mut(file_id)
                .ok_or_else(|| TempstoreError::NotFound(format!("file {file_id}")))?;
            record.download_count += 1;
            record.clone()
        };

        let path = self.paths.stored_path(&record.file_id, record.upload_time);
        if !path.exists() {
            warn!(file_id, path = %path.display(), "record present but file missing");
            return Err(TempstoreError::NotFound(format!("file {file_id}")));
        }
        Ok((record, path))
    }

    /// Read a text file's content for inline preview.
    ///
    /// Only textual types are previewable, and only the first
    /// `PREVIEW_LIMIT` bytes are returned.
    pub fn preview(&self, file_id: &str) -> Result<(FileRecord, String)> {
        const PREVIEW_LIMIT: u64 = 1024 * 1024;

        let record = self.get_file(file_id)?;
        let previewable = record.file_type.starts_with("text/")
            || record.file_type == "application/json"
            || record.file_type == "application/javascript";
        if !previewable {
            return Err(TempstoreError::Validation(format!(
                "type {} is not previewable",
                record.file_type
            )));
        }

        let path = self.paths.stored_path(&record.file_id, record.upload_time);
        let mut buf = Vec::new();
        {
            use std::io::Read;
            let file = std::fs::File::open(&path)
                .map_err(|_| TempstoreError::NotFound(format!("file {file_id}")))?;
            file.take(PREVIEW_LIMIT).read_to_end(&mut buf)?;
        }
        let text = String::from_utf8(buf)
            .map_err(|_| TempstoreError::Validation("file is not valid UTF-8".into()))?;
        Ok((record, text))
    }

    /// Delete a set of files by id.
    pub fn delete_batch(&self, file_ids: &[String]) -> Result<DeleteOutcome> {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let mut outcome = DeleteOutcome::default();
        for file_id in file_ids {
            match quota::delete_record(&mut store, &self.paths, file_id) {
                Ok(true) => outcome.deleted.push(file_id.clone()),
                Ok(false) => outcome.missing.push(file_id.clone()),
                Err(e) => {
                    warn!(file_id, error = %e, "batch delete skipped file");
                    outcome.missing.push(file_id.clone());
                }
            }
        }
        info!(
            deleted = outcome.deleted.len(),
            missing = outcome.missing.len(),
            "batch delete"
        );
        Ok(outcome)
    }

    /// Wipe everything: every date directory, every chunk session and
    /// the whole record table. Orphaned files with no record go too.
    pub fn clear_all(&self) -> Result<usize> {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let removed = store.len();
        store.clear();

        for dir in self.paths.date_dirs()? {
            std::fs::remove_dir_all(&dir)?;
        }
        match std::fs::remove_dir_all(self.paths.sessions_root()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(self.paths.sessions_root())?;

        store.save(&self.paths.snapshot_path())?;
        warn!(removed, "cleared all files");
        Ok(removed)
    }

    /// Current usage statistics.
    pub fn stats(&self) -> StatsSummary {
        let cfg = self.config_snapshot();
        let disk = self.paths.disk_usage();
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        summarize(
            store.records(),
            self.total_uploads.load(Ordering::Relaxed),
            store.total_bytes(),
            disk,
            cfg.max_storage,
            now_ts(),
        )
    }

    /// Persist the record table, pruning long-dead tombstones first.
    pub fn save_snapshot(&self) -> Result<()> {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let pruned = store.prune_tombstones(now_ts(), TOMBSTONE_RETAIN_SECS);
        if pruned > 0 {
            info!(pruned, "pruned tombstones");
        }
        store.save(&self.paths.snapshot_path())
    }

    /// Remove expired files and re-check the storage ceiling.
    pub fn sweep_expired(&self) -> usize {
        let max_storage = self.config_snapshot().max_storage;
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let removed = quota::sweep_expired(&mut store, &self.paths, now_ts());
        quota::enforce_ceiling(&mut store, &self.paths, max_storage);
        removed
    }

    /// Remove chunk sessions idle past the configured window.
    pub fn sweep_stale_sessions(&self) -> usize {
        let idle = self.config_snapshot().chunk_idle_timeout;
        self.chunks.sweep_stale(idle)
    }
}

fn visible_record<'a>(
    store: &'a MetadataStore,
    file_id: &str,
    now: i64,
) -> Result<&'a FileRecord> {
    let record = store
        .get(file_id)
        .ok_or_else(|| TempstoreError::NotFound(format!("file {file_id}")))?;
    if record.is_deleted {
        return Err(TempstoreError::NotFound(format!("file {file_id} (deleted)")));
    }
    if record.expire_time <= now {
        return Err(TempstoreError::NotFound(format!("file {file_id} (expired)")));
    }
    Ok(record)
}
