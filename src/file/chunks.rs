//! Chunked upload sessions.
//!
//! Each session lives in its own directory under the storage root's
//! `temp/` tree: one `chunk_<index>` file per received chunk plus an
//! `upload_info.json` describing the session. Sessions survive a
//! restart, and an init for the same (filename, size) pair resumes the
//! existing session instead of starting over.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::file::paths::StoragePaths;
use crate::file::record::guess_file_type;
use crate::{Result, TempstoreError};

/// Session descriptor, persisted as `upload_info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub upload_id: String,
    pub filename: String,
    pub file_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u32,
    /// Received chunk indexes, kept sorted and deduplicated.
    pub uploaded_chunks: Vec<u32>,
    pub created_at: i64,
}

impl UploadSession {
    pub fn is_complete(&self) -> bool {
        self.uploaded_chunks.len() as u32 == self.total_chunks
    }

    /// Indexes not yet received, ascending.
    pub fn missing_chunks(&self) -> Vec<u32> {
        (0..self.total_chunks)
            .filter(|i| self.uploaded_chunks.binary_search(i).is_err())
            .collect()
    }

    /// Completion percentage in whole percent.
    pub fn progress(&self) -> u32 {
        if self.total_chunks == 0 {
            return 100;
        }
        (self.uploaded_chunks.len() as u64 * 100 / self.total_chunks as u64) as u32
    }
}

/// Result of assembling a completed session.
#[derive(Debug)]
pub struct AssembledFile {
    pub size: u64,
    pub content_hash: String,
    pub file_type: String,
}

const INFO_FILE: &str = "upload_info.json";

/// Manages chunk session directories under the storage root.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    paths: StoragePaths,
}

impl ChunkAssembler {
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Start a session, or resume the existing one for the same
    /// (filename, size) pair.
    pub fn init(
        &self,
        upload_id: String,
        filename: &str,
        file_size: u64,
        chunk_size: u64,
        now: i64,
    ) -> Result<UploadSession> {
        if file_size == 0 {
            return Err(TempstoreError::Validation("file size must not be zero".into()));
        }
        if chunk_size == 0 {
            return Err(TempstoreError::Validation("chunk size must not be zero".into()));
        }

        if let Some(existing) = self.find_resumable(filename, file_size)? {
            info!(
                upload_id = %existing.upload_id,
                filename,
                received = existing.uploaded_chunks.len(),
                total = existing.total_chunks,
                "resuming chunked upload"
            );
            return Ok(existing);
        }

        let total_chunks = file_size.div_ceil(chunk_size);
        let total_chunks = u32::try_from(total_chunks)
            .map_err(|_| TempstoreError::Validation("too many chunks".into()))?;

        let session = UploadSession {
            upload_id,
            filename: filename.to_string(),
            file_size,
            chunk_size,
            total_chunks,
            uploaded_chunks: Vec::new(),
            created_at: now,
        };

        let dir = self.paths.session_dir(&session.upload_id);
        std::fs::create_dir_all(&dir)?;
        self.write_info(&dir, &session)?;

        debug!(upload_id = %session.upload_id, total_chunks, "chunked upload started");
        Ok(session)
    }

    /// Store one chunk and return the updated session.
    pub fn put_chunk(&self, upload_id: &str, index: u32, data: &[u8]) -> Result<UploadSession> {
        let dir = self.paths.session_dir(upload_id);
        let mut session = self.read_info(&dir, upload_id)?;

        if index >= session.total_chunks {
            return Err(TempstoreError::Validation(format!(
                "chunk index {index} out of range (0..{})",
                session.total_chunks
            )));
        }

        std::fs::write(dir.join(format!("chunk_{index}")), data)?;

        if let Err(pos) = session.uploaded_chunks.binary_search(&index) {
            session.uploaded_chunks.insert(pos, index);
            self.write_info(&dir, &session)?;
        }
        Ok(session)
    }

    /// Current state of a session.
    pub fn status(&self, upload_id: &str) -> Result<UploadSession> {
        let dir = self.paths.session_dir(upload_id);
        self.read_info(&dir, upload_id)
    }

    /// Concatenate all chunks into `dest`, hash the result, and remove
    /// the session directory.
    pub fn assemble(&self, upload_id: &str, dest: &Path) -> Result<AssembledFile> {
        let dir = self.paths.session_dir(upload_id);
        let session = self.read_info(&dir, upload_id)?;

        if !session.is_complete() {
            return Err(TempstoreError::Incomplete {
                missing: session.missing_chunks(),
            });
        }

        let mut size = 0u64;
        {
            let mut out = BufWriter::new(File::create(dest)?);
            for index in 0..session.total_chunks {
                let chunk = std::fs::read(dir.join(format!("chunk_{index}")))?;
                size += chunk.len() as u64;
                out.write_all(&chunk)?;
            }
            out.flush()?;
        }

        let content_hash = hash_file(dest)?;
        let file_type = guess_file_type(&session.filename);

        if let Err(e) = std::fs::remove_dir_all(&dir) {
            warn!(upload_id, error = %e, "failed to remove session directory");
        }

        info!(upload_id, size, "assembled chunked upload");
        Ok(AssembledFile {
            size,
            content_hash,
            file_type,
        })
    }

    /// Drop a session and its chunks. Missing session is fine.
    pub fn discard(&self, upload_id: &str) -> Result<()> {
        let dir = self.paths.session_dir(upload_id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove sessions whose directory has been idle longer than
    /// `max_idle_secs`. Idleness comes from the newest mtime in the
    /// session directory, so an in-progress upload is never swept.
    pub fn sweep_stale(&self, max_idle_secs: u64) -> usize {
        let root = self.paths.sessions_root();
        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let now = std::time::SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(newest) = newest_mtime(&dir) else {
                continue;
            };
            let idle = now
                .duration_since(newest)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            if idle >= max_idle_secs {
                match std::fs::remove_dir_all(&dir) {
                    Ok(()) => {
                        removed += 1;
                        debug!(path = %dir.display(), idle, "removed stale upload session");
                    }
                    Err(e) => warn!(path = %dir.display(), error = %e, "failed to remove stale session"),
                }
            }
        }

        if removed > 0 {
            info!(removed, "removed stale upload sessions");
        }
        removed
    }

    fn find_resumable(&self, filename: &str, file_size: u64) -> Result<Option<UploadSession>> {
        let root = self.paths.sessions_root();
        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.flatten() {
            let info_path = entry.path().join(INFO_FILE);
            let Ok(json) = std::fs::read_to_string(&info_path) else {
                continue;
            };
            // Unreadable descriptors belong to the stale sweep, not here
            let Ok(session) = serde_json::from_str::<UploadSession>(&json) else {
                continue;
            };
            if session.filename == filename && session.file_size == file_size {
                return Ok(Some(session));
            }
        }
        Ok(None)
    }

    fn read_info(&self, dir: &Path, upload_id: &str) -> Result<UploadSession> {
        let json = std::fs::read_to_string(dir.join(INFO_FILE))
            .map_err(|_| TempstoreError::NotFound(format!("upload session {upload_id}")))?;
        serde_json::from_str(&json)
            .map_err(|e| TempstoreError::Persistence(format!("session descriptor: {e}")))
    }

    fn write_info(&self, dir: &Path, session: &UploadSession) -> Result<()> {
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| TempstoreError::Persistence(format!("session descriptor: {e}")))?;
        // Write-then-rename so a crash never leaves a truncated descriptor
        let tmp = dir.join(format!("{INFO_FILE}.tmp"));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, dir.join(INFO_FILE))?;
        Ok(())
    }
}

fn hash_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn newest_mtime(dir: &Path) -> Option<std::time::SystemTime> {
    let mut newest = std::fs::metadata(dir).and_then(|m| m.modified()).ok();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            if let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) {
                newest = Some(match newest {
                    Some(current) if current >= mtime => current,
                    _ => mtime,
                });
            }
        }
    }
    newest
}
