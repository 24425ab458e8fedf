//! Expiry sweeping and storage-ceiling enforcement.
//!
//! Both operations follow the same discipline: unlink the stored file
//! first, and only tombstone the record once the unlink succeeded or
//! the file was already gone. A record is never tombstoned while its
//! bytes might still be on disk.

use std::io::ErrorKind;

use tracing::{info, warn};

use crate::file::paths::StoragePaths;
use crate::file::record::FileRecord;
use crate::file::store::MetadataStore;
use crate::Result;

/// Unlink a record's stored file and tombstone it.
///
/// A missing file is fine (already cleaned, or the record outlived a
/// manual wipe). Any other unlink failure leaves the record alone so a
/// later sweep retries.
pub fn delete_record(
    store: &mut MetadataStore,
    paths: &StoragePaths,
    file_id: &str,
) -> Result<bool> {
    let Some(record) = store.get(file_id) else {
        return Ok(false);
    };
    if record.is_deleted {
        return Ok(true);
    }

    let path = paths.stored_path(&record.file_id, record.upload_time);
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            warn!(file_id, path = %path.display(), error = %e, "failed to remove stored file");
            return Err(e.into());
        }
    }

    store.mark_deleted(file_id);
    Ok(true)
}

/// Remove every record whose expiry has passed. `expire_time == now`
/// counts as expired. Returns the number of files removed.
pub fn sweep_expired(store: &mut MetadataStore, paths: &StoragePaths, now: i64) -> usize {
    let expired: Vec<String> = store
        .records()
        .filter(|r| !r.is_deleted && r.expire_time <= now)
        .map(|r| r.file_id.clone())
        .collect();

    let mut removed = 0;
    for file_id in &expired {
        match delete_record(store, paths, file_id) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => warn!(file_id, error = %e, "expiry sweep skipped file"),
        }
    }

    if removed > 0 {
        info!(removed, "removed expired files");
    }
    removed
}

/// Evict files until non-deleted usage fits under `max_storage`.
///
/// Victims are chosen by ascending expiry, so the files closest to
/// dying anyway go first. Returns the number evicted.
pub fn enforce_ceiling(store: &mut MetadataStore, paths: &StoragePaths, max_storage: u64) -> usize {
    let mut used = store.total_bytes();
    if used <= max_storage {
        return 0;
    }

    let mut candidates: Vec<(i64, u64, String)> = store
        .records()
        .filter(|r| !r.is_deleted)
        .map(|r: &FileRecord| (r.expire_time, r.file_size, r.file_id.clone()))
        .collect();
    candidates.sort();

    let mut evicted = 0;
    for (_, size, file_id) in candidates {
        if used <= max_storage {
            break;
        }
        match delete_record(store, paths, &file_id) {
            Ok(true) => {
                used = used.saturating_sub(size);
                evicted += 1;
            }
            Ok(false) => {}
            Err(e) => warn!(file_id, error = %e, "eviction skipped file"),
        }
    }

    if evicted > 0 {
        warn!(evicted, used, max_storage, "evicted files to honor storage ceiling");
    }
    evicted
}
