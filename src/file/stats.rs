//! Aggregate usage statistics.

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::file::record::FileRecord;
use crate::units::format_size;

/// Snapshot of service usage, as served by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    /// Files uploaded since startup, tombstones included.
    pub total_uploads: u64,
    /// Download count summed over every record.
    pub total_downloads: u64,
    /// Files currently visible.
    pub active_files: usize,
    /// Files uploaded since local midnight.
    pub today_uploads: usize,
    /// Bytes tracked by non-deleted records.
    pub storage_used: u64,
    pub storage_used_formatted: String,
    /// Bytes actually present under the storage root, sessions included.
    pub actual_disk_usage: u64,
    pub actual_disk_usage_formatted: String,
    /// Configured ceiling.
    pub max_storage: u64,
    pub max_storage_formatted: String,
    /// storage_used relative to the ceiling, in percent.
    pub storage_usage_percent: f64,
}

/// Seconds since epoch of the most recent local midnight.
pub fn local_midnight(now: i64) -> i64 {
    let dt = Local
        .timestamp_opt(now, 0)
        .single()
        .unwrap_or_else(Local::now);
    let midnight = dt
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| Local.from_local_datetime(&naive).single());
    match midnight {
        Some(m) => m.timestamp(),
        None => now - now.rem_euclid(86_400),
    }
}

/// Build a summary from the record set and counters.
pub fn summarize<'a>(
    records: impl Iterator<Item = &'a FileRecord>,
    total_uploads: u64,
    storage_used: u64,
    actual_disk_usage: u64,
    max_storage: u64,
    now: i64,
) -> StatsSummary {
    let midnight = local_midnight(now);

    let mut total_downloads = 0u64;
    let mut active_files = 0usize;
    let mut today_uploads = 0usize;
    for record in records {
        total_downloads += record.download_count;
        if record.is_active(now) {
            active_files += 1;
        }
        if !record.is_deleted && record.upload_time >= midnight {
            today_uploads += 1;
        }
    }

    let storage_usage_percent = if max_storage == 0 {
        0.0
    } else {
        (storage_used as f64 / max_storage as f64 * 10_000.0).round() / 100.0
    };

    StatsSummary {
        total_uploads,
        total_downloads,
        active_files,
        today_uploads,
        storage_used,
        storage_used_formatted: format_size(storage_used),
        actual_disk_usage,
        actual_disk_usage_formatted: format_size(actual_disk_usage),
        max_storage,
        max_storage_formatted: format_size(max_storage),
        storage_usage_percent,
    }
}
