//! File record types and naming helpers.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Characters stripped from uploaded filenames.
const DANGEROUS_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Metadata for one stored file.
///
/// The serialized form is the snapshot wire format; fields added later
/// default on load so older snapshots keep round-tripping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Opaque short identifier, unique, never reused.
    pub file_id: String,
    /// Sanitized display name.
    pub original_name: String,
    /// Byte length of the content on disk.
    pub file_size: u64,
    /// MIME type, guessed from the extension or supplied by the client.
    pub file_type: String,
    /// Unix timestamp of the upload; also selects the on-disk date bucket.
    pub upload_time: i64,
    /// Unix timestamp after which the file is no longer servable.
    pub expire_time: i64,
    /// SHA-256 hex digest, computed once the bytes are fully on disk.
    #[serde(default)]
    pub content_hash: String,
    /// Number of successful downloads.
    #[serde(default)]
    pub download_count: u64,
    /// Tombstone flag; the physical file is gone but the record remains
    /// for reporting continuity.
    #[serde(default)]
    pub is_deleted: bool,
}

impl FileRecord {
    /// Whether this record is visible: not tombstoned and not yet expired.
    ///
    /// The boundary is exclusive on the valid side: `expire_time == now`
    /// counts as expired.
    pub fn is_active(&self, now: i64) -> bool {
        !self.is_deleted && self.expire_time > now
    }
}

/// Generate a new opaque file identifier (8 hex characters).
pub fn generate_file_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Sanitize an uploaded filename for display and storage.
///
/// Dangerous path characters become underscores, control characters are
/// dropped, an empty or dot-leading result falls back to a generated name,
/// and blocked extensions are coerced to `.txt`.
pub fn sanitize_filename(name: &str, blocked_extensions: &HashSet<String>, now: i64) -> String {
    let mut safe: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if DANGEROUS_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if safe.is_empty() || safe.starts_with('.') {
        safe = format!("file_{now}");
    }

    if let Some(ext) = Path::new(&safe).extension().and_then(|e| e.to_str()) {
        let dotted = format!(".{}", ext.to_lowercase());
        if blocked_extensions.contains(&dotted) {
            let stem = Path::new(&safe)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("file");
            safe = format!("{stem}.txt");
        }
    }

    safe
}

/// Guess a MIME type from a display name's extension.
pub fn guess_file_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked() -> HashSet<String> {
        [".exe", ".bat", ".js"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_generate_file_id_shape() {
        let id = generate_file_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_file_id_unique() {
        let a = generate_file_id();
        let b = generate_file_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_strips_dangerous_chars() {
        let name = sanitize_filename("a<b>c:d\"e/f\\g|h?i*.txt", &blocked(), 0);
        assert_eq!(name, "a_b_c_d_e_f_g_h_i_.txt");
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        let name = sanitize_filename("re\x00po\x1frt.pdf", &blocked(), 0);
        assert_eq!(name, "report.pdf");
    }

    #[test]
    fn test_sanitize_empty_fallback() {
        let name = sanitize_filename("", &blocked(), 1700000000);
        assert_eq!(name, "file_1700000000");
    }

    #[test]
    fn test_sanitize_dot_leading_fallback() {
        let name = sanitize_filename(".bashrc", &blocked(), 42);
        assert_eq!(name, "file_42");
    }

    #[test]
    fn test_sanitize_blocked_extension_coerced() {
        assert_eq!(sanitize_filename("virus.exe", &blocked(), 0), "virus.txt");
        assert_eq!(sanitize_filename("loader.EXE", &blocked(), 0), "loader.txt");
        assert_eq!(sanitize_filename("script.js", &blocked(), 0), "script.txt");
    }

    #[test]
    fn test_sanitize_allowed_extension_kept() {
        assert_eq!(sanitize_filename("photo.png", &blocked(), 0), "photo.png");
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        let name = sanitize_filename("日本語ファイル.txt", &blocked(), 0);
        assert_eq!(name, "日本語ファイル.txt");
    }

    #[test]
    fn test_guess_file_type() {
        assert_eq!(guess_file_type("a.txt"), "text/plain");
        assert_eq!(guess_file_type("a.json"), "application/json");
        assert_eq!(guess_file_type("a.png"), "image/png");
        assert_eq!(guess_file_type("no_extension"), "application/octet-stream");
    }

    #[test]
    fn test_record_active_boundary() {
        let record = FileRecord {
            file_id: "abcd1234".to_string(),
            original_name: "a.txt".to_string(),
            file_size: 10,
            file_type: "text/plain".to_string(),
            upload_time: 100,
            expire_time: 200,
            content_hash: String::new(),
            download_count: 0,
            is_deleted: false,
        };

        assert!(record.is_active(199));
        // expire_time == now is already expired
        assert!(!record.is_active(200));
        assert!(!record.is_active(201));
    }

    #[test]
    fn test_record_tombstone_not_active() {
        let record = FileRecord {
            file_id: "abcd1234".to_string(),
            original_name: "a.txt".to_string(),
            file_size: 10,
            file_type: "text/plain".to_string(),
            upload_time: 100,
            expire_time: 200,
            content_hash: String::new(),
            download_count: 0,
            is_deleted: true,
        };

        assert!(!record.is_active(150));
    }

    #[test]
    fn test_record_serde_defaults_for_old_snapshots() {
        // An older snapshot without the defaulted fields still loads.
        let json = r#"{
            "file_id": "abcd1234",
            "original_name": "a.txt",
            "file_size": 10,
            "file_type": "text/plain",
            "upload_time": 100,
            "expire_time": 200
        }"#;

        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.content_hash, "");
        assert_eq!(record.download_count, 0);
        assert!(!record.is_deleted);
    }
}
