//! Configuration module for tempstore.
//!
//! Configuration is read once from the process environment at startup
//! (`TEMPSTORE_*` variables, each with a default). A handful of fields can
//! be changed at runtime through the admin API; those updates are clamped
//! to fixed ranges and are not persisted across restarts.

use std::collections::HashSet;
use std::env;

use serde::{Deserialize, Serialize};

use crate::units::parse_size;
use crate::{Result, TempstoreError};

/// Lower clamp for the per-file size ceiling (1 MiB).
pub const MIN_FILE_SIZE_CEILING: u64 = 1024 * 1024;
/// Upper clamp for the per-file size ceiling (10 GiB).
pub const MAX_FILE_SIZE_CEILING: u64 = 10 * 1024 * 1024 * 1024;
/// Lower clamp for the aggregate storage ceiling (1 GiB).
pub const MIN_STORAGE_CEILING: u64 = 1024 * 1024 * 1024;
/// Upper clamp for the aggregate storage ceiling (100 GiB).
pub const MAX_STORAGE_CEILING: u64 = 100 * 1024 * 1024 * 1024;
/// Expiry floor in hours for an authenticated admin.
pub const MIN_EXPIRE_HOURS_ADMIN: u32 = 1;
/// Expiry floor in hours for anonymous callers. Anonymous clients may raise
/// the expiry but cannot force short windows on others' files.
pub const MIN_EXPIRE_HOURS_ANON: u32 = 5;
/// Expiry cap in hours for everyone.
pub const MAX_EXPIRE_HOURS: u32 = 48;

fn default_blocked_extensions() -> HashSet<String> {
    [".exe", ".bat", ".cmd", ".com", ".scr", ".vbs", ".js"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Admin credential for the management API.
    pub admin_password: String,
    /// Storage root directory.
    pub upload_dir: String,
    /// Host address to bind.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Path to the log file.
    pub log_file: String,
    /// Aggregate storage ceiling in bytes.
    pub max_storage: u64,
    /// Per-file size ceiling in bytes.
    pub max_file_size: u64,
    /// Expiration sweep interval in seconds.
    pub clean_interval: u64,
    /// Metadata snapshot interval in seconds.
    pub snapshot_interval: u64,
    /// Admin session idle timeout in seconds.
    pub session_timeout: u64,
    /// Chunked-upload session idle timeout in seconds.
    pub chunk_idle_timeout: u64,
    /// Maximum number of files in one batch upload.
    pub max_files_per_upload: usize,
    /// Default expiry in hours applied to new uploads.
    pub file_expire_hours: u32,
    /// Extensions (with leading dot, lowercase) coerced to `.txt` on upload.
    pub blocked_extensions: HashSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_password: "admin".to_string(),
            upload_dir: "./uploads".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            log_file: "logs/tempstore.log".to_string(),
            max_storage: 20 * 1024 * 1024 * 1024,
            max_file_size: 1024 * 1024 * 1024,
            clean_interval: 3600,
            snapshot_interval: 600,
            session_timeout: 1800,
            chunk_idle_timeout: 7200,
            max_files_per_upload: 10,
            file_expire_hours: 24,
            blocked_extensions: default_blocked_extensions(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_size(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(v) if !v.is_empty() => {
            parse_size(&v).map_err(|e| TempstoreError::Config(format!("{key}: {e}")))
        }
        _ => Ok(default),
    }
}

fn env_duration(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(v) if !v.is_empty() => crate::units::parse_duration(&v)
            .map_err(|e| TempstoreError::Config(format!("{key}: {e}"))),
        _ => Ok(default),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v
            .parse()
            .map_err(|_| TempstoreError::Config(format!("{key}: invalid value {v:?}"))),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Every variable has a default; a present-but-malformed value is a
    /// startup error rather than being silently ignored.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let blocked_extensions = match env::var("TEMPSTORE_BLOCKED_EXTENSIONS") {
            Ok(v) if !v.is_empty() => v
                .split(',')
                .map(|e| {
                    let e = e.trim().to_lowercase();
                    if e.starts_with('.') {
                        e
                    } else {
                        format!(".{e}")
                    }
                })
                .collect(),
            _ => defaults.blocked_extensions,
        };

        Ok(Self {
            admin_password: env_or("TEMPSTORE_ADMIN_PASSWORD", &defaults.admin_password),
            upload_dir: env_or("TEMPSTORE_UPLOAD_DIR", &defaults.upload_dir),
            host: env_or("TEMPSTORE_HOST", &defaults.host),
            port: env_parse("TEMPSTORE_PORT", defaults.port)?,
            log_level: env_or("TEMPSTORE_LOG_LEVEL", &defaults.log_level),
            log_file: env_or("TEMPSTORE_LOG_FILE", &defaults.log_file),
            max_storage: env_size("TEMPSTORE_MAX_STORAGE", defaults.max_storage)?,
            max_file_size: env_size("TEMPSTORE_MAX_FILE_SIZE", defaults.max_file_size)?,
            clean_interval: env_duration("TEMPSTORE_CLEAN_INTERVAL", defaults.clean_interval)?,
            snapshot_interval: env_duration(
                "TEMPSTORE_SNAPSHOT_INTERVAL",
                defaults.snapshot_interval,
            )?,
            session_timeout: env_duration("TEMPSTORE_SESSION_TIMEOUT", defaults.session_timeout)?,
            chunk_idle_timeout: env_duration(
                "TEMPSTORE_CHUNK_IDLE_TIMEOUT",
                defaults.chunk_idle_timeout,
            )?,
            max_files_per_upload: env_parse(
                "TEMPSTORE_MAX_FILES_PER_UPLOAD",
                defaults.max_files_per_upload,
            )?,
            file_expire_hours: env_parse(
                "TEMPSTORE_FILE_EXPIRE_HOURS",
                defaults.file_expire_hours,
            )?,
            blocked_extensions,
        })
    }

    /// Apply a runtime update, clamping each field to its allowed range.
    ///
    /// `is_admin` selects the expiry floor: an authenticated admin may set
    /// the expiry as low as 1 hour, anonymous callers no lower than 5.
    pub fn apply_update(&mut self, update: &ConfigUpdate, is_admin: bool) {
        if let Some(max_file_size) = update.max_file_size {
            self.max_file_size = max_file_size.clamp(MIN_FILE_SIZE_CEILING, MAX_FILE_SIZE_CEILING);
        }
        if let Some(max_storage) = update.max_storage {
            self.max_storage = max_storage.clamp(MIN_STORAGE_CEILING, MAX_STORAGE_CEILING);
        }
        if let Some(hours) = update.file_expire_hours {
            let floor = if is_admin {
                MIN_EXPIRE_HOURS_ADMIN
            } else {
                MIN_EXPIRE_HOURS_ANON
            };
            self.file_expire_hours = hours.clamp(floor, MAX_EXPIRE_HOURS);
        }
        if let Some(max_files) = update.max_files_per_upload {
            self.max_files_per_upload = max_files;
        }
        if let Some(interval) = update.clean_interval {
            self.clean_interval = interval;
        }
    }

    /// The runtime-visible portion of the configuration.
    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            max_file_size: self.max_file_size,
            max_storage: self.max_storage,
            file_expire_hours: self.file_expire_hours,
            max_files_per_upload: self.max_files_per_upload,
            clean_interval: self.clean_interval,
        }
    }
}

/// Partial update for the runtime-mutable configuration fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    /// New per-file size ceiling in bytes.
    pub max_file_size: Option<u64>,
    /// New aggregate storage ceiling in bytes.
    pub max_storage: Option<u64>,
    /// New default expiry in hours.
    pub file_expire_hours: Option<u32>,
    /// New batch upload file count limit.
    pub max_files_per_upload: Option<usize>,
    /// New expiration sweep interval in seconds.
    pub clean_interval: Option<u64>,
}

/// Configuration fields exposed through the config API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicConfig {
    /// Per-file size ceiling in bytes.
    pub max_file_size: u64,
    /// Aggregate storage ceiling in bytes.
    pub max_storage: u64,
    /// Default expiry in hours.
    pub file_expire_hours: u32,
    /// Batch upload file count limit.
    pub max_files_per_upload: usize,
    /// Expiration sweep interval in seconds.
    pub clean_interval: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.admin_password, "admin");
        assert_eq!(config.upload_dir, "./uploads");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_storage, 20 * 1024 * 1024 * 1024);
        assert_eq!(config.max_file_size, 1024 * 1024 * 1024);
        assert_eq!(config.clean_interval, 3600);
        assert_eq!(config.snapshot_interval, 600);
        assert_eq!(config.session_timeout, 1800);
        assert_eq!(config.chunk_idle_timeout, 7200);
        assert_eq!(config.max_files_per_upload, 10);
        assert_eq!(config.file_expire_hours, 24);
        assert!(config.blocked_extensions.contains(".exe"));
        assert!(config.blocked_extensions.contains(".js"));
    }

    // A single test owns the TEMPSTORE_* variables; from_env reads every
    // key, so splitting this across tests would race under parallel runs.
    #[test]
    fn test_from_env_overrides_and_malformed() {
        std::env::set_var("TEMPSTORE_MAX_STORAGE", "2GB");
        std::env::set_var("TEMPSTORE_CLEAN_INTERVAL", "15m");
        std::env::set_var("TEMPSTORE_BLOCKED_EXTENSIONS", "exe,.sh");

        let config = Config::from_env().unwrap();
        assert_eq!(config.max_storage, 2 * 1024 * 1024 * 1024);
        assert_eq!(config.clean_interval, 900);
        assert!(config.blocked_extensions.contains(".exe"));
        assert!(config.blocked_extensions.contains(".sh"));
        assert!(!config.blocked_extensions.contains(".bat"));

        std::env::set_var("TEMPSTORE_MAX_FILE_SIZE", "lots");
        let result = Config::from_env();
        assert!(matches!(result, Err(TempstoreError::Config(_))));

        std::env::remove_var("TEMPSTORE_MAX_FILE_SIZE");
        std::env::remove_var("TEMPSTORE_MAX_STORAGE");
        std::env::remove_var("TEMPSTORE_CLEAN_INTERVAL");
        std::env::remove_var("TEMPSTORE_BLOCKED_EXTENSIONS");
    }

    #[test]
    fn test_update_storage_ceiling_clamps() {
        let mut config = Config::default();

        config.apply_update(
            &ConfigUpdate {
                max_storage: Some(0),
                ..Default::default()
            },
            true,
        );
        assert_eq!(config.max_storage, MIN_STORAGE_CEILING);

        config.apply_update(
            &ConfigUpdate {
                max_storage: Some(1000 * 1024 * 1024 * 1024),
                ..Default::default()
            },
            true,
        );
        assert_eq!(config.max_storage, MAX_STORAGE_CEILING);
    }

    #[test]
    fn test_update_file_size_ceiling_clamps() {
        let mut config = Config::default();

        config.apply_update(
            &ConfigUpdate {
                max_file_size: Some(1),
                ..Default::default()
            },
            true,
        );
        assert_eq!(config.max_file_size, MIN_FILE_SIZE_CEILING);

        config.apply_update(
            &ConfigUpdate {
                max_file_size: Some(u64::MAX),
                ..Default::default()
            },
            true,
        );
        assert_eq!(config.max_file_size, MAX_FILE_SIZE_CEILING);
    }

    #[test]
    fn test_update_expiry_admin_floor() {
        let mut config = Config::default();

        config.apply_update(
            &ConfigUpdate {
                file_expire_hours: Some(0),
                ..Default::default()
            },
            true,
        );
        assert_eq!(config.file_expire_hours, 1);
    }

    #[test]
    fn test_update_expiry_anonymous_floor() {
        let mut config = Config::default();

        config.apply_update(
            &ConfigUpdate {
                file_expire_hours: Some(2),
                ..Default::default()
            },
            false,
        );
        assert_eq!(config.file_expire_hours, 5);
    }

    #[test]
    fn test_update_expiry_cap() {
        let mut config = Config::default();

        config.apply_update(
            &ConfigUpdate {
                file_expire_hours: Some(1000),
                ..Default::default()
            },
            true,
        );
        assert_eq!(config.file_expire_hours, 48);
    }

    #[test]
    fn test_update_passthrough_fields() {
        let mut config = Config::default();

        config.apply_update(
            &ConfigUpdate {
                max_files_per_upload: Some(25),
                clean_interval: Some(120),
                ..Default::default()
            },
            false,
        );
        assert_eq!(config.max_files_per_upload, 25);
        assert_eq!(config.clean_interval, 120);
    }

    #[test]
    fn test_public_config() {
        let config = Config::default();
        let public = config.public();

        assert_eq!(public.max_file_size, config.max_file_size);
        assert_eq!(public.max_storage, config.max_storage);
        assert_eq!(public.file_expire_hours, config.file_expire_hours);
        assert_eq!(public.max_files_per_upload, config.max_files_per_upload);
        assert_eq!(public.clean_interval, config.clean_interval);
    }
}
