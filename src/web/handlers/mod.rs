//! Web API handlers.

pub mod admin;
pub mod files;
pub mod upload;

use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::file::FileHost;
use crate::web::middleware::AdminSessions;

/// Shared application state for handlers.
pub struct AppState {
    /// The file hosting core.
    pub host: Arc<FileHost>,
    /// Runtime configuration, shared with the host.
    pub config: Arc<RwLock<Config>>,
    /// Live admin tokens.
    pub sessions: Arc<AdminSessions>,
}

impl AppState {
    /// Snapshot the current configuration.
    pub fn config_snapshot(&self) -> Config {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
