//! tempstore - Temporary file hosting service
//!
//! A small self-contained service for short-lived file sharing: whole
//! and chunked uploads, opaque short ids, automatic expiry and a
//! storage ceiling, with a password-gated admin API.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod units;
pub mod web;

pub use config::{Config, ConfigUpdate, PublicConfig};
pub use error::{Result, TempstoreError};
pub use file::{FileHost, FileRecord, ListQuery, SortKey, StatsSummary};
pub use web::WebServer;
