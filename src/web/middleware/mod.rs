//! Web middleware.

pub mod auth;
pub mod limits;

pub use auth::{admin_sessions, AdminAuth, AdminSessions, OptionalAdmin};
pub use limits::{body_limit, BODY_LIMIT_MARGIN};
