//! Admin session authentication middleware.
//!
//! Logging in with the admin password yields an opaque bearer token.
//! Tokens live in memory with a sliding idle timeout; a restart logs
//! every admin out.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::web::error::ApiError;

/// Live admin tokens, keyed by token value.
pub struct AdminSessions {
    timeout_secs: u64,
    /// token -> last-seen timestamp
    tokens: Mutex<HashMap<String, i64>>,
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

impl AdminSessions {
    /// Create a session table with the given idle timeout.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Idle timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Mint a fresh token.
    pub fn issue(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.insert(token.clone(), now_ts());
        token
    }

    /// Check a token and refresh its idle window. Expired tokens are
    /// dropped on sight.
    pub fn validate(&self, token: &str) -> bool {
        let now = now_ts();
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        match tokens.get_mut(token) {
            Some(last_seen) if now - *last_seen <= self.timeout_secs as i64 => {
                *last_seen = now;
                true
            }
            Some(_) => {
                tokens.remove(token);
                false
            }
            None => false,
        }
    }

    /// Revoke a token. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.remove(token).is_some()
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Extractor for authenticated admins.
///
/// Use this extractor to require an admin token for a handler. The
/// handler receives the token so it can revoke it on logout.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub String);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = bearer_token(parts)
                .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

            let sessions = parts
                .extensions
                .get::<Arc<AdminSessions>>()
                .ok_or_else(|| ApiError::internal("Admin sessions not configured"))?;

            if !sessions.validate(&token) {
                return Err(ApiError::unauthorized("Invalid or expired token"));
            }
            Ok(AdminAuth(token))
        })
    }
}

/// Optional admin extractor.
///
/// Similar to AdminAuth but doesn't fail without a valid token; the
/// handler sees whether the caller is an admin.
#[derive(Debug, Clone)]
pub struct OptionalAdmin(pub bool);

impl<S> FromRequestParts<S> for OptionalAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let Some(token) = bearer_token(parts) else {
                return Ok(OptionalAdmin(false));
            };
            let Some(sessions) = parts.extensions.get::<Arc<AdminSessions>>() else {
                return Ok(OptionalAdmin(false));
            };
            Ok(OptionalAdmin(sessions.validate(&token)))
        })
    }
}

/// Middleware function to inject the session table into request extensions.
pub async fn admin_sessions(
    sessions: Arc<AdminSessions>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(sessions);
    next.run(request).await
}
