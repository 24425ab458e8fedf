//! Web server for tempstore.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::FileHost;
use crate::{Result, TempstoreError};

use super::handlers::AppState;
use super::middleware::AdminSessions;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server: open the storage root, restore the
    /// metadata snapshot and set up shared state.
    pub fn new(config: Config) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|_| {
                TempstoreError::Config(format!(
                    "invalid bind address {}:{}",
                    config.host, config.port
                ))
            })?;

        let sessions = Arc::new(AdminSessions::new(config.session_timeout));
        let config = Arc::new(RwLock::new(config));
        let host = Arc::new(FileHost::new(config.clone())?);

        Ok(Self {
            addr,
            app_state: Arc::new(AppState {
                host,
                config,
                sessions,
            }),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the maintenance background tasks:
    /// - expiry sweep plus ceiling check, at the configured interval
    /// - metadata snapshot, at the snapshot interval
    /// - stale chunk session sweep, hourly
    fn start_maintenance_tasks(state: Arc<AppState>) {
        let host = state.host.clone();
        let config = state.config.clone();
        tokio::spawn(async move {
            loop {
                let interval = {
                    let cfg = config.read().unwrap_or_else(|e| e.into_inner());
                    cfg.clean_interval.max(1)
                };
                tokio::time::sleep(Duration::from_secs(interval)).await;
                host.sweep_expired();
            }
        });

        let host = state.host.clone();
        let snapshot_interval = {
            let cfg = state.config.read().unwrap_or_else(|e| e.into_inner());
            cfg.snapshot_interval.max(1)
        };
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(snapshot_interval));
            // Skip the first immediate tick
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = host.save_snapshot() {
                    tracing::warn!(error = %e, "periodic snapshot failed");
                }
            }
        });

        let host = state.host.clone();
        tokio::spawn(async move {
            const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
            interval.tick().await;
            loop {
                interval.tick().await;
                host.sweep_stale_sessions();
            }
        });
    }

    /// Run the web server until interrupted, then write a final
    /// metadata snapshot.
    pub async fn run(self) -> Result<()> {
        let state = self.app_state.clone();
        let router = create_router(self.app_state).merge(create_health_router());

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_maintenance_tasks(state.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        write_final_snapshot(&state);
        Ok(())
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let state = self.app_state.clone();
        let router = create_router(self.app_state).merge(create_health_router());

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_maintenance_tasks(state);
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

/// Write the shutdown snapshot. A persistence failure is logged but
/// never turns a clean shutdown into an error exit.
fn write_final_snapshot(state: &AppState) {
    match state.host.save_snapshot() {
        Ok(()) => tracing::info!("Final snapshot written"),
        Err(e) => tracing::error!(error = %e, "final snapshot failed"),
    }
}
