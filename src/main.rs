use tracing::info;

use tempstore::{Config, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read configuration from environment: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = tempstore::logging::init(&config) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        tempstore::logging::init_console_only(&config.log_level);
    }

    info!("tempstore - Temporary file hosting service");
    info!("Storage root: {}", config.upload_dir);

    let server = match WebServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
