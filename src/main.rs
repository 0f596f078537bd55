use anyhow::Result;
use drive_rs::api::{self, AppState};
use drive_rs::services::{BlobStorage, FileStore};
use drive_rs::{AppConfig, Database};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drive_rs=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::new()?;
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting Drive-RS server on {}", bind_address);

    // Initialize database
    let database = match Database::new(&config.database.url, config.database.max_connections).await {
        Ok(db) => {
            info!("Database connected successfully");
            db
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    // Initialize blob storage
    let blobs = match BlobStorage::new(&config.storage.uploads_dir) {
        Ok(storage) => {
            info!("Blob storage ready at {}", config.storage.uploads_dir);
            storage
        }
        Err(e) => {
            error!("Failed to prepare uploads directory {}: {}", config.storage.uploads_dir, e);
            return Err(e.into());
        }
    };

    let file_store = FileStore::new(database.pool().clone(), blobs, config.storage.capacity_bytes);

    let app_state = AppState {
        database: database.clone(),
        file_store,
        config: config.clone(),
    };

    // Build application router
    let app = api::create_app(app_state).await?;

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Server listening on http://{}", bind_address);

    // Start server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
