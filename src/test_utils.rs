use crate::api::AppState;
use crate::config::{AppConfig, DatabaseConfig, ServerConfig, StorageConfig, DEFAULT_CAPACITY_BYTES};
use crate::database::Database;
use crate::services::{BlobStorage, FileStore};
use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Create an isolated in-memory SQLite database with the full schema applied
pub async fn create_test_database() -> Result<Pool<Sqlite>> {
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_name = format!("file:drive_test_db_{}?mode=memory&cache=shared", counter);

    let pool = SqlitePoolOptions::new()
        .max_connections(1) // SQLite in-memory works best with single connection
        .connect(&db_name)
        .await?;

    let database = Database::from_pool(pool).await?;
    Ok(database.pool().clone())
}

/// A store over a fresh database with its blobs under `uploads_dir`.
pub async fn create_test_store(uploads_dir: &Path) -> Result<FileStore> {
    let pool = create_test_database().await?;
    let blobs = BlobStorage::new(uploads_dir)?;
    Ok(FileStore::new(pool, blobs, DEFAULT_CAPACITY_BYTES))
}

/// Application state over a fresh database, storing blobs under `uploads_dir`.
pub async fn create_test_app_state(uploads_dir: &Path) -> Result<AppState> {
    let pool = create_test_database().await?;
    let database = Database::from_pool(pool).await?;
    let blobs = BlobStorage::new(uploads_dir)?;

    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        storage: StorageConfig {
            uploads_dir: uploads_dir.to_string_lossy().into_owned(),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            max_upload_bytes: 1024 * 1024,
        },
    };

    let file_store = FileStore::new(database.pool().clone(), blobs, config.storage.capacity_bytes);
    let app_state = AppState {
        database,
        file_store,
        config,
    };

    Ok(app_state)
}
