use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Fixed display capacity reported by `GET /storage` (15 GiB). Not enforced.
pub const DEFAULT_CAPACITY_BYTES: u64 = 15 * 1024 * 1024 * 1024;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub uploads_dir: String,
    pub capacity_bytes: u64,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Self {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("PORT", 3001),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://drive.sqlite?mode=rwc".to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            },
            storage: StorageConfig {
                uploads_dir: std::env::var("UPLOADS_DIR")
                    .unwrap_or_else(|_| "./uploads".to_string()),
                capacity_bytes: env_or("STORAGE_CAPACITY_BYTES", DEFAULT_CAPACITY_BYTES),
                max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            },
        };

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new().expect("Failed to create default config")
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
