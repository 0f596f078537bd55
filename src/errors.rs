use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entry not found: {0}")]
    NotFound(Uuid),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
            StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            StoreError::StorageIo(e) => {
                error!("Blob storage failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            StoreError::Database(e) => {
                error!("Database failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
