use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::errors::StoreError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageResponse {
    pub used: u64,
    pub total: u64,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new().route("/storage", get(get_storage));

    Ok(router)
}

#[utoipa::path(
    get,
    path = "/storage",
    responses(
        (status = 200, description = "Bytes used by files, trashed included, and the display capacity", body = StorageResponse)
    )
)]
pub async fn get_storage(State(app_state): State<AppState>) -> Result<Json<StorageResponse>, StoreError> {
    let usage = app_state.file_store.storage_usage().await?;
    Ok(Json(StorageResponse {
        used: usage.used_bytes,
        total: usage.total_capacity_bytes,
    }))
}
