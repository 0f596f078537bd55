use anyhow::Result;
use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::{files::EntryResponse, AppState};
use crate::errors::StoreError;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub parent_id: Option<Uuid>,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new().route("/folders", post(create_folder));

    Ok(router)
}

#[utoipa::path(
    post,
    path = "/folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 200, description = "Created folder", body = EntryResponse),
        (status = 400, description = "Missing or invalid name, or parent is not a folder"),
        (status = 404, description = "Parent folder not found")
    )
)]
pub async fn create_folder(
    State(app_state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Json<EntryResponse>, StoreError> {
    req.validate()
        .map_err(|e| StoreError::Validation(format!("Invalid folder request: {}", e)))?;

    let folder = app_state
        .file_store
        .create_folder(&req.name, req.parent_id)
        .await?;

    Ok(Json(folder.into()))
}
