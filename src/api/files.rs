use anyhow::Result;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::AppState;
use crate::errors::{StoreError, StoreResult};
use crate::models::{DeleteOutcome, Entry, EntryKind, EntryUpdate, ListFilter, ListMode};

/// Wire shape of an entry, as the web client reads it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub parent_id: Option<Uuid>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Blob key under the uploads directory.
    pub path: Option<String>,
    #[serde(with = "flag")]
    #[schema(value_type = u8)]
    pub is_starred: bool,
    #[serde(with = "flag")]
    #[schema(value_type = u8)]
    pub is_trashed: bool,
    pub url: Option<String>,
}

impl From<Entry> for EntryResponse {
    fn from(entry: Entry) -> Self {
        let url = entry
            .blob_ref
            .as_deref()
            .map(|key| format!("/uploads/{}", urlencoding::encode(key)));

        Self {
            id: entry.id,
            name: entry.name,
            kind: entry.kind,
            parent_id: entry.parent_id,
            mime_type: entry.mime_type,
            size: entry.size_bytes,
            created_at: entry.created_at,
            path: entry.blob_ref,
            is_starred: entry.is_starred,
            is_trashed: entry.is_trashed,
            url,
        }
    }
}

fn to_responses(entries: Vec<Entry>) -> Vec<EntryResponse> {
    entries.into_iter().map(EntryResponse::from).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQueryParams {
    pub parent_id: Option<String>,
    pub filter: Option<String>,
    pub q: Option<String>,
}

impl FileQueryParams {
    fn list_mode(&self) -> StoreResult<ListMode> {
        let parent_id = parse_optional_id(self.parent_id.as_deref())?;
        let filter = match self.filter.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<ListFilter>().map_err(StoreError::Validation)?),
        };
        Ok(ListMode::resolve(parent_id, filter, self.q.as_deref()))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: Uuid,
    pub status: DeleteOutcome,
}

/// Multipart body of `POST /files`.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub parent_id: Option<Uuid>,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/{id}", get(get_file).patch(update_file).delete(delete_file))
        .route("/files/{id}/breadcrumbs", get(get_breadcrumbs));

    Ok(router)
}

#[utoipa::path(
    get,
    path = "/files",
    params(
        ("parentId" = Option<String>, Query, description = "Folder to browse; root when absent"),
        ("filter" = Option<String>, Query, description = "One of starred, trash, recent"),
        ("q" = Option<String>, Query, description = "Name substring; searches the whole tree"),
    ),
    responses(
        (status = 200, description = "Matching entries", body = [EntryResponse]),
        (status = 400, description = "Invalid parentId or filter")
    )
)]
pub async fn list_files(
    State(app_state): State<AppState>,
    Query(params): Query<FileQueryParams>,
) -> Result<Json<Vec<EntryResponse>>, StoreError> {
    let mode = params.list_mode()?;
    let entries = app_state.file_store.list(mode).await?;
    Ok(Json(to_responses(entries)))
}

#[utoipa::path(
    get,
    path = "/files/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "The entry", body = EntryResponse),
        (status = 404, description = "No such entry")
    )
)]
pub async fn get_file(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EntryResponse>, StoreError> {
    let entry = app_state.file_store.get(id).await?;
    Ok(Json(entry.into()))
}

#[utoipa::path(
    post,
    path = "/files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded file entry", body = EntryResponse),
        (status = 400, description = "Missing file field or invalid parent"),
        (status = 404, description = "Parent folder not found"),
        (status = 500, description = "Blob storage failure")
    )
)]
pub async fn upload_file(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EntryResponse>, Response> {
    let mut upload = None;
    let mut parent_id = None;

    while let Some(field) = multipart.next_field().await.map_err(IntoResponse::into_response)? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(IntoResponse::into_response)?;
                upload = Some((file_name, content_type, data));
            }
            Some("parentId") => {
                let raw = field.text().await.map_err(IntoResponse::into_response)?;
                parent_id = parse_optional_id(Some(raw.as_str())).map_err(IntoResponse::into_response)?;
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) = upload
        .ok_or_else(|| StoreError::Validation("Missing file field".to_string()).into_response())?;

    let entry = app_state
        .file_store
        .upload_file(&file_name, content_type.as_deref(), &data, parent_id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(entry.into()))
}

#[utoipa::path(
    patch,
    path = "/files/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    request_body = EntryUpdate,
    responses(
        (status = 200, description = "Updated entry", body = EntryResponse),
        (status = 400, description = "Invalid name"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn update_file(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EntryUpdate>,
) -> Result<Json<EntryResponse>, StoreError> {
    let entry = app_state.file_store.update(id, payload).await?;
    Ok(Json(entry.into()))
}

#[utoipa::path(
    delete,
    path = "/files/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry trashed, or removed if it was already trashed", body = DeleteResponse),
        (status = 404, description = "No such entry")
    )
)]
pub async fn delete_file(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, StoreError> {
    let status = app_state.file_store.delete(id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        id,
        status,
    }))
}

#[utoipa::path(
    get,
    path = "/files/{id}/breadcrumbs",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Ancestors from the root down to the entry", body = [EntryResponse])
    )
)]
pub async fn get_breadcrumbs(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EntryResponse>>, StoreError> {
    let chain = app_state.file_store.breadcrumbs(id).await?;
    Ok(Json(to_responses(chain)))
}

/// Empty strings mean "no parent", matching what the web client sends.
pub(crate) fn parse_optional_id(raw: Option<&str>) -> StoreResult<Option<Uuid>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| StoreError::Validation(format!("Invalid id: {}", value))),
    }
}

/// Booleans go over the wire as 0/1.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}
