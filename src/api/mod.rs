pub mod files;
pub mod folders;
pub mod storage;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::database::Database;
use crate::services::FileStore;

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub file_store: FileStore,
    pub config: AppConfig,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        files::list_files,
        files::upload_file,
        files::get_file,
        files::update_file,
        files::delete_file,
        files::get_breadcrumbs,
        folders::create_folder,
        storage::get_storage,
    ),
    components(schemas(
        files::EntryResponse,
        files::DeleteResponse,
        files::UploadForm,
        folders::CreateFolderRequest,
        storage::StorageResponse,
        crate::models::EntryKind,
        crate::models::EntryUpdate,
        crate::models::DeleteOutcome,
    ))
)]
pub struct ApiDoc;

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .merge(files::create_router().await?)
        .merge(folders::create_router().await?)
        .merge(storage::create_router().await?);

    Ok(router)
}

/// Full HTTP application: REST routes, blob downloads under `/uploads`,
/// OpenAPI docs under `/swagger`, health check, CORS and request tracing.
pub async fn create_app(app_state: AppState) -> Result<Router> {
    let uploads = ServeDir::new(app_state.file_store.blobs().root());

    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(create_router().await?)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(app_state.config.storage.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Ok(app)
}

async fn health_handler(State(app_state): State<AppState>) -> (StatusCode, &'static str) {
    match app_state.database.health_check().await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Database connection failed")
        }
    }
}
