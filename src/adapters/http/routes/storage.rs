use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::json;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::{jwt::CurrentUser, use_cases::gallery::GalleryUseCases},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/storage/cleanup", get(cleanup))
}

/// GET /api/storage/cleanup
///
/// Deletes the caller's stored images that no gallery item refers to.
async fn cleanup(
    State(gallery): State<Arc<GalleryUseCases>>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let report = gallery.cleanup_orphans(user.id).await?;
    Ok(Json(json!({
        "ok": true,
        "userId": report.user_id,
        "totalInStorage": report.total_in_storage,
        "totalKeptFromDb": report.total_kept_from_db,
        "removedCount": report.removed_count,
        "removedPaths": report.removed_paths,
    })))
}
