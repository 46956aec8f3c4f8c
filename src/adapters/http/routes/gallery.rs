use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::IntoResponse,
    routing::{delete, get, patch},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, routes::multipart::read_form},
    app_error::{AppError, AppResult},
    application::{
        jwt::CurrentUser,
        use_cases::{
            gallery::{GalleryUseCases, NewGalleryItem},
            generate::MAX_IMAGE_BYTES,
        },
    },
};

/// Full image plus thumbnail plus text fields.
const GALLERY_BODY_LIMIT: usize = 2 * MAX_IMAGE_BYTES + 1024 * 1024;

#[derive(Deserialize)]
struct FavoritePayload {
    is_favorite: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/gallery",
            get(list_items)
                .post(save_item)
                .layer(DefaultBodyLimit::max(GALLERY_BODY_LIMIT)),
        )
        .route("/gallery/{id}/favorite", patch(set_favorite))
        .route("/gallery/{id}", delete(delete_item))
}

/// GET /api/gallery
async fn list_items(
    State(gallery): State<Arc<GalleryUseCases>>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let items = gallery.list(user.id).await?;
    Ok(Json(json!({ "ok": true, "items": items })))
}

/// POST /api/gallery
///
/// Multipart: `image` (required), `thumb`, `room_type`, `style`, `prompt`
/// and an optional client-chosen `id`.
async fn save_item(
    State(gallery): State<Arc<GalleryUseCases>>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = read_form(multipart).await?;

    let id = match form.text("id").map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput("Invalid item id".into()))?,
        ),
        None => None,
    };
    let image = form
        .take_file("image")
        .ok_or_else(|| AppError::InvalidInput("No image received.".into()))?;

    let input = NewGalleryItem {
        id,
        room_type: form.text("room_type").unwrap_or_default().to_string(),
        style: form.text("style").unwrap_or_default().to_string(),
        prompt: form.text("prompt").unwrap_or_default().to_string(),
        thumb: form.take_file("thumb"),
        image,
    };

    let item = gallery.save(user.id, input).await?;
    Ok(Json(json!({ "ok": true, "item": item })))
}

/// PATCH /api/gallery/{id}/favorite
async fn set_favorite(
    State(gallery): State<Arc<GalleryUseCases>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FavoritePayload>,
) -> AppResult<impl IntoResponse> {
    gallery.set_favorite(user.id, id, payload.is_favorite).await?;
    Ok(Json(json!({ "ok": true })))
}

/// DELETE /api/gallery/{id}
async fn delete_item(
    State(gallery): State<Arc<GalleryUseCases>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    gallery.delete(user.id, id).await?;
    Ok(Json(json!({ "ok": true })))
}
