use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::post,
};

use crate::{
    adapters::http::{app_state::AppState, routes::multipart::read_form},
    app_error::AppResult,
    application::{
        jwt::CurrentUser,
        use_cases::generate::{GenerateInput, MAX_IMAGE_BYTES},
    },
};

/// Room for the style field and multipart framing on top of the image.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/generate",
        post(generate).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES)),
    )
}

/// POST /api/generate
///
/// Multipart with an `image` file and optional `style`; answers with the
/// redesigned JPEG.
async fn generate(
    State(app_state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = read_form(multipart).await?;
    let input = GenerateInput {
        image: form.take_file("image"),
        style: form.text("style").map(str::to_string),
    };

    let bytes = app_state
        .generate_use_cases
        .generate(user.id, input)
        .await?;

    Ok((
        [(CONTENT_TYPE, "image/jpeg"), (CACHE_CONTROL, "no-store")],
        bytes,
    ))
}
