use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::{
    adapters::http::app_state::AppState, app_error::AppResult, application::jwt::CurrentUser,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

/// GET /api/profile
async fn get_profile(
    State(app_state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let profile = app_state.profile_use_cases.get(user.id).await?;
    Ok(Json(profile))
}
