use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use serde_json::json;

use crate::{
    adapters::http::app_state::AppState, app_error::AppResult, application::jwt::CurrentUser,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferralPayload {
    #[serde(default)]
    referrer_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/referral", post(redeem))
}

/// POST /api/referral
async fn redeem(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ReferralPayload>,
) -> AppResult<impl IntoResponse> {
    app_state
        .referral_use_cases
        .redeem(user.id, payload.referrer_id.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}
