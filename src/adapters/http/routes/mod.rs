pub mod credits;
pub mod gallery;
pub mod generate;
pub mod multipart;
pub mod profile;
pub mod referral;
pub mod storage;
pub mod stripe;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(credits::router())
        .merge(generate::router())
        .nest("/stripe", stripe::router())
        .merge(referral::router())
        .merge(gallery::router())
        .merge(storage::router())
        .merge(profile::router())
}
