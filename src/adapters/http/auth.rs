use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::jwt::{self, CurrentUser},
    infra::config::AppConfig,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Access token from `Authorization: Bearer` or, failing that, the
/// `access_token` cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION)
        && let Ok(value) = value.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_string());
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the caller without rejecting the request.
pub fn peek_user(headers: &HeaderMap, config: &AppConfig) -> Option<CurrentUser> {
    let token = access_token(headers)?;
    jwt::verify(&token, &config.jwt_secret, &config.jwt_audience).ok()
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token(&parts.headers).ok_or(AppError::InvalidCredentials)?;
        jwt::verify(&token, &state.config.jwt_secret, &state.config.jwt_audience)
    }
}
