use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{
    adapters::http::{app_state::AppState, auth::peek_user},
    app_error::AppError,
};

/// Signed by Stripe and retried on 429, so it is never throttled.
const UNLIMITED_PATHS: &[&str] = &["/api/stripe/webhook"];

pub async fn rate_limit_middleware(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if UNLIMITED_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let config = &app_state.config;
    let ip = client_ip(request.headers(), addr.ip(), config.trust_proxy);
    let user_id = peek_user(request.headers(), config).map(|u| u.id.to_string());

    tracing::debug!(%ip, user_id = ?user_id, path = %request.uri().path(), "Rate limit check");
    app_state
        .rate_limiter
        .check(&ip.to_string(), user_id.as_deref())
        .await?;

    Ok(next.run(request).await)
}

/// Address the budget is charged to. Proxy headers count only when
/// `trust_proxy` is set and they hold a parseable address.
fn client_ip(headers: &HeaderMap, peer: IpAddr, trust_proxy: bool) -> IpAddr {
    if !trust_proxy {
        return peer;
    }
    forwarded_ip(headers).unwrap_or(peer)
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    header("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .or_else(|| header("x-real-ip"))
        .and_then(|raw| raw.trim().parse().ok())
}
