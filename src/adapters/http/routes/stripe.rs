use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{jwt::CurrentUser, use_cases::billing::WebhookOutcome},
    domain::entities::plan::Plan,
    infra::stripe_client::{StripeClient, StripeWebhookEvent},
};

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Deserialize, Default)]
struct CheckoutPayload {
    #[serde(default)]
    plan: Option<Plan>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/checkout", post(checkout))
        .route("/portal", post(portal))
}

/// POST /api/stripe/webhook
///
/// Signature is checked against the raw body before anything is parsed.
async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let Some(secret) = app_state.config.stripe_webhook_secret.as_ref() else {
        tracing::error!("STRIPE_WEBHOOK_SECRET is not set, rejecting webhook");
        return Err(AppError::InvalidInput("Webhook secret not configured".into()));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidInput("Missing stripe-signature header".into()))?;

    StripeClient::verify_webhook_signature(&body, signature, secret.expose_secret())?;

    let event = StripeWebhookEvent::parse(&body)?.into_billing_event()?;
    let event_id = event.id.clone();

    let outcome = app_state
        .billing_use_cases
        .handle_event(event)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                event_id,
                "Webhook processing failed, returning 500 for retry"
            );
            AppError::Internal(e.to_string())
        })?;

    Ok(Json(match outcome {
        WebhookOutcome::Processed => json!({ "received": true }),
        WebhookOutcome::Deduped => json!({ "received": true, "deduped": true }),
    }))
}

/// POST /api/stripe/checkout
///
/// Body `{ "plan": "pro" | "pro_plus" }`; an empty body means pro.
async fn checkout(
    State(app_state): State<AppState>,
    user: CurrentUser,
    body: String,
) -> AppResult<impl IntoResponse> {
    let payload: CheckoutPayload = if body.trim().is_empty() {
        CheckoutPayload::default()
    } else {
        serde_json::from_str(&body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid checkout request: {e}")))?
    };

    let url = app_state
        .billing_use_cases
        .create_checkout(&user, payload.plan.unwrap_or(Plan::Pro))
        .await?;
    Ok(Json(json!({ "ok": true, "url": url })))
}

/// POST /api/stripe/portal
async fn portal(
    State(app_state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let url = app_state.billing_use_cases.create_portal(&user).await?;
    Ok(Json(json!({ "ok": true, "url": url })))
}
