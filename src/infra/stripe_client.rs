use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::billing_provider::{
        BillingEvent, BillingEventKind, BillingProviderPort, CheckoutRequest,
        SubscriptionSnapshot,
    },
    domain::entities::subscription::{BillingPeriod, SubscriptionStatus},
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Accepted clock skew between the signature timestamp and now.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(client: Client, secret_key: SecretString) -> Self {
        Self { client, secret_key }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        let response = self
            .client
            .post(format!("{}{}", STRIPE_API_BASE, path))
            .header("Authorization", self.auth_header())
            .form(params)
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub async fn create_customer(
        &self,
        email: Option<&str>,
        user_id: Uuid,
    ) -> AppResult<StripeCustomer> {
        let mut params = vec![("metadata[user_id]".to_string(), user_id.to_string())];
        if let Some(email) = email {
            params.push(("email".to_string(), email.to_string()));
        }
        self.post_form("/customers", &params).await
    }

    // ========================================================================
    // Checkout Sessions
    // ========================================================================

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> AppResult<StripeCheckoutSession> {
        let user_id = request.user_id.to_string();
        let params: Vec<(String, String)> = vec![
            ("mode".into(), "subscription".into()),
            ("customer".into(), request.customer_id.clone()),
            ("line_items[0][price]".into(), request.price_id.clone()),
            ("line_items[0][quantity]".into(), "1".into()),
            ("allow_promotion_codes".into(), "true".into()),
            ("client_reference_id".into(), user_id.clone()),
            ("subscription_data[metadata][user_id]".into(), user_id.clone()),
            ("metadata[user_id]".into(), user_id),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
        ];
        self.post_form("/checkout/sessions", &params).await
    }

    // ========================================================================
    // Customer Portal
    // ========================================================================

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<StripePortalSession> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        self.post_form("/billing_portal/sessions", &params).await
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn get_subscription(&self, subscription_id: &str) -> AppResult<StripeSubscription> {
        let response = self
            .client
            .get(format!("{}/subscriptions/{}", STRIPE_API_BASE, subscription_id))
            .header("Authorization", self.auth_header())
            .query(&[("expand[]", "items.data.price")])
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Webhook Signature Verification
    // ========================================================================

    pub fn verify_webhook_signature(
        payload: &str,
        signature_header: &str,
        webhook_secret: &str,
    ) -> AppResult<()> {
        verify_signature_at(
            payload,
            signature_header,
            webhook_secret,
            chrono::Utc::now().timestamp(),
        )
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::upstream(
                StatusCode::BAD_GATEWAY,
                format!("Failed to read Stripe response: {}", e),
            )
        })?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .ok()
                .map(|e| e.error.message.unwrap_or(e.error.error_type))
                .unwrap_or_else(|| format!("status {}", status));
            return Err(AppError::upstream(
                StatusCode::BAD_GATEWAY,
                format!("Stripe error: {}", message),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Internal(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn request_failed(e: reqwest::Error) -> AppError {
    AppError::upstream(
        StatusCode::BAD_GATEWAY,
        format!("Stripe request failed: {}", e),
    )
}

/// Check a `Stripe-Signature` header (`t=<ts>,v1=<hex>,...`) against the
/// HMAC-SHA256 of `"<ts>.<payload>"`. Any one matching `v1` entry passes.
pub fn verify_signature_at(
    payload: &str,
    signature_header: &str,
    webhook_secret: &str,
    now: i64,
) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let fields = signature_header
        .split(',')
        .filter_map(|part| part.trim().split_once('='));
    let timestamp = fields
        .clone()
        .find(|(key, _)| *key == "t")
        .map(|(_, value)| value)
        .ok_or_else(|| AppError::InvalidInput("Missing timestamp in signature".into()))?;
    let candidates: Vec<Vec<u8>> = fields
        .filter(|(key, _)| *key == "v1")
        .filter_map(|(_, value)| hex::decode(value).ok())
        .collect();
    if candidates.is_empty() {
        return Err(AppError::InvalidInput("Missing signature".into()));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());

    // verify_slice compares in constant time.
    if !candidates
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok())
    {
        return Err(AppError::InvalidInput("Invalid signature".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::InvalidInput("Invalid timestamp".into()))?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(AppError::InvalidInput("Timestamp too old".into()));
    }

    Ok(())
}

/// Stripe fields like `customer` are either an id or an expanded object.
fn expandable_id(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl BillingProviderPort for StripeClient {
    async fn create_customer(&self, email: Option<&str>, user_id: Uuid) -> AppResult<String> {
        Ok(StripeClient::create_customer(self, email, user_id).await?.id)
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<String> {
        StripeClient::create_checkout_session(self, request)
            .await?
            .url
            .ok_or_else(|| {
                AppError::upstream(StatusCode::BAD_GATEWAY, "Checkout session has no URL")
            })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<String> {
        Ok(StripeClient::create_portal_session(self, customer_id, return_url)
            .await?
            .url)
    }

    async fn get_subscription(&self, subscription_id: &str) -> AppResult<SubscriptionSnapshot> {
        Ok(StripeClient::get_subscription(self, subscription_id)
            .await?
            .into_snapshot())
    }
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub customer: Option<Value>,
    #[serde(default)]
    pub subscription: Option<Value>,
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Value>,
    pub status: Option<String>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

impl StripeSubscription {
    fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.data.first()
    }

    /// Price of the first item, falling back to its legacy `plan` object.
    pub fn price_id(&self) -> Option<String> {
        let item = self.first_item()?;
        item.price
            .as_ref()
            .or(item.plan.as_ref())
            .map(|p| p.id.clone())
            .filter(|id| !id.is_empty())
    }

    /// Current period, read from the first item first since newer API
    /// versions only set it there.
    pub fn period(&self) -> BillingPeriod {
        let item = self.first_item();
        BillingPeriod::from_unix(
            item.and_then(|i| i.current_period_start)
                .or(self.current_period_start),
            item.and_then(|i| i.current_period_end)
                .or(self.current_period_end),
        )
    }

    pub fn into_snapshot(self) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            customer_id: expandable_id(&self.customer),
            status: SubscriptionStatus::from_stripe(self.status.as_deref().unwrap_or_default()),
            price_id: self.price_id(),
            period: self.period(),
            metadata_plan: self.metadata.get("plan").cloned(),
            metadata_user_id: self.metadata.get("user_id").cloned(),
            id: self.id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: Option<String>,
    pub price: Option<StripePriceRef>,
    pub plan: Option<StripePriceRef>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StripePriceRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
    pub code: Option<String>,
}

// ============================================================================
// Webhook Event Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeWebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEventData {
    pub object: Value,
}

impl StripeWebhookEvent {
    pub fn parse(body: &str) -> AppResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))
    }

    /// Reduce the raw event to the parts the credit ledger reacts to.
    pub fn into_billing_event(self) -> AppResult<BillingEvent> {
        let kind = match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session: StripeCheckoutSession = serde_json::from_value(self.data.object)
                    .map_err(|e| {
                        AppError::InvalidInput(format!("Invalid checkout session: {}", e))
                    })?;
                BillingEventKind::CheckoutCompleted {
                    metadata_user_id: session.metadata.get("user_id").cloned(),
                    client_reference_id: session.client_reference_id,
                    customer_id: expandable_id(&session.customer),
                    subscription_id: expandable_id(&session.subscription),
                }
            }
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => {
                let sub: StripeSubscription = serde_json::from_value(self.data.object)
                    .map_err(|e| AppError::InvalidInput(format!("Invalid subscription: {}", e)))?;
                BillingEventKind::SubscriptionChanged {
                    deleted: self.event_type == "customer.subscription.deleted",
                    subscription: sub.into_snapshot(),
                }
            }
            _ => BillingEventKind::Ignored(self.event_type),
        };

        Ok(BillingEvent { id: self.id, kind })
    }
}
