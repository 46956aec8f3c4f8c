use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::subscription::{BillingPeriod, SubscriptionStatus},
};

// ============================================================================
// Port Types
// ============================================================================

/// Provider-agnostic view of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub customer_id: Option<String>,
    pub status: SubscriptionStatus,
    /// Price of the first subscription item.
    pub price_id: Option<String>,
    pub metadata_plan: Option<String>,
    pub metadata_user_id: Option<String>,
    pub period: BillingPeriod,
}

/// Parameters for a hosted subscription checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub user_id: Uuid,
    pub success_url: String,
    pub cancel_url: String,
}

/// A verified billing webhook event, already parsed into what the ledger cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    pub id: String,
    pub kind: BillingEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    /// `checkout.session.completed`
    CheckoutCompleted {
        metadata_user_id: Option<String>,
        client_reference_id: Option<String>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    /// `customer.subscription.created` / `updated` / `deleted`
    SubscriptionChanged {
        deleted: bool,
        subscription: SubscriptionSnapshot,
    },
    Ignored(String),
}

// ============================================================================
// Billing Provider Port
// ============================================================================

#[async_trait]
pub trait BillingProviderPort: Send + Sync {
    /// Create a customer record tagged with our user id.
    async fn create_customer(&self, email: Option<&str>, user_id: Uuid) -> AppResult<String>;

    /// Create a subscription checkout session and return its hosted URL.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<String>;

    /// Create a billing portal session and return its URL.
    async fn create_portal_session(&self, customer_id: &str, return_url: &str)
    -> AppResult<String>;

    async fn get_subscription(&self, subscription_id: &str) -> AppResult<SubscriptionSnapshot>;
}
