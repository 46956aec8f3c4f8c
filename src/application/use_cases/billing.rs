use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        jwt::CurrentUser,
        ports::billing_provider::{
            BillingEvent, BillingEventKind, BillingProviderPort, CheckoutRequest,
            SubscriptionSnapshot,
        },
        use_cases::{
            credits::{CreditsRepo, paid_state},
            profile::ProfileRepo,
        },
    },
    domain::entities::{
        plan::Plan,
        profile::ProfilePatch,
        subscription::{PriceIds, SubscriptionTarget, detect_plan, reconcile},
    },
};

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait StripeEventRepo: Send + Sync {
    /// Record an event id. Returns `false` when it was already recorded.
    async fn mark_processed(&self, event_id: &str) -> AppResult<bool>;

    /// Forget an event id so a redelivery is processed again.
    async fn release(&self, event_id: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    Deduped,
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingUseCases {
    provider: Arc<dyn BillingProviderPort>,
    events: Arc<dyn StripeEventRepo>,
    profiles: Arc<dyn ProfileRepo>,
    credits: Arc<dyn CreditsRepo>,
    prices: PriceIds,
    app_url: String,
    free_base: i64,
}

impl BillingUseCases {
    pub fn new(
        provider: Arc<dyn BillingProviderPort>,
        events: Arc<dyn StripeEventRepo>,
        profiles: Arc<dyn ProfileRepo>,
        credits: Arc<dyn CreditsRepo>,
        prices: PriceIds,
        app_url: &str,
        free_base: i64,
    ) -> Self {
        Self {
            provider,
            events,
            profiles,
            credits,
            prices,
            app_url: app_url.trim_end_matches('/').to_string(),
            free_base,
        }
    }

    // ========================================================================
    // Webhooks
    // ========================================================================

    /// Apply a verified webhook event at most once.
    ///
    /// When handling fails the event id is released again so the provider's
    /// redelivery gets another chance.
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    pub async fn handle_event(&self, event: BillingEvent) -> AppResult<WebhookOutcome> {
        if !self.events.mark_processed(&event.id).await? {
            tracing::info!("Duplicate webhook event, skipping");
            return Ok(WebhookOutcome::Deduped);
        }

        if let Err(e) = self.dispatch(&event.kind).await {
            tracing::error!(error = %e, "Webhook handler failed");
            if let Err(release_err) = self.events.release(&event.id).await {
                tracing::error!(error = %release_err, "Failed to release webhook event");
            }
            return Err(e);
        }

        Ok(WebhookOutcome::Processed)
    }

    async fn dispatch(&self, kind: &BillingEventKind) -> AppResult<()> {
        match kind {
            BillingEventKind::CheckoutCompleted {
                metadata_user_id,
                client_reference_id,
                customer_id,
                subscription_id,
            } => {
                self.on_checkout_completed(
                    parse_user_id(metadata_user_id.as_deref())
                        .or_else(|| parse_user_id(client_reference_id.as_deref())),
                    customer_id.as_deref(),
                    subscription_id.as_deref(),
                )
                .await
            }
            BillingEventKind::SubscriptionChanged {
                deleted,
                subscription,
            } => self.on_subscription_changed(*deleted, subscription).await,
            BillingEventKind::Ignored(event_type) => {
                tracing::debug!(event_type, "Ignoring webhook event");
                Ok(())
            }
        }
    }

    async fn on_checkout_completed(
        &self,
        user_id: Option<Uuid>,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
    ) -> AppResult<()> {
        let subscription = match subscription_id {
            Some(id) => Some(self.provider.get_subscription(id).await?),
            None => None,
        };

        let user_id = match (user_id, customer_id) {
            (Some(id), _) => Some(id),
            (None, Some(customer)) => self.profiles.find_user_by_customer(customer).await?,
            (None, None) => None,
        };

        let Some(user_id) = user_id else {
            tracing::warn!("Checkout completed for unknown user");
            return Ok(());
        };

        self.profiles
            .upsert(
                user_id,
                &ProfilePatch {
                    is_pro: Some(true),
                    stripe_customer_id: customer_id.map(str::to_string),
                    stripe_subscription_id: subscription_id.map(str::to_string),
                    clear_subscription_id: false,
                },
            )
            .await?;

        if let Some(sub) = subscription {
            self.sync_credits(user_id, &sub, sub.status.is_active())
                .await?;
        }

        tracing::info!(%user_id, "Checkout completed");
        Ok(())
    }

    async fn on_subscription_changed(
        &self,
        deleted: bool,
        event_sub: &SubscriptionSnapshot,
    ) -> AppResult<()> {
        let should_be_pro = !deleted && event_sub.status.is_active();
        let customer_id = event_sub.customer_id.as_deref();

        let user_id = match parse_user_id(event_sub.metadata_user_id.as_deref()) {
            Some(id) => Some(id),
            None => match customer_id {
                Some(customer) => self.profiles.find_user_by_customer(customer).await?,
                None => None,
            },
        };

        // Event payloads can be partial; prefer a fresh copy.
        let subscription = if deleted {
            event_sub.clone()
        } else {
            match self.provider.get_subscription(&event_sub.id).await {
                Ok(full) => full,
                Err(e) => {
                    tracing::warn!(error = %e, "Subscription refetch failed, using event payload");
                    event_sub.clone()
                }
            }
        };

        let patch = ProfilePatch {
            is_pro: Some(should_be_pro),
            stripe_customer_id: customer_id.map(str::to_string),
            stripe_subscription_id: should_be_pro.then(|| subscription.id.clone()),
            clear_subscription_id: !should_be_pro,
        };

        match (user_id, customer_id) {
            (Some(user_id), _) => {
                self.profiles.upsert(user_id, &patch).await?;
                self.sync_credits(user_id, &subscription, should_be_pro)
                    .await?;
                tracing::info!(%user_id, should_be_pro, "Subscription reconciled");
            }
            (None, Some(customer)) => {
                let rows = self
                    .profiles
                    .update_by_customer(
                        customer,
                        &ProfilePatch {
                            stripe_customer_id: None,
                            ..patch
                        },
                    )
                    .await?;
                tracing::info!(rows, should_be_pro, "Subscription applied by customer id");
            }
            (None, None) => tracing::warn!("Subscription event without user or customer"),
        }

        Ok(())
    }

    async fn sync_credits(
        &self,
        user_id: Uuid,
        subscription: &SubscriptionSnapshot,
        should_be_pro: bool,
    ) -> AppResult<()> {
        let current = self.credits.get(user_id).await?.map(|a| paid_state(&a));
        let target = should_be_pro.then(|| SubscriptionTarget {
            plan: detect_plan(
                subscription.price_id.as_deref(),
                subscription.metadata_plan.as_deref(),
                &self.prices,
            ),
            period: subscription.period,
        });

        let update = reconcile(current.as_ref(), target.as_ref());
        tracing::debug!(
            plan = %update.plan,
            allowance = update.paid_allowance,
            reset = update.reset_paid_used,
            "Applying subscription to credits"
        );
        self.credits
            .apply_subscription(user_id, &update, self.free_base)
            .await
    }

    // ========================================================================
    // Checkout & Portal
    // ========================================================================

    async fn ensure_customer(&self, user: &CurrentUser) -> AppResult<String> {
        let existing = self
            .profiles
            .get(user.id)
            .await?
            .and_then(|p| p.stripe_customer_id);
        if let Some(customer_id) = existing {
            return Ok(customer_id);
        }

        let customer_id = self
            .provider
            .create_customer(user.email.as_deref(), user.id)
            .await?;
        self.profiles
            .upsert(
                user.id,
                &ProfilePatch {
                    stripe_customer_id: Some(customer_id.clone()),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, "Created billing customer");
        Ok(customer_id)
    }

    /// Start a hosted checkout for a paid plan and return its URL.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_checkout(&self, user: &CurrentUser, plan: Plan) -> AppResult<String> {
        if plan.is_free() {
            return Err(AppError::InvalidInput("Choose a paid plan".into()));
        }
        let price_id = self
            .prices
            .for_plan(plan)
            .ok_or_else(|| AppError::Internal(format!("No price configured for {plan}")))?
            .to_string();

        let customer_id = self.ensure_customer(user).await?;

        self.provider
            .create_checkout_session(&CheckoutRequest {
                customer_id,
                price_id,
                user_id: user.id,
                success_url: format!("{}/upgrade?success=1", self.app_url),
                cancel_url: format!("{}/upgrade?canceled=1", self.app_url),
            })
            .await
    }

    /// Open the provider's self-service billing portal.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_portal(&self, user: &CurrentUser) -> AppResult<String> {
        let customer_id = self.ensure_customer(user).await?;
        self.provider
            .create_portal_session(&customer_id, &format!("{}/upgrade", self.app_url))
            .await
    }
}

fn parse_user_id(raw: Option<&str>) -> Option<Uuid> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!(raw, "Ignoring malformed user id in billing payload");
            None
        }
    }
}
