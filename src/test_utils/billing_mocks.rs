//! In-memory mock implementations for billing-related traits.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::billing_provider::{BillingProviderPort, CheckoutRequest, SubscriptionSnapshot},
        use_cases::{billing::StripeEventRepo, profile::ProfileRepo},
    },
    domain::entities::profile::{Profile, ProfilePatch},
};

// ============================================================================
// InMemoryStripeEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryStripeEventRepo {
    pub events: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
}

impl InMemoryStripeEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.events.lock().unwrap().contains(event_id)
    }

    /// Make recording events fail from now on.
    pub fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StripeEventRepo for InMemoryStripeEventRepo {
    async fn mark_processed(&self, event_id: &str) -> AppResult<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database("connection refused".into()));
        }
        Ok(self.events.lock().unwrap().insert(event_id.to_string()))
    }

    async fn release(&self, event_id: &str) -> AppResult<()> {
        self.events.lock().unwrap().remove(event_id);
        Ok(())
    }
}

// ============================================================================
// InMemoryProfileRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryProfileRepo {
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
}

impl InMemoryProfileRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, user_id: Uuid) -> Option<Profile> {
        self.profiles.lock().unwrap().get(&user_id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ProfileRepo for InMemoryProfileRepo {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.profile(user_id))
    }

    async fn upsert(&self, user_id: Uuid, patch: &ProfilePatch) -> AppResult<()> {
        self.profiles
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| Profile {
                id: user_id,
                ..Default::default()
            })
            .apply(patch);
        Ok(())
    }

    async fn find_user_by_customer(&self, customer_id: &str) -> AppResult<Option<Uuid>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .find(|p| p.stripe_customer_id.as_deref() == Some(customer_id))
            .map(|p| p.id))
    }

    async fn update_by_customer(&self, customer_id: &str, patch: &ProfilePatch) -> AppResult<u64> {
        let mut touched = 0;
        for profile in self.profiles.lock().unwrap().values_mut() {
            if profile.stripe_customer_id.as_deref() == Some(customer_id) {
                profile.apply(patch);
                touched += 1;
            }
        }
        Ok(touched)
    }
}

// ============================================================================
// MockBillingProvider
// ============================================================================

/// Billing provider double. Subscriptions must be registered with
/// `put_subscription`; unknown ids fail like a provider 404.
#[derive(Default)]
pub struct MockBillingProvider {
    subscriptions: Mutex<HashMap<String, SubscriptionSnapshot>>,
    checkouts: Mutex<Vec<CheckoutRequest>>,
    customers_created: AtomicUsize,
    subscription_fetches: AtomicUsize,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_subscription(&self, sub: SubscriptionSnapshot) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(sub.id.clone(), sub);
    }

    pub fn customers_created(&self) -> usize {
        self.customers_created.load(Ordering::SeqCst)
    }

    pub fn subscription_fetches(&self) -> usize {
        self.subscription_fetches.load(Ordering::SeqCst)
    }

    pub fn last_checkout(&self) -> Option<CheckoutRequest> {
        self.checkouts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl BillingProviderPort for MockBillingProvider {
    async fn create_customer(&self, _email: Option<&str>, _user_id: Uuid) -> AppResult<String> {
        let n = self.customers_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("cus_mock_{n}"))
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<String> {
        self.checkouts.lock().unwrap().push(request.clone());
        Ok(format!("https://checkout.test/{}", request.customer_id))
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        _return_url: &str,
    ) -> AppResult<String> {
        Ok(format!("https://portal.test/{customer_id}"))
    }

    async fn get_subscription(&self, subscription_id: &str) -> AppResult<SubscriptionSnapshot> {
        self.subscription_fetches.fetch_add(1, Ordering::SeqCst);
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }
}
