//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` wires every use case to in-memory doubles and hands
//! the doubles back in `TestMocks` so route tests can seed and inspect them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::image_editor::ImageAttemptError,
        use_cases::{
            billing::BillingUseCases, credits::CreditUseCases, gallery::GalleryUseCases,
            generate::{GenerateUseCases, RetryPolicy},
            profile::ProfileUseCases,
            referral::ReferralUseCases,
        },
    },
    domain::entities::{
        credits::{CreditAccount, DEFAULT_FREE_BASE},
        gallery_item::GalleryItem,
        subscription::PriceIds,
    },
    infra::{RateLimiterTrait, config::AppConfig},
    test_utils::{
        InMemoryCreditsRepo, InMemoryGalleryRepo, InMemoryObjectStorage, InMemoryProfileRepo,
        InMemoryRateLimiter, InMemoryReferralRepo, InMemoryStripeEventRepo, MockBillingProvider,
        ScriptedImageEditor,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";
pub const TEST_JWT_AUDIENCE: &str = "authenticated";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Access token for `user_id` signed with the test secret.
pub fn test_token(user_id: Uuid) -> String {
    jwt::issue(
        user_id,
        Some("user@homerenov.test"),
        &SecretString::new(TEST_JWT_SECRET.into()),
        TEST_JWT_AUDIENCE,
        time::Duration::hours(1),
    )
    .unwrap()
}

/// Doubles behind a built `AppState`.
pub struct TestMocks {
    pub credits: Arc<InMemoryCreditsRepo>,
    pub profiles: Arc<InMemoryProfileRepo>,
    pub events: Arc<InMemoryStripeEventRepo>,
    pub provider: Arc<MockBillingProvider>,
    pub image_editor: Arc<ScriptedImageEditor>,
    pub gallery: Arc<InMemoryGalleryRepo>,
    pub storage: Arc<InMemoryObjectStorage>,
    pub referrals: Arc<InMemoryReferralRepo>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let user_id = Uuid::new_v4();
/// let (app_state, mocks) = TestAppStateBuilder::new()
///     .with_account(create_test_account(user_id, |a| a.free_base = 3))
///     .build_with_mocks();
/// ```
pub struct TestAppStateBuilder {
    accounts: Vec<CreditAccount>,
    gallery_items: Vec<GalleryItem>,
    image_outcomes: Vec<Result<Value, ImageAttemptError>>,
    webhook_secret: Option<String>,
    prices: PriceIds,
    rate_limiter: Option<Arc<dyn RateLimiterTrait>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            accounts: vec![],
            gallery_items: vec![],
            image_outcomes: vec![],
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
            prices: PriceIds {
                pro: Some("price_pro".to_string()),
                pro_plus: Some("price_pro_plus".to_string()),
            },
            rate_limiter: None,
        }
    }

    pub fn with_account(mut self, account: CreditAccount) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_gallery_item(mut self, item: GalleryItem) -> Self {
        self.gallery_items.push(item);
        self
    }

    /// Queue image API outcomes, replayed one per attempt.
    pub fn with_image_outcomes(mut self, outcomes: Vec<Result<Value, ImageAttemptError>>) -> Self {
        self.image_outcomes = outcomes;
        self
    }

    pub fn without_webhook_secret(mut self) -> Self {
        self.webhook_secret = None;
        self
    }

    pub fn with_prices(mut self, prices: PriceIds) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiterTrait>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Build the AppState and return the doubles for assertions.
    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let credits = Arc::new(InMemoryCreditsRepo::with_accounts(self.accounts));
        let profiles = Arc::new(InMemoryProfileRepo::new());
        let events = Arc::new(InMemoryStripeEventRepo::new());
        let provider = Arc::new(MockBillingProvider::new());
        let image_editor = Arc::new(ScriptedImageEditor::new(self.image_outcomes));
        let gallery = Arc::new(InMemoryGalleryRepo::new());
        for item in self.gallery_items {
            gallery.items.lock().unwrap().insert(item.id, item);
        }
        let storage = Arc::new(InMemoryObjectStorage::new());
        let referrals = Arc::new(InMemoryReferralRepo::new());

        let config = test_config(self.webhook_secret, self.prices.clone());

        let credit_use_cases = CreditUseCases::new(credits.clone(), config.default_free_base);
        let generate_use_cases = GenerateUseCases::new(
            credit_use_cases.clone(),
            image_editor.clone(),
            RetryPolicy {
                base_delay: Duration::ZERO,
                max_jitter: Duration::ZERO,
                ..RetryPolicy::default()
            },
        );
        let billing_use_cases = BillingUseCases::new(
            provider.clone(),
            events.clone(),
            profiles.clone(),
            credits.clone(),
            self.prices,
            &config.app_base_url(),
            config.default_free_base,
        );
        let referral_use_cases = ReferralUseCases::new(referrals.clone(), credits.clone());
        let gallery_use_cases = GalleryUseCases::new(gallery.clone(), storage.clone());
        let profile_use_cases = ProfileUseCases::new(profiles.clone());

        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(InMemoryRateLimiter::permissive()));

        let app_state = AppState {
            config: Arc::new(config),
            credit_use_cases: Arc::new(credit_use_cases),
            generate_use_cases: Arc::new(generate_use_cases),
            billing_use_cases: Arc::new(billing_use_cases),
            referral_use_cases: Arc::new(referral_use_cases),
            gallery_use_cases: Arc::new(gallery_use_cases),
            profile_use_cases: Arc::new(profile_use_cases),
            rate_limiter,
        };

        let mocks = TestMocks {
            credits,
            profiles,
            events,
            provider,
            image_editor,
            gallery,
            storage,
            referrals,
        };

        (app_state, mocks)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config(webhook_secret: Option<String>, prices: PriceIds) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
        database_url: String::new(),
        app_url: Url::parse("http://localhost:3000").unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        jwt_audience: TEST_JWT_AUDIENCE.to_string(),
        redis_url: String::new(),
        rate_limit_window_secs: 60,
        rate_limit_per_ip: 60,
        rate_limit_per_user: 30,
        trust_proxy: false,
        stripe_secret_key: SecretString::new("sk_test".into()),
        stripe_webhook_secret: webhook_secret.map(|s| SecretString::new(s.into())),
        stripe_prices: prices,
        image_api_key: SecretString::new("image_test_key".into()),
        image_api_url: Url::parse("http://image.test/v1/images/edits").unwrap(),
        image_model: "test-model".to_string(),
        storage_url: Url::parse("http://storage.test").unwrap(),
        storage_service_key: SecretString::new("storage_test_key".into()),
        storage_bucket: "homeai".to_string(),
        default_free_base: DEFAULT_FREE_BASE,
    }
}
