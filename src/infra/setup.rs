use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        billing::{BillingUseCases, StripeEventRepo},
        credits::{CreditUseCases, CreditsRepo},
        gallery::{GalleryRepo, GalleryUseCases},
        generate::{GenerateUseCases, RetryPolicy},
        profile::{ProfileRepo, ProfileUseCases},
        referral::{ReferralRepo, ReferralUseCases},
    },
    infra::{
        config::AppConfig,
        http_client::{IMAGE_REQUEST_TIMEOUT, build_client, build_client_with_timeout},
        image_client::ImageApiClient,
        postgres_persistence,
        rate_limit::RedisRateLimiter,
        storage_client::StorageClient,
        stripe_client::StripeClient,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let rate_limiter = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
            config.rate_limit_per_user,
        )
        .await?,
    );

    let credits_repo = postgres_arc.clone() as Arc<dyn CreditsRepo>;
    let profile_repo = postgres_arc.clone() as Arc<dyn ProfileRepo>;
    let event_repo = postgres_arc.clone() as Arc<dyn StripeEventRepo>;
    let gallery_repo = postgres_arc.clone() as Arc<dyn GalleryRepo>;
    let referral_repo = postgres_arc.clone() as Arc<dyn ReferralRepo>;

    let stripe = Arc::new(StripeClient::new(
        build_client()?,
        config.stripe_secret_key.clone(),
    ));
    let image_api = Arc::new(ImageApiClient::new(
        build_client_with_timeout(IMAGE_REQUEST_TIMEOUT)?,
        config.image_api_url.clone(),
        config.image_api_key.clone(),
        config.image_model.clone(),
    ));
    let storage = Arc::new(StorageClient::new(
        build_client()?,
        &config.storage_url,
        config.storage_service_key.clone(),
        config.storage_bucket.clone(),
    ));

    let credit_use_cases = CreditUseCases::new(credits_repo.clone(), config.default_free_base);
    let generate_use_cases =
        GenerateUseCases::new(credit_use_cases.clone(), image_api, RetryPolicy::default());
    let billing_use_cases = BillingUseCases::new(
        stripe,
        event_repo,
        profile_repo.clone(),
        credits_repo.clone(),
        config.stripe_prices.clone(),
        &config.app_base_url(),
        config.default_free_base,
    );
    let referral_use_cases = ReferralUseCases::new(referral_repo, credits_repo);
    let gallery_use_cases = GalleryUseCases::new(gallery_repo, storage);
    let profile_use_cases = ProfileUseCases::new(profile_repo);

    Ok(AppState {
        config: Arc::new(config),
        credit_use_cases: Arc::new(credit_use_cases),
        generate_use_cases: Arc::new(generate_use_cases),
        billing_use_cases: Arc::new(billing_use_cases),
        referral_use_cases: Arc::new(referral_use_cases),
        gallery_use_cases: Arc::new(gallery_use_cases),
        profile_use_cases: Arc::new(profile_use_cases),
        rate_limiter,
    })
}

pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "homerenov_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log")?;
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();

    Ok(())
}
