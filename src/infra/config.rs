use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::domain::entities::{credits::DEFAULT_FREE_BASE, subscription::PriceIds};

pub const DEFAULT_IMAGE_API_URL: &str = "https://api.openai.com/v1/images/edits";
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1-mini";

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Public URL of the web app; checkout and portal return here.
    pub app_url: Url,
    pub cors_origin: HeaderValue,
    /// Secret the auth provider signs access tokens with.
    pub jwt_secret: SecretString,
    pub jwt_audience: String,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub rate_limit_per_user: u64,
    /// Whether to trust X-Forwarded-For headers. Only enable behind a reverse proxy.
    pub trust_proxy: bool,
    pub stripe_secret_key: SecretString,
    /// Webhooks are rejected while this is unset.
    pub stripe_webhook_secret: Option<SecretString>,
    pub stripe_prices: PriceIds,
    pub image_api_key: SecretString,
    pub image_api_url: Url,
    pub image_model: String,
    pub storage_url: Url,
    pub storage_service_key: SecretString,
    pub storage_bucket: String,
    pub default_free_base: i64,
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let database_url: String = get_env("DATABASE_URL");
        let app_url: Url = get_env_default(
            "APP_URL",
            Url::parse("http://localhost:3000").expect("static URL is valid"),
        );
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let jwt_secret = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let jwt_audience: String = get_env_default("JWT_AUDIENCE", "authenticated".to_string());

        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 60);
        let rate_limit_per_user: u64 = get_env_default("RATE_LIMIT_PER_USER", 30);
        // Default to false - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);

        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            optional_env("STRIPE_WEBHOOK_SECRET").map(|s| SecretString::new(s.into()));
        let stripe_prices = PriceIds {
            pro: optional_env("STRIPE_PRICE_ID_PRO"),
            pro_plus: optional_env("STRIPE_PRICE_ID_PRO_PLUS"),
        };

        let image_api_key = SecretString::new(get_env::<String>("IMAGE_API_KEY").into());
        let image_api_url: Url = get_env_default(
            "IMAGE_API_URL",
            Url::parse(DEFAULT_IMAGE_API_URL).expect("static URL is valid"),
        );
        let image_model: String = get_env_default("IMAGE_MODEL", DEFAULT_IMAGE_MODEL.to_string());

        let storage_url: Url = get_env("STORAGE_URL");
        let storage_service_key =
            SecretString::new(get_env::<String>("STORAGE_SERVICE_KEY").into());
        let storage_bucket: String = get_env_default("STORAGE_BUCKET", "homeai".to_string());

        let default_free_base: i64 = get_env_default("DEFAULT_FREE_BASE", DEFAULT_FREE_BASE);

        Self {
            bind_addr,
            database_url,
            app_url,
            cors_origin,
            jwt_secret,
            jwt_audience,
            redis_url,
            rate_limit_window_secs,
            rate_limit_per_ip,
            rate_limit_per_user,
            trust_proxy,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_prices,
            image_api_key,
            image_api_url,
            image_model,
            storage_url,
            storage_service_key,
            storage_bucket,
            default_free_base,
        }
    }

    /// `APP_URL` without a trailing slash.
    pub fn app_base_url(&self) -> String {
        self.app_url.as_str().trim_end_matches('/').to_string()
    }
}
