use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    application::use_cases::{
        billing::BillingUseCases, credits::CreditUseCases, gallery::GalleryUseCases,
        generate::GenerateUseCases, profile::ProfileUseCases, referral::ReferralUseCases,
    },
    infra::{RateLimiterTrait, config::AppConfig},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credit_use_cases: Arc<CreditUseCases>,
    pub generate_use_cases: Arc<GenerateUseCases>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub referral_use_cases: Arc<ReferralUseCases>,
    pub gallery_use_cases: Arc<GalleryUseCases>,
    pub profile_use_cases: Arc<ProfileUseCases>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
}

impl FromRef<AppState> for Arc<CreditUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.credit_use_cases.clone()
    }
}

impl FromRef<AppState> for Arc<GalleryUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.gallery_use_cases.clone()
    }
}
