use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::credits::CreditsRepo,
};

#[async_trait]
pub trait ReferralRepo: Send + Sync {
    /// Returns `false` when the referred user already has a referral.
    async fn create(&self, referrer_id: Uuid, referred_id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct ReferralUseCases {
    referrals: Arc<dyn ReferralRepo>,
    credits: Arc<dyn CreditsRepo>,
}

impl ReferralUseCases {
    pub fn new(referrals: Arc<dyn ReferralRepo>, credits: Arc<dyn CreditsRepo>) -> Self {
        Self { referrals, credits }
    }

    /// Credit the referrer with one extra free generation for bringing in `user_id`.
    #[instrument(skip(self))]
    pub async fn redeem(&self, user_id: Uuid, referrer_id: Option<&str>) -> AppResult<()> {
        let referrer_id = referrer_id
            .map(str::trim)
            .and_then(|s| Uuid::parse_str(s).ok())
            .filter(|id| *id != user_id)
            .ok_or_else(|| AppError::InvalidInput("Invalid referral".into()))?;

        if !self.referrals.create(referrer_id, user_id).await? {
            return Err(AppError::InvalidInput("Already referred".into()));
        }

        if self.credits.add_free_base(referrer_id, 1).await? {
            tracing::info!(%referrer_id, "Referral reward granted");
        } else {
            tracing::info!(%referrer_id, "Referrer has no credits row, reward skipped");
        }
        Ok(())
    }
}
