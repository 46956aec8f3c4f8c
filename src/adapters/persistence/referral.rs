use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, is_unique_violation},
    app_error::{AppError, AppResult},
    application::use_cases::referral::ReferralRepo,
};

#[async_trait]
impl ReferralRepo for PostgresPersistence {
    async fn create(&self, referrer_id: Uuid, referred_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("INSERT INTO referrals (referrer_id, referred_id) VALUES ($1, $2)")
            .bind(referrer_id)
            .bind(referred_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::from(e)),
        }
    }
}
