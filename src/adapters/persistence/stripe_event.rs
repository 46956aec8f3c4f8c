use async_trait::async_trait;

use crate::{
    adapters::persistence::{PostgresPersistence, is_unique_violation},
    app_error::{AppError, AppResult},
    application::use_cases::billing::StripeEventRepo,
};

#[async_trait]
impl StripeEventRepo for PostgresPersistence {
    async fn mark_processed(&self, event_id: &str) -> AppResult<bool> {
        let result = sqlx::query("INSERT INTO stripe_events (id) VALUES ($1)")
            .bind(event_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn release(&self, event_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM stripe_events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
