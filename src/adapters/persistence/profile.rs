use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::profile::ProfileRepo,
    domain::entities::profile::{Profile, ProfilePatch},
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> Profile {
    Profile {
        id: row.get("id"),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        is_pro: row.get::<Option<bool>, _>("is_pro").unwrap_or(false),
        avatar_url: row.get("avatar_url"),
    }
}

#[async_trait]
impl ProfileRepo for PostgresPersistence {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT id, stripe_customer_id, stripe_subscription_id, is_pro, avatar_url
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn upsert(&self, user_id: Uuid, patch: &ProfilePatch) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, is_pro, stripe_customer_id, stripe_subscription_id)
            VALUES ($1, COALESCE($2, false), $3, CASE WHEN $5 THEN NULL ELSE $4 END)
            ON CONFLICT (id) DO UPDATE SET
                is_pro = COALESCE($2, profiles.is_pro),
                stripe_customer_id = COALESCE($3, profiles.stripe_customer_id),
                stripe_subscription_id = CASE
                    WHEN $5 THEN NULL
                    ELSE COALESCE($4, profiles.stripe_subscription_id)
                END,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(patch.is_pro)
        .bind(&patch.stripe_customer_id)
        .bind(&patch.stripe_subscription_id)
        .bind(patch.clear_subscription_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn find_user_by_customer(&self, customer_id: &str) -> AppResult<Option<Uuid>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM profiles WHERE stripe_customer_id = $1 LIMIT 1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(id)
    }

    async fn update_by_customer(&self, customer_id: &str, patch: &ProfilePatch) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                is_pro = COALESCE($2, is_pro),
                stripe_subscription_id = CASE
                    WHEN $4 THEN NULL
                    ELSE COALESCE($3, stripe_subscription_id)
                END,
                updated_at = now()
            WHERE stripe_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .bind(patch.is_pro)
        .bind(&patch.stripe_subscription_id)
        .bind(patch.clear_subscription_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
