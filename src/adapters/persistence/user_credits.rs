use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, first_i64, first_present},
    app_error::{AppError, AppResult},
    application::use_cases::credits::CreditsRepo,
    domain::entities::{
        credits::{CreditAccount, CreditPool, DEFAULT_FREE_BASE},
        plan::Plan,
        subscription::CreditsUpdate,
    },
};

const BONUS_TOTAL_KEYS: [&str; 4] = [
    "bonus_referrals_total",
    "bonus_referral_total",
    "bonus_total",
    "bonus_earned",
];
const BONUS_USED_KEYS: [&str; 3] = ["bonus_referrals_used", "bonus_referral_used", "bonus_used"];

/// Column holding `pool`'s usage for this row: the same one reads take the
/// counter from, so a compare-and-set checks the value the caller saw.
fn used_column_for(raw: &Value, pool: CreditPool) -> &'static str {
    match pool {
        CreditPool::Bonus => first_present(raw, &BONUS_USED_KEYS)
            .map(|(column, _)| column)
            .unwrap_or_else(|| pool.used_column()),
        _ => pool.used_column(),
    }
}

fn row_to_account(row: sqlx::postgres::PgRow) -> CreditAccount {
    let raw: Value = row.get("raw");
    let plan: Option<String> = row.get("plan");

    CreditAccount {
        user_id: row.get("user_id"),
        plan: plan
            .filter(|p| !p.trim().is_empty())
            .map(|p| Plan::from_str_lossy(&p)),
        free_base: first_i64(&raw, &["free_base"]).unwrap_or(DEFAULT_FREE_BASE),
        free_used: first_i64(&raw, &["free_used"]).unwrap_or(0),
        bonus_total: first_i64(&raw, &BONUS_TOTAL_KEYS).unwrap_or(0),
        bonus_used: first_i64(&raw, &BONUS_USED_KEYS).unwrap_or(0),
        paid_allowance: first_i64(&raw, &["paid_monthly_allowance"]).unwrap_or(0),
        paid_used: first_i64(&raw, &["paid_used"]).unwrap_or(0),
        paid_period_start: row.get::<Option<DateTime<Utc>>, _>("paid_period_start"),
        paid_period_end: row.get::<Option<DateTime<Utc>>, _>("paid_period_end"),
    }
}

#[async_trait]
impl CreditsRepo for PostgresPersistence {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<CreditAccount>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, plan, paid_period_start, paid_period_end, to_jsonb(uc) AS raw
            FROM user_credits uc
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_account))
    }

    async fn ensure(&self, user_id: Uuid, free_base: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_credits (user_id, free_base)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(free_base)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn compare_and_set_used(
        &self,
        user_id: Uuid,
        pool: CreditPool,
        expected: i64,
        new: i64,
    ) -> AppResult<bool> {
        let column = match pool {
            CreditPool::Bonus => {
                let raw: Option<Value> = sqlx::query_scalar(
                    "SELECT to_jsonb(uc) FROM user_credits uc WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::from)?;
                match raw {
                    Some(raw) => used_column_for(&raw, pool),
                    None => return Ok(false),
                }
            }
            _ => pool.used_column(),
        };
        let result = sqlx::query(&format!(
            "UPDATE user_credits SET {column} = $3, updated_at = now() \
             WHERE user_id = $1 AND COALESCE({column}, 0) = $2"
        ))
        .bind(user_id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() == 1)
    }

    async fn apply_subscription(
        &self,
        user_id: Uuid,
        update: &CreditsUpdate,
        free_base: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_credits
                (user_id, free_base, plan, paid_monthly_allowance, paid_used,
                 paid_period_start, paid_period_end, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $6, now())
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                paid_monthly_allowance = EXCLUDED.paid_monthly_allowance,
                paid_period_start = EXCLUDED.paid_period_start,
                paid_period_end = EXCLUDED.paid_period_end,
                paid_used = CASE WHEN $7 THEN 0 ELSE COALESCE(user_credits.paid_used, 0) END,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(free_base)
        .bind(update.plan.as_str())
        .bind(update.paid_allowance)
        .bind(update.period.start)
        .bind(update.period.end)
        .bind(update.reset_paid_used)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn add_free_base(&self, user_id: Uuid, delta: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_credits
            SET free_base = COALESCE(free_base, $3) + $2, updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .bind(DEFAULT_FREE_BASE)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
