use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        credits::{CreditAccount, CreditBalance, CreditPool},
        subscription::{BillingPeriod, CreditsUpdate, PaidState},
    },
};

/// Attempts at the compare-and-swap before giving up with `Conflict`.
pub const MAX_CONSUME_ATTEMPTS: usize = 5;

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait CreditsRepo: Send + Sync {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<CreditAccount>>;

    /// Insert a zeroed row for the user unless one exists.
    async fn ensure(&self, user_id: Uuid, free_base: i64) -> AppResult<()>;

    /// Set the pool's usage counter to `new` only if it still equals
    /// `expected`. Returns `false` when another writer got there first.
    async fn compare_and_set_used(
        &self,
        user_id: Uuid,
        pool: CreditPool,
        expected: i64,
        new: i64,
    ) -> AppResult<bool>;

    /// Write plan, allowance and period (and reset `paid_used` when asked),
    /// creating the row if needed.
    async fn apply_subscription(
        &self,
        user_id: Uuid,
        update: &CreditsUpdate,
        free_base: i64,
    ) -> AppResult<()>;

    /// Returns `false` when the user has no credits row.
    async fn add_free_base(&self, user_id: Uuid, delta: i64) -> AppResult<bool>;
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreditsSummary {
    #[serde(flatten)]
    pub balance: CreditBalance,
    pub paid_period_start: Option<DateTime<Utc>>,
    pub paid_period_end: Option<DateTime<Utc>>,
}

/// Record of a spent credit, needed to give it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumption {
    pub pool: CreditPool,
    pub used_before: i64,
}

pub fn paid_state(account: &CreditAccount) -> PaidState {
    PaidState {
        plan: account.plan,
        period: BillingPeriod {
            start: account.paid_period_start,
            end: account.paid_period_end,
        },
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct CreditUseCases {
    repo: Arc<dyn CreditsRepo>,
    free_base: i64,
}

impl CreditUseCases {
    pub fn new(repo: Arc<dyn CreditsRepo>, free_base: i64) -> Self {
        Self { repo, free_base }
    }

    pub fn free_base(&self) -> i64 {
        self.free_base
    }

    async fn load(&self, user_id: Uuid) -> AppResult<CreditAccount> {
        Ok(self
            .repo
            .get(user_id)
            .await?
            .unwrap_or_else(|| CreditAccount::empty(user_id, self.free_base)))
    }

    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: Uuid) -> AppResult<CreditsSummary> {
        let account = self.load(user_id).await?;
        Ok(CreditsSummary {
            balance: account.balance(),
            paid_period_start: account.paid_period_start,
            paid_period_end: account.paid_period_end,
        })
    }

    /// Spend one credit from the highest-priority pool that has balance.
    #[instrument(skip(self))]
    pub async fn consume(&self, user_id: Uuid) -> AppResult<Consumption> {
        self.repo.ensure(user_id, self.free_base).await?;

        for attempt in 1..=MAX_CONSUME_ATTEMPTS {
            let account = self
                .repo
                .get(user_id)
                .await?
                .ok_or_else(|| AppError::Internal("credits row missing after insert".into()))?;

            let pool = account.next_pool().ok_or(AppError::CreditsExhausted)?;
            let used_before = account.used(pool);

            if self
                .repo
                .compare_and_set_used(user_id, pool, used_before, used_before + 1)
                .await?
            {
                tracing::debug!(%pool, used_before, attempt, "Credit consumed");
                return Ok(Consumption { pool, used_before });
            }

            tracing::debug!(%pool, attempt, "Lost credit update race, retrying");
        }

        tracing::warn!(%user_id, "Giving up on credit consumption after repeated conflicts");
        Err(AppError::Conflict)
    }

    /// Give back a credit taken by `consume`.
    ///
    /// Only undoes the exact increment that was made: if the counter moved
    /// since, nothing is written. Never fails; problems are logged.
    #[instrument(skip(self))]
    pub async fn refund(&self, user_id: Uuid, consumption: Consumption) -> bool {
        let Consumption { pool, used_before } = consumption;
        let expected = used_before + 1;

        let account = match self.repo.get(user_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::warn!(%user_id, "Refund skipped: no credits row");
                return false;
            }
            Err(e) => {
                tracing::error!(error = %e, "Refund failed to read credits");
                return false;
            }
        };

        let current = account.used(pool);
        if current != expected {
            tracing::warn!(%pool, current, expected, "Refund skipped: counter moved");
            return false;
        }

        match self
            .repo
            .compare_and_set_used(user_id, pool, expected, used_before)
            .await
        {
            Ok(true) => {
                tracing::info!(%pool, "Credit refunded");
                true
            }
            Ok(false) => {
                tracing::warn!(%pool, "Refund skipped: concurrent update");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Refund write failed");
                false
            }
        }
    }
}
