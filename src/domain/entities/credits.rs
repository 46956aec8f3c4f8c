use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::Plan;

/// Free generations granted to a user whose credits row does not set `free_base`.
pub const DEFAULT_FREE_BASE: i64 = 3;

/// Remaining balance of a pool, clamped at zero.
pub fn remaining(allowance: i64, used: i64) -> i64 {
    allowance.saturating_sub(used).max(0)
}

/// One of the three independent counters a generation can be paid from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditPool {
    Paid,
    Bonus,
    Free,
}

impl CreditPool {
    /// Consumption order: subscription credits first, then referral bonus, then free.
    pub const PRIORITY: [CreditPool; 3] = [CreditPool::Paid, CreditPool::Bonus, CreditPool::Free];

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditPool::Paid => "paid",
            CreditPool::Bonus => "bonus",
            CreditPool::Free => "free",
        }
    }

    /// Usage column in `user_credits` incremented when this pool is spent.
    pub fn used_column(&self) -> &'static str {
        match self {
            CreditPool::Paid => "paid_used",
            CreditPool::Bonus => "bonus_referrals_used",
            CreditPool::Free => "free_used",
        }
    }
}

impl std::fmt::Display for CreditPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's credit counters as stored in `user_credits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditAccount {
    pub user_id: Uuid,
    /// Stored plan label; `None` when the row predates plan tracking.
    pub plan: Option<Plan>,
    pub free_base: i64,
    pub free_used: i64,
    pub bonus_total: i64,
    pub bonus_used: i64,
    pub paid_allowance: i64,
    pub paid_used: i64,
    pub paid_period_start: Option<DateTime<Utc>>,
    pub paid_period_end: Option<DateTime<Utc>>,
}

impl CreditAccount {
    /// Account for a user without a credits row.
    pub fn empty(user_id: Uuid, free_base: i64) -> Self {
        Self {
            user_id,
            plan: None,
            free_base,
            free_used: 0,
            bonus_total: 0,
            bonus_used: 0,
            paid_allowance: 0,
            paid_used: 0,
            paid_period_start: None,
            paid_period_end: None,
        }
    }

    pub fn plan(&self) -> Plan {
        self.plan
            .unwrap_or_else(|| Plan::infer_from_allowance(self.paid_allowance))
    }

    /// Spendable balance of a pool. Free credits only count on the free plan.
    pub fn remaining_in(&self, pool: CreditPool) -> i64 {
        match pool {
            CreditPool::Paid => remaining(self.paid_allowance, self.paid_used),
            CreditPool::Bonus => remaining(self.bonus_total, self.bonus_used),
            CreditPool::Free => {
                if self.plan().is_free() {
                    remaining(self.free_base, self.free_used)
                } else {
                    0
                }
            }
        }
    }

    pub fn used(&self, pool: CreditPool) -> i64 {
        match pool {
            CreditPool::Paid => self.paid_used,
            CreditPool::Bonus => self.bonus_used,
            CreditPool::Free => self.free_used,
        }
    }

    pub fn used_mut(&mut self, pool: CreditPool) -> &mut i64 {
        match pool {
            CreditPool::Paid => &mut self.paid_used,
            CreditPool::Bonus => &mut self.bonus_used,
            CreditPool::Free => &mut self.free_used,
        }
    }

    pub fn balance(&self) -> CreditBalance {
        let free_remaining = self.remaining_in(CreditPool::Free);
        let bonus_remaining = self.remaining_in(CreditPool::Bonus);
        let paid_remaining = self.remaining_in(CreditPool::Paid);

        CreditBalance {
            plan: self.plan(),
            free_remaining,
            bonus_remaining,
            paid_remaining,
            total_remaining: free_remaining + bonus_remaining + paid_remaining,
        }
    }

    /// First pool with a positive balance, in `CreditPool::PRIORITY` order.
    pub fn next_pool(&self) -> Option<CreditPool> {
        CreditPool::PRIORITY
            .into_iter()
            .find(|pool| self.remaining_in(*pool) > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditBalance {
    pub plan: Plan,
    pub free_remaining: i64,
    pub bonus_remaining: i64,
    pub paid_remaining: i64,
    pub total_remaining: i64,
}
