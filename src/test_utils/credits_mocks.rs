//! In-memory mock implementations for the credit ledger.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{credits::CreditsRepo, referral::ReferralRepo},
    domain::entities::{
        credits::{CreditAccount, CreditPool},
        subscription::CreditsUpdate,
    },
    infra::rate_limit::RateLimiterTrait,
};

// ============================================================================
// InMemoryCreditsRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryCreditsRepo {
    pub accounts: Mutex<HashMap<Uuid, CreditAccount>>,
    /// Pending competing writes; each one bumps the counter right before a
    /// compare-and-set so that it fails.
    interference: Mutex<usize>,
    outage: Mutex<Option<Outage>>,
}

/// Simulated database outage that starts after some successful writes.
#[derive(Clone, Copy)]
struct Outage {
    writes_left: usize,
    reads_too: bool,
}

impl InMemoryCreditsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<CreditAccount>) -> Self {
        let repo = Self::new();
        for account in accounts {
            repo.insert(account);
        }
        repo
    }

    pub fn insert(&self, account: CreditAccount) {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.user_id, account);
    }

    pub fn account(&self, user_id: Uuid) -> Option<CreditAccount> {
        self.accounts.lock().unwrap().get(&user_id).cloned()
    }

    pub fn update_account(&self, user_id: Uuid, f: impl FnOnce(&mut CreditAccount)) {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&user_id) {
            f(account);
        }
    }

    /// Make the next `n` compare-and-set calls lose a race.
    pub fn interfere_next(&self, n: usize) {
        *self.interference.lock().unwrap() = n;
    }

    /// Every call errors once `writes` compare-and-sets have succeeded.
    pub fn fail_after_writes(&self, writes: usize) {
        *self.outage.lock().unwrap() = Some(Outage {
            writes_left: writes,
            reads_too: true,
        });
    }

    /// Like `fail_after_writes`, but reads keep working.
    pub fn fail_writes_after(&self, writes: usize) {
        *self.outage.lock().unwrap() = Some(Outage {
            writes_left: writes,
            reads_too: false,
        });
    }

    fn check_outage(&self, is_write: bool) -> AppResult<()> {
        match *self.outage.lock().unwrap() {
            Some(o) if o.writes_left == 0 && (is_write || o.reads_too) => {
                Err(AppError::Database("connection refused".into()))
            }
            _ => Ok(()),
        }
    }

    fn count_write(&self) {
        if let Some(o) = self.outage.lock().unwrap().as_mut() {
            o.writes_left = o.writes_left.saturating_sub(1);
        }
    }
}

#[async_trait]
impl CreditsRepo for InMemoryCreditsRepo {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<CreditAccount>> {
        self.check_outage(false)?;
        Ok(self.account(user_id))
    }

    async fn ensure(&self, user_id: Uuid, free_base: i64) -> AppResult<()> {
        self.check_outage(false)?;
        self.accounts
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| CreditAccount::empty(user_id, free_base));
        Ok(())
    }

    async fn compare_and_set_used(
        &self,
        user_id: Uuid,
        pool: CreditPool,
        expected: i64,
        new: i64,
    ) -> AppResult<bool> {
        self.check_outage(true)?;
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&user_id) else {
            return Ok(false);
        };

        let mut interference = self.interference.lock().unwrap();
        if *interference > 0 {
            *interference -= 1;
            *account.used_mut(pool) += 1;
        }

        let used = account.used_mut(pool);
        if *used != expected {
            return Ok(false);
        }
        *used = new;
        self.count_write();
        Ok(true)
    }

    async fn apply_subscription(
        &self,
        user_id: Uuid,
        update: &CreditsUpdate,
        free_base: i64,
    ) -> AppResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .entry(user_id)
            .or_insert_with(|| CreditAccount::empty(user_id, free_base));
        account.plan = Some(update.plan);
        account.paid_allowance = update.paid_allowance;
        account.paid_period_start = update.period.start;
        account.paid_period_end = update.period.end;
        if update.reset_paid_used {
            account.paid_used = 0;
        }
        Ok(())
    }

    async fn add_free_base(&self, user_id: Uuid, delta: i64) -> AppResult<bool> {
        match self.accounts.lock().unwrap().get_mut(&user_id) {
            Some(account) => {
                account.free_base += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// InMemoryReferralRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryReferralRepo {
    /// referred -> (referrer, created_at)
    pub referrals: Mutex<HashMap<Uuid, (Uuid, chrono::DateTime<Utc>)>>,
}

impl InMemoryReferralRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralRepo for InMemoryReferralRepo {
    async fn create(&self, referrer_id: Uuid, referred_id: Uuid) -> AppResult<bool> {
        let mut referrals = self.referrals.lock().unwrap();
        if referrals.contains_key(&referred_id) {
            return Ok(false);
        }
        referrals.insert(referred_id, (referrer_id, Utc::now()));
        Ok(true)
    }
}

// ============================================================================
// InMemoryRateLimiter
// ============================================================================

pub struct InMemoryRateLimiter {
    counts: Mutex<HashMap<String, u64>>,
    max_per_ip: u64,
    max_per_user: u64,
}

impl InMemoryRateLimiter {
    pub fn new(max_per_ip: u64, max_per_user: u64) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_per_ip,
            max_per_user,
        }
    }

    /// A rate limiter that never blocks (for most tests).
    pub fn permissive() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }

    pub fn keys(&self) -> HashSet<String> {
        self.counts.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl RateLimiterTrait for InMemoryRateLimiter {
    async fn check(&self, ip: &str, user_id: Option<&str>) -> AppResult<()> {
        let mut counts = self.counts.lock().unwrap();

        let ip_count = counts.entry(format!("rate:ip:{ip}")).or_insert(0);
        *ip_count += 1;
        if *ip_count > self.max_per_ip {
            return Err(AppError::RateLimited);
        }

        if let Some(user_id) = user_id {
            let user_count = counts.entry(format!("rate:user:{user_id}")).or_insert(0);
            *user_count += 1;
            if *user_count > self.max_per_user {
                return Err(AppError::RateLimited);
            }
        }
        Ok(())
    }
}
