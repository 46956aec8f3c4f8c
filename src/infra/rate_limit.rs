use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};

use super::InfraError;
use crate::app_error::{AppError, AppResult};

#[async_trait]
pub trait RateLimiterTrait: Send + Sync {
    /// Count a request for the IP and, when signed in, the user.
    /// Returns `Err(AppError::RateLimited)` once either budget is spent.
    async fn check(&self, ip: &str, user_id: Option<&str>) -> AppResult<()>;
}

/// Bumps every key in one round trip and returns the counts in key order.
/// A key without a TTL (new, or one that lost it) gets the window as TTL.
const BUMP_WINDOW_SCRIPT: &str = r#"
local counts = {}
for i, key in ipairs(KEYS) do
    local n = redis.call('INCR', key)
    if n == 1 or redis.call('TTL', key) == -1 then
        redis.call('EXPIRE', key, ARGV[1])
    end
    counts[i] = n
end
return counts
"#;

/// Fixed-window request counters shared across instances through Redis.
#[derive(Clone)]
pub struct RedisRateLimiter {
    manager: ConnectionManager,
    window_secs: u64,
    per_ip: u64,
    per_user: u64,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(
        redis_url: &str,
        window_secs: u64,
        per_ip: u64,
        per_user: u64,
    ) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        tracing::info!(window_secs, per_ip, per_user, "Rate limiter connected");
        Ok(Self {
            manager,
            window_secs,
            per_ip,
            per_user,
            script: Script::new(BUMP_WINDOW_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimiterTrait for RedisRateLimiter {
    async fn check(&self, ip: &str, user_id: Option<&str>) -> AppResult<()> {
        let mut budgets = vec![(format!("homerenov:rl:ip:{ip}"), self.per_ip)];
        if let Some(user_id) = user_id {
            budgets.push((format!("homerenov:rl:user:{user_id}"), self.per_user));
        }

        let mut invocation = self.script.prepare_invoke();
        for (key, _) in &budgets {
            invocation.key(key);
        }
        invocation.arg(self.window_secs);

        let mut conn = self.manager.clone();
        let counts: Vec<u64> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("rate limiter unavailable: {e}")))?;

        for ((key, limit), count) in budgets.iter().zip(counts) {
            if count > *limit {
                tracing::info!(key = %key, count, limit, "Rate limit exceeded");
                return Err(AppError::RateLimited);
            }
        }
        Ok(())
    }
}
