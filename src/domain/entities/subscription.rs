use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Trialing,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
        }
    }

    /// Convert from Stripe subscription status string.
    /// Unknown values map to `Incomplete` so access is never granted by default.
    pub fn from_stripe(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "trialing" => SubscriptionStatus::Trialing,
            "incomplete" => SubscriptionStatus::Incomplete,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "unpaid" => SubscriptionStatus::Unpaid,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Incomplete,
        }
    }

    /// Returns true if the user should hold a paid plan
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

/// Billing period bounds of the current subscription cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BillingPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BillingPeriod {
    pub fn from_unix(start: Option<i64>, end: Option<i64>) -> Self {
        Self {
            start: start.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)),
            end: end.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0)),
        }
    }
}

/// Configured billing-provider price ids for each paid tier.
#[derive(Debug, Clone, Default)]
pub struct PriceIds {
    pub pro: Option<String>,
    pub pro_plus: Option<String>,
}

impl PriceIds {
    pub fn for_plan(&self, plan: Plan) -> Option<&str> {
        match plan {
            Plan::Pro => self.pro.as_deref(),
            Plan::ProPlus => self.pro_plus.as_deref(),
            Plan::Free => None,
        }
    }
}

/// Work out which tier a subscription grants.
///
/// The price id is matched against the configured prices first; the
/// subscription's `metadata.plan` is the fallback.
pub fn detect_plan(price_id: Option<&str>, metadata_plan: Option<&str>, prices: &PriceIds) -> Plan {
    if let Some(price_id) = price_id.filter(|p| !p.is_empty()) {
        if prices.pro_plus.as_deref() == Some(price_id) {
            return Plan::ProPlus;
        }
        if prices.pro.as_deref() == Some(price_id) {
            return Plan::Pro;
        }
    }

    match metadata_plan {
        Some("pro_plus") => Plan::ProPlus,
        Some("pro") => Plan::Pro,
        _ => Plan::Free,
    }
}

/// Paid-pool fields currently stored for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidState {
    /// Stored plan label; missing labels compare as free.
    pub plan: Option<Plan>,
    pub period: BillingPeriod,
}

/// What an active subscription says the paid pool should look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTarget {
    pub plan: Plan,
    pub period: BillingPeriod,
}

/// Changes to write to `user_credits` after a subscription event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditsUpdate {
    pub plan: Plan,
    pub paid_allowance: i64,
    pub period: BillingPeriod,
    pub reset_paid_used: bool,
}

/// Decide the paid-pool update for a subscription event.
///
/// `target` is `None` when the user should no longer hold a paid plan; the
/// pool is then zeroed and the period cleared. Otherwise plan, allowance and
/// period follow the subscription and `paid_used` is reset only when a new
/// billing cycle started or the plan changed.
pub fn reconcile(
    current: Option<&PaidState>,
    target: Option<&SubscriptionTarget>,
) -> CreditsUpdate {
    let Some(target) = target else {
        return CreditsUpdate {
            plan: Plan::Free,
            paid_allowance: 0,
            period: BillingPeriod::default(),
            reset_paid_used: true,
        };
    };

    let prev_period = current.map(|c| c.period).unwrap_or_default();
    let prev_plan = current.and_then(|c| c.plan).unwrap_or(Plan::Free);

    let start_changed = target.period.start.is_some() && target.period.start != prev_period.start;
    let end_changed = target.period.end.is_some() && target.period.end != prev_period.end;

    CreditsUpdate {
        plan: target.plan,
        paid_allowance: target.plan.allowance(),
        period: target.period,
        reset_paid_used: start_changed || end_changed || target.plan != prev_plan,
    }
}
