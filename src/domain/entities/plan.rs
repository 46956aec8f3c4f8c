use serde::{Deserialize, Serialize};

/// Monthly generation allowance for the Pro plan.
pub const PRO_ALLOWANCE: i64 = 100;
/// Monthly generation allowance for the Pro Plus plan.
pub const PRO_PLUS_ALLOWANCE: i64 = 300;

/// Subscription tier driving the size of the paid credit pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    ProPlus,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::ProPlus => "pro_plus",
        }
    }

    /// Lenient parse used for stored values and subscription metadata.
    /// Anything unrecognized is treated as the free tier.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pro" => Plan::Pro,
            "pro_plus" | "pro-plus" | "proplus" => Plan::ProPlus,
            _ => Plan::Free,
        }
    }

    pub fn allowance(&self) -> i64 {
        match self {
            Plan::Free => 0,
            Plan::Pro => PRO_ALLOWANCE,
            Plan::ProPlus => PRO_PLUS_ALLOWANCE,
        }
    }

    /// Guess the tier from a stored paid allowance when the row has no plan label.
    pub fn infer_from_allowance(allowance: i64) -> Self {
        if allowance >= PRO_PLUS_ALLOWANCE {
            Plan::ProPlus
        } else if allowance >= PRO_ALLOWANCE {
            Plan::Pro
        } else {
            Plan::Free
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Plan::Free)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
