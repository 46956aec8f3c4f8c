use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub is_pro: bool,
    pub avatar_url: Option<String>,
}

/// Partial profile write coming from billing events.
///
/// `None` leaves a column untouched; `clear_subscription_id` nulls the
/// stored subscription id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub is_pro: Option<bool>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub clear_subscription_id: bool,
}

impl Profile {
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(is_pro) = patch.is_pro {
            self.is_pro = is_pro;
        }
        if let Some(customer) = &patch.stripe_customer_id {
            self.stripe_customer_id = Some(customer.clone());
        }
        if let Some(sub) = &patch.stripe_subscription_id {
            self.stripe_subscription_id = Some(sub.clone());
        }
        if patch.clear_subscription_id {
            self.stripe_subscription_id = None;
        }
    }
}
