//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    application::ports::billing_provider::SubscriptionSnapshot,
    domain::entities::{
        credits::CreditAccount,
        gallery_item::GalleryItem,
        subscription::{BillingPeriod, SubscriptionStatus},
    },
};

/// Create a credits row with all counters at zero.
pub fn create_test_account(
    user_id: Uuid,
    overrides: impl FnOnce(&mut CreditAccount),
) -> CreditAccount {
    let mut account = CreditAccount {
        user_id,
        plan: None,
        free_base: 0,
        free_used: 0,
        bonus_total: 0,
        bonus_used: 0,
        paid_allowance: 0,
        paid_used: 0,
        paid_period_start: None,
        paid_period_end: None,
    };
    overrides(&mut account);
    account
}

/// Create an active pro subscription for customer `cus_test`.
pub fn create_test_subscription(
    overrides: impl FnOnce(&mut SubscriptionSnapshot),
) -> SubscriptionSnapshot {
    let mut sub = SubscriptionSnapshot {
        id: "sub_test".to_string(),
        customer_id: Some("cus_test".to_string()),
        status: SubscriptionStatus::Active,
        price_id: Some("price_pro".to_string()),
        metadata_plan: None,
        metadata_user_id: None,
        period: BillingPeriod::from_unix(Some(1_700_000_000), Some(1_702_592_000)),
    };
    overrides(&mut sub);
    sub
}

/// Create a gallery item owned by `user_id`.
pub fn create_test_gallery_item(
    user_id: Uuid,
    overrides: impl FnOnce(&mut GalleryItem),
) -> GalleryItem {
    let id = Uuid::new_v4();
    let mut item = GalleryItem {
        id,
        user_id,
        room_type: "living_room".to_string(),
        style: "Modern".to_string(),
        prompt: "Interior design style: Modern".to_string(),
        image_url: format!("{user_id}/{id}/final.jpg"),
        thumb_url: Some(format!("{user_id}/{id}/thumb.jpg")),
        is_favorite: false,
        created_at: Some(test_datetime()),
    };
    overrides(&mut item);
    item
}

/// Fixed timestamp for deterministic tests.
pub fn test_datetime() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}
