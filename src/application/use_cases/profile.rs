use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::profile::{Profile, ProfilePatch},
};

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<Profile>>;

    /// Insert or patch the user's profile row.
    async fn upsert(&self, user_id: Uuid, patch: &ProfilePatch) -> AppResult<()>;

    async fn find_user_by_customer(&self, customer_id: &str) -> AppResult<Option<Uuid>>;

    /// Patch every profile linked to the customer. Returns rows touched.
    async fn update_by_customer(&self, customer_id: &str, patch: &ProfilePatch) -> AppResult<u64>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileView {
    pub is_pro: bool,
    pub stripe_customer_id: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<Profile> for ProfileView {
    fn from(p: Profile) -> Self {
        Self {
            is_pro: p.is_pro,
            stripe_customer_id: p.stripe_customer_id,
            avatar_url: p.avatar_url,
        }
    }
}

#[derive(Clone)]
pub struct ProfileUseCases {
    repo: Arc<dyn ProfileRepo>,
}

impl ProfileUseCases {
    pub fn new(repo: Arc<dyn ProfileRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> AppResult<ProfileView> {
        Ok(self
            .repo
            .get(user_id)
            .await?
            .map(ProfileView::from)
            .unwrap_or_default())
    }
}
