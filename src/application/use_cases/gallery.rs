use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::object_storage::ObjectStoragePort,
        use_cases::generate::{MAX_IMAGE_BYTES, MAX_IMAGE_MB, UploadedImage},
    },
    domain::entities::gallery_item::{GalleryItem, legacy_thumb_path, storage_paths},
};

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait GalleryRepo: Send + Sync {
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<GalleryItem>>;

    async fn insert(&self, item: &GalleryItem) -> AppResult<()>;

    /// Returns `false` when no item with that id belongs to the user.
    async fn set_favorite(&self, user_id: Uuid, id: Uuid, is_favorite: bool) -> AppResult<bool>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<GalleryItem>>;
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewGalleryItem {
    pub id: Option<Uuid>,
    pub room_type: String,
    pub style: String,
    pub prompt: String,
    pub image: UploadedImage,
    pub thumb: Option<UploadedImage>,
}

/// Gallery item with browser-loadable URLs for its stored images.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryItemView {
    #[serde(flatten)]
    pub item: GalleryItem,
    pub image_src: String,
    pub thumb_src: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub user_id: Uuid,
    pub total_in_storage: usize,
    pub total_kept_from_db: usize,
    pub removed_count: usize,
    pub removed_paths: Vec<String>,
}

/// Storage paths referenced by the user's gallery, including legacy
/// `-thumb` siblings of each image.
pub fn keep_set(items: &[GalleryItem]) -> HashSet<String> {
    let mut keep = HashSet::new();
    for item in items {
        if !item.image_url.is_empty() {
            keep.insert(item.image_url.clone());
            if let Some(legacy) = legacy_thumb_path(&item.image_url) {
                keep.insert(legacy);
            }
        }
        if let Some(thumb) = item.thumb_url.as_ref().filter(|t| !t.is_empty()) {
            keep.insert(thumb.clone());
        }
    }
    keep
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct GalleryUseCases {
    repo: Arc<dyn GalleryRepo>,
    storage: Arc<dyn ObjectStoragePort>,
}

impl GalleryUseCases {
    pub fn new(repo: Arc<dyn GalleryRepo>, storage: Arc<dyn ObjectStoragePort>) -> Self {
        Self { repo, storage }
    }

    fn view(&self, item: GalleryItem) -> GalleryItemView {
        GalleryItemView {
            image_src: self.storage.public_url(&item.image_url),
            thumb_src: item.thumb_url.as_deref().map(|t| self.storage.public_url(t)),
            item,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<GalleryItemView>> {
        let items = self.repo.list_by_user(user_id).await?;
        Ok(items.into_iter().map(|i| self.view(i)).collect())
    }

    /// Upload the image (and thumbnail) then record the item.
    #[instrument(skip(self, input), fields(item_id = tracing::field::Empty))]
    pub async fn save(&self, user_id: Uuid, input: NewGalleryItem) -> AppResult<GalleryItemView> {
        if input.image.bytes.is_empty() {
            return Err(AppError::InvalidInput("No image received.".into()));
        }
        if input.image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "Image too large. Max allowed is {MAX_IMAGE_MB}MB."
            )));
        }

        let item_id = input.id.unwrap_or_else(Uuid::new_v4);
        tracing::Span::current().record("item_id", tracing::field::display(item_id));

        let content_type = input
            .image
            .content_type
            .clone()
            .unwrap_or_else(|| "image/jpeg".to_string());
        let (full_path, thumb_path) = storage_paths(user_id, item_id, &content_type);

        // No thumbnail from the client: the full image stands in for it.
        let thumb_bytes = match input.thumb {
            Some(thumb) if !thumb.bytes.is_empty() => thumb.bytes,
            _ => input.image.bytes.clone(),
        };

        self.storage
            .upload(&full_path, input.image.bytes, &content_type)
            .await?;

        let item = GalleryItem {
            id: item_id,
            user_id,
            room_type: input.room_type,
            style: input.style,
            prompt: input.prompt,
            image_url: full_path.clone(),
            thumb_url: Some(thumb_path.clone()),
            is_favorite: false,
            created_at: Some(Utc::now()),
        };

        let recorded = async {
            self.storage
                .upload(&thumb_path, thumb_bytes, "image/jpeg")
                .await?;
            self.repo.insert(&item).await
        }
        .await;

        // Uploads are not upserts: leftovers would block a retry with the same id.
        if let Err(e) = recorded {
            if let Err(cleanup) = self.storage.remove(&[full_path, thumb_path]).await {
                tracing::warn!(error = %cleanup, "Failed to remove uploads of unsaved item");
            }
            return Err(e);
        }

        tracing::info!("Gallery item saved");
        Ok(self.view(item))
    }

    #[instrument(skip(self))]
    pub async fn set_favorite(&self, user_id: Uuid, id: Uuid, is_favorite: bool) -> AppResult<()> {
        if self.repo.set_favorite(user_id, id, is_favorite).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    /// Delete the row, then its stored objects. Object removal failures
    /// leave orphans for `cleanup_orphans`.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        let item = self.repo.delete(user_id, id).await?.ok_or(AppError::NotFound)?;

        let mut paths = vec![item.image_url];
        paths.extend(item.thumb_url);
        if let Err(e) = self.storage.remove(&paths).await {
            tracing::warn!(error = %e, "Failed to remove gallery objects");
        }
        Ok(())
    }

    /// Every object path under the user's folder, descending into sub-folders.
    async fn list_user_objects(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let mut pending = vec![user_id.to_string()];
        let mut files = Vec::new();

        while let Some(prefix) = pending.pop() {
            for entry in self.storage.list(&prefix).await? {
                if entry.name.is_empty() || entry.name.ends_with('/') {
                    continue;
                }
                let path = format!("{prefix}/{}", entry.name);
                if entry.is_folder {
                    pending.push(path);
                } else {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Remove stored objects no gallery row refers to.
    #[instrument(skip(self))]
    pub async fn cleanup_orphans(&self, user_id: Uuid) -> AppResult<CleanupReport> {
        let keep = keep_set(&self.repo.list_by_user(user_id).await?);
        let all_paths = self.list_user_objects(user_id).await?;

        let orphans: Vec<String> = all_paths
            .iter()
            .filter(|p| !keep.contains(*p))
            .cloned()
            .collect();

        if !orphans.is_empty() {
            self.storage.remove(&orphans).await?;
        }

        tracing::info!(
            total = all_paths.len(),
            removed = orphans.len(),
            "Storage cleanup finished"
        );

        Ok(CleanupReport {
            user_id,
            total_in_storage: all_paths.len(),
            total_kept_from_db: keep.len(),
            removed_count: orphans.len(),
            removed_paths: orphans,
        })
    }
}
