//! In-memory gallery repository and object storage.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::object_storage::{ObjectStoragePort, StorageEntry},
        use_cases::gallery::GalleryRepo,
    },
    domain::entities::gallery_item::GalleryItem,
};

// ============================================================================
// InMemoryGalleryRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryGalleryRepo {
    pub items: Mutex<HashMap<Uuid, GalleryItem>>,
}

impl InMemoryGalleryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GalleryRepo for InMemoryGalleryRepo {
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<GalleryItem>> {
        let mut items: Vec<GalleryItem> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn insert(&self, item: &GalleryItem) -> AppResult<()> {
        let mut items = self.items.lock().unwrap();
        if items.contains_key(&item.id) {
            return Err(AppError::InvalidInput("Gallery item already exists".into()));
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn set_favorite(&self, user_id: Uuid, id: Uuid, is_favorite: bool) -> AppResult<bool> {
        match self.items.lock().unwrap().get_mut(&id) {
            Some(item) if item.user_id == user_id => {
                item.is_favorite = is_favorite;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<GalleryItem>> {
        let mut items = self.items.lock().unwrap();
        match items.get(&id) {
            Some(item) if item.user_id == user_id => Ok(items.remove(&id)),
            _ => Ok(None),
        }
    }
}

// ============================================================================
// InMemoryObjectStorage
// ============================================================================

#[derive(Default)]
pub struct InMemoryObjectStorage {
    pub objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStoragePort for InMemoryObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> AppResult<()> {
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(AppError::InvalidInput("The resource already exists".into()));
        }
        objects.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<StorageEntry>> {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        let mut folders = BTreeSet::new();
        let mut entries = Vec::new();

        for path in self.objects.lock().unwrap().keys() {
            let Some(rest) = path.strip_prefix(&dir) else {
                continue;
            };
            match rest.split_once('/') {
                Some((folder, _)) => {
                    folders.insert(folder.to_string());
                }
                None => entries.push(StorageEntry {
                    name: rest.to_string(),
                    is_folder: false,
                }),
            }
        }

        entries.extend(folders.into_iter().map(|name| StorageEntry {
            name,
            is_folder: true,
        }));
        Ok(entries)
    }

    async fn remove(&self, paths: &[String]) -> AppResult<()> {
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/public/{path}")
    }
}
