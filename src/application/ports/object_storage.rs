use async_trait::async_trait;

use crate::app_error::AppResult;

/// Entry returned by a storage listing. Folders have no object id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub name: String,
    pub is_folder: bool,
}

#[async_trait]
pub trait ObjectStoragePort: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;

    /// Direct children of `prefix` (no recursion).
    async fn list(&self, prefix: &str) -> AppResult<Vec<StorageEntry>>;

    async fn remove(&self, paths: &[String]) -> AppResult<()>;

    /// Public URL the browser can load the object from.
    fn public_url(&self, path: &str) -> String;
}
