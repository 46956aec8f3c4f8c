//! REST client for the object store (Supabase Storage API).

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::object_storage::{ObjectStoragePort, StorageEntry},
};

/// Listings are fetched in pages of this size until a short page comes back.
const LIST_PAGE_SIZE: usize = 1000;

#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    service_key: SecretString,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    /// Null for folders.
    id: Option<String>,
}

impl StorageClient {
    pub fn new(client: Client, base_url: &Url, service_key: SecretString, bucket: String) -> Self {
        Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        builder.bearer_auth(key).header("apikey", key)
    }

    async fn check(response: reqwest::Response, action: &str) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(%status, body = %body, action, "Storage API error");
        Err(AppError::upstream(
            StatusCode::BAD_GATEWAY,
            format!("Storage {action} failed ({status})"),
        ))
    }

    async fn list_page(&self, prefix: &str, offset: usize) -> AppResult<Vec<ListedObject>> {
        let response = self
            .authorized(self.client.post(format!(
                "{}/storage/v1/object/list/{}",
                self.base_url, self.bucket
            )))
            .json(&list_request(prefix, offset))
            .send()
            .await
            .map_err(request_failed)?;

        Self::check(response, "list")
            .await?
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid storage listing: {e}")))
    }
}

fn list_request(prefix: &str, offset: usize) -> serde_json::Value {
    json!({
        "prefix": prefix,
        "limit": LIST_PAGE_SIZE,
        "offset": offset,
        "sortBy": { "column": "name", "order": "asc" }
    })
}

fn request_failed(e: reqwest::Error) -> AppError {
    AppError::upstream(
        StatusCode::BAD_GATEWAY,
        format!("Storage request failed: {e}"),
    )
}

#[async_trait]
impl ObjectStoragePort for StorageClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let response = self
            .authorized(self.client.post(self.object_url(path)))
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(request_failed)?;
        Self::check(response, "upload").await?;
        tracing::debug!(path, "Uploaded object");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<StorageEntry>> {
        let mut entries = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_page(prefix, offset).await?;
            let fetched = page.len();
            entries.extend(page.into_iter().map(|o| StorageEntry {
                is_folder: o.id.is_none(),
                name: o.name,
            }));
            if fetched < LIST_PAGE_SIZE {
                return Ok(entries);
            }
            offset += LIST_PAGE_SIZE;
        }
    }

    async fn remove(&self, paths: &[String]) -> AppResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let response = self
            .authorized(self.client.delete(format!(
                "{}/storage/v1/object/{}",
                self.base_url, self.bucket
            )))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(request_failed)?;
        Self::check(response, "remove").await?;
        tracing::debug!(count = paths.len(), "Removed objects");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}
