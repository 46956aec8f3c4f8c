use async_trait::async_trait;
use serde_json::Value;

/// Image to edit plus the instructions for the model.
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    pub prompt: String,
    pub image: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

/// Failure of a single call to the image API.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageAttemptError {
    Timeout,
    Network(String),
    /// Non-2xx answer; `body` is the parsed JSON body when there was one.
    Status { status: u16, body: Option<Value> },
}

/// One attempt against the image-edit endpoint. Retrying is the caller's job.
#[async_trait]
pub trait ImageEditorPort: Send + Sync {
    /// Returns the JSON body of a successful response.
    async fn edit_once(&self, request: &ImageEditRequest) -> Result<Value, ImageAttemptError>;
}
