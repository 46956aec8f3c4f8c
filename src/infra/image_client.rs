use async_trait::async_trait;
use reqwest::{Client, multipart};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::application::ports::image_editor::{
    ImageAttemptError, ImageEditRequest, ImageEditorPort,
};

/// Client for an OpenAI-compatible `images/edits` endpoint.
///
/// Timeouts come from the `reqwest::Client` it is built with.
#[derive(Clone)]
pub struct ImageApiClient {
    client: Client,
    endpoint: Url,
    api_key: SecretString,
    model: String,
}

impl ImageApiClient {
    pub fn new(client: Client, endpoint: Url, api_key: SecretString, model: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            model,
        }
    }

    fn form(&self, request: &ImageEditRequest) -> Result<multipart::Form, ImageAttemptError> {
        let image = multipart::Part::bytes(request.image.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.content_type)
            .map_err(|e| ImageAttemptError::Network(format!("invalid content type: {e}")))?;

        Ok(multipart::Form::new()
            .text("model", self.model.clone())
            .text("prompt", request.prompt.clone())
            .text("size", "auto")
            .text("output_format", "jpeg")
            .text("quality", "medium")
            .part("image", image))
    }
}

#[async_trait]
impl ImageEditorPort for ImageApiClient {
    async fn edit_once(&self, request: &ImageEditRequest) -> Result<Value, ImageAttemptError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(self.form(request)?)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        // Bodies that are not JSON are treated as absent.
        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<Value>(&bytes).ok(),
            Err(e) if e.is_timeout() => return Err(ImageAttemptError::Timeout),
            Err(_) => None,
        };

        if status.is_success() {
            tracing::debug!(%status, "Image API answered");
            return Ok(body.unwrap_or(Value::Null));
        }

        tracing::warn!(%status, "Image API returned an error");
        Err(ImageAttemptError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn classify(e: reqwest::Error) -> ImageAttemptError {
    if e.is_timeout() {
        ImageAttemptError::Timeout
    } else {
        ImageAttemptError::Network(e.to_string())
    }
}
