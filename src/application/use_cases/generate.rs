use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use base64::Engine;
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::image_editor::{ImageAttemptError, ImageEditRequest, ImageEditorPort},
        use_cases::credits::CreditUseCases,
    },
    domain::entities::style::Style,
};

pub const MAX_IMAGE_MB: usize = 25;
pub const MAX_IMAGE_BYTES: usize = MAX_IMAGE_MB * 1024 * 1024;

/// Upstream statuses worth another attempt.
const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

const DEFAULT_FILE_NAME: &str = "room.jpg";

// ============================================================================
// Retry Policy
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff: `base * (attempt + 1)` plus random jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::random::<u64>() % (jitter_ms + 1)
        };
        self.base_delay * (attempt + 1) + Duration::from_millis(jitter)
    }
}

pub fn is_retryable(error: &ImageAttemptError) -> bool {
    match error {
        ImageAttemptError::Timeout | ImageAttemptError::Network(_) => true,
        ImageAttemptError::Status { status, .. } => RETRYABLE_STATUS.contains(status),
    }
}

/// Final mapping of a failed attempt to what the client sees.
pub fn map_attempt_error(error: ImageAttemptError) -> AppError {
    match error {
        ImageAttemptError::Timeout => AppError::upstream(
            StatusCode::GATEWAY_TIMEOUT,
            "Image request timed out. Please try again.",
        ),
        ImageAttemptError::Network(detail) => {
            tracing::warn!(%detail, "Image API unreachable");
            AppError::upstream(
                StatusCode::BAD_GATEWAY,
                "Network error calling the image provider. Please try again.",
            )
        }
        ImageAttemptError::Status { status, body } => {
            let message = body
                .as_ref()
                .and_then(|b| b.pointer("/error/message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Image request failed (status {status})."));
            let code = if status == 503 {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            AppError::upstream(code, message)
        }
    }
}

/// Pull the generated image out of a successful response body.
pub fn decode_image(body: &Value) -> AppResult<Vec<u8>> {
    let no_image =
        || AppError::upstream(StatusCode::BAD_GATEWAY, "No image returned by the image provider.");

    let b64 = body
        .pointer("/data/0/b64_json")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(no_image)?;

    base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| {
            tracing::warn!(error = %e, "Image payload is not valid base64");
            no_image()
        })
}

/// Call the image API, retrying transient failures per `policy`.
pub async fn edit_with_retry(
    editor: &dyn ImageEditorPort,
    request: &ImageEditRequest,
    policy: &RetryPolicy,
) -> AppResult<Vec<u8>> {
    let mut attempt = 0;
    loop {
        match editor.edit_once(request).await {
            Ok(body) => return decode_image(&body),
            Err(e) if is_retryable(&e) && attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                tracing::info!(error = ?e, attempt, ?delay, "Retrying image request");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(map_attempt_error(e)),
        }
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateInput {
    pub image: Option<UploadedImage>,
    pub style: Option<String>,
}

#[derive(Clone)]
pub struct GenerateUseCases {
    credits: CreditUseCases,
    editor: Arc<dyn ImageEditorPort>,
    retry: RetryPolicy,
}

impl GenerateUseCases {
    pub fn new(
        credits: CreditUseCases,
        editor: Arc<dyn ImageEditorPort>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            credits,
            editor,
            retry,
        }
    }

    /// Validate the upload, spend a credit and return the redesigned JPEG.
    /// The credit is given back when the image API fails.
    #[instrument(skip(self, input), fields(style = tracing::field::Empty))]
    pub async fn generate(&self, user_id: Uuid, input: GenerateInput) -> AppResult<Vec<u8>> {
        let image = input
            .image
            .ok_or_else(|| AppError::InvalidInput("No image received.".into()))?;

        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "Image too large. Max allowed is {MAX_IMAGE_MB}MB."
            )));
        }

        let style = Style::normalize(input.style.as_deref());
        tracing::Span::current().record("style", style.as_str());

        let request = ImageEditRequest {
            prompt: style.prompt(),
            file_name: image
                .file_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            content_type: image
                .content_type
                .unwrap_or_else(|| "image/jpeg".to_string()),
            image: image.bytes,
        };

        let consumption = self.credits.consume(user_id).await?;

        match edit_with_retry(self.editor.as_ref(), &request, &self.retry).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Generation failed, refunding credit");
                self.credits.refund(user_id, consumption).await;
                Err(e)
            }
        }
    }
}
