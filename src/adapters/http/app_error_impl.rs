use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = status_and_code(&self);

        // Log the error before it gets converted into a status response.
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::info!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let message = match self {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal error".to_string(),
            AppError::InvalidInput(msg) | AppError::PayloadTooLarge(msg) => msg,
            AppError::Upstream { message, .. } => message,
            other => other.to_string(),
        };

        error_resp(status, code, message)
    }
}

fn status_and_code(error: &AppError) -> (StatusCode, ErrorCode) {
    match error {
        AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
        AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials),
        AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimited),
        AppError::CreditsExhausted => (StatusCode::TOO_MANY_REQUESTS, ErrorCode::CreditsExhausted),
        AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidInput),
        AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, ErrorCode::PayloadTooLarge),
        AppError::NotFound => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
        AppError::Conflict => (StatusCode::CONFLICT, ErrorCode::Conflict),
        AppError::Upstream { status, .. } => (*status, ErrorCode::UpstreamError),
        AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: String) -> Response {
    let body = serde_json::json!({ "ok": false, "error": message, "code": code.as_str() });
    (status, Json(body)).into_response()
}
