//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients (billing, image API, storage) are built here rather than
//! constructing `reqwest::Client` directly.

use reqwest::Client;
use std::time::Duration;

use super::InfraError;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (total request/response time).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Image generation is slow; each attempt gets a full minute.
pub const IMAGE_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build an HTTP client with default timeouts.
pub fn build_client() -> Result<Client, InfraError> {
    build_client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

/// Build an HTTP client with the default connect timeout and a custom
/// total request timeout.
pub fn build_client_with_timeout(request_timeout: Duration) -> Result<Client, InfraError> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(InfraError::HttpClient)
}
