//! Shared HTTP plumbing for provider clients.

use std::time::Duration;

use idv_verification::ProviderError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Connect timeout for provider hosts. The request timeout is configured.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Build a client whose whole request is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {e}")))
}

fn transport(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(format!("request failed: {e}"))
    }
}

/// Send `request` and decode a successful JSON body as `T`.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid JSON response: {e}")))
}
