//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use idv_verification::VerificationError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<idv_types::IdvError> for RpcError {
    fn from(e: idv_types::IdvError) -> Self {
        RpcError::InvalidRequest(e.to_string())
    }
}

/// JSON error body. `message` is safe to show end users.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Verification(e) => match e {
                VerificationError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                VerificationError::DuplicateSessionRejected { .. }
                | VerificationError::CallbackReplay(_) => StatusCode::CONFLICT,
                VerificationError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                VerificationError::InvalidProviderConfig(_) | VerificationError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Config(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            RpcError::Verification(e) => ErrorBody {
                error: e.kind(),
                message: e.user_message().to_string(),
                retryable: e.is_retryable(),
            },
            // Input errors describe the caller's own request.
            RpcError::InvalidRequest(msg) => ErrorBody {
                error: "invalid_request",
                message: msg.clone(),
                retryable: false,
            },
            RpcError::Config(_) | RpcError::Server(_) => ErrorBody {
                error: "internal",
                message: "Something went wrong. Please try again later.".to_string(),
                retryable: false,
            },
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
