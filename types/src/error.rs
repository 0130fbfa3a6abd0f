//! Top-level error type shared across crates.

use thiserror::Error;

/// Common parse/validation error for the shared types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdvError {
    #[error("unknown verification provider: {0}")]
    UnknownProvider(String),

    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid parameter: {0}")]
    InvalidParams(String),
}
