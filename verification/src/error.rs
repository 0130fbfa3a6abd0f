use idv_store::StoreError;
use idv_types::{UserId, VerificationProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    /// Network failure, timeout, or non-success response from a provider.
    #[error("provider {provider} unavailable: {reason}")]
    ProviderUnavailable {
        provider: VerificationProvider,
        reason: String,
    },

    /// Selector and normalizer/registry disagree about the providers in use.
    #[error("invalid provider configuration: {0}")]
    InvalidProviderConfig(String),

    #[error("user {user} already has a verification session in progress ({age_secs}s old)")]
    DuplicateSessionRejected { user: UserId, age_secs: u64 },

    #[error("duplicate terminal callback for session {0}")]
    CallbackReplay(String),

    #[error("no matching verification session: {0}")]
    SessionNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl VerificationError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::InvalidProviderConfig(_) => "invalid_provider_config",
            Self::DuplicateSessionRejected { .. } => "duplicate_session_rejected",
            Self::CallbackReplay(_) => "callback_replay",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Store(_) => "store",
        }
    }

    /// Whether the user should be invited to try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::DuplicateSessionRejected { .. }
        )
    }

    /// Short message safe to show end users. Never includes provider error text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => {
                "Identity verification is temporarily unavailable. Please try again."
            }
            Self::DuplicateSessionRejected { .. } => {
                "A verification is already in progress. Please wait a few minutes and try again."
            }
            Self::SessionNotFound(_) => {
                "This verification attempt is no longer active. Please start again."
            }
            Self::CallbackReplay(_) => "This verification result was already recorded.",
            Self::InvalidProviderConfig(_) | Self::Store(_) => {
                "Something went wrong. Please try again later."
            }
        }
    }
}

impl From<idv_types::IdvError> for VerificationError {
    fn from(e: idv_types::IdvError) -> Self {
        Self::InvalidProviderConfig(e.to_string())
    }
}
