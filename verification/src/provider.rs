//! Provider client abstraction.
//!
//! The session controller never talks to a provider SDK directly; it asks an
//! injected [`ProviderClientFactory`] for the client of the user's provider.
//! Production wires HTTP clients in, tests wire fakes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use idv_types::{RawProviderStatus, UserId, VerificationProvider};
use thiserror::Error;

use crate::VerificationError;

/// Failures talking to a provider. Never shown to end users.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Handle for one provider-hosted attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalSession {
    /// Link token (Plaid) or inquiry id (Persona).
    pub external_session_id: String,
}

/// One verification provider's server-side API.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> VerificationProvider;

    /// Create a hosted verification session for `user`.
    async fn create_session(&self, user: &UserId) -> Result<ExternalSession, ProviderError>;

    /// Current raw status of a session. `None` when the provider has nothing yet.
    async fn fetch_status(
        &self,
        user: &UserId,
        external_session_id: &str,
    ) -> Result<Option<RawProviderStatus>, ProviderError>;
}

/// Resolves the client for a provider.
pub trait ProviderClientFactory: Send + Sync {
    /// Fails with [`VerificationError::InvalidProviderConfig`] when the
    /// provider has no configured client.
    fn client_for(
        &self,
        provider: VerificationProvider,
    ) -> Result<Arc<dyn ProviderClient>, VerificationError>;
}

/// Map-backed [`ProviderClientFactory`].
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<VerificationProvider, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under the provider it reports. Replaces any
    /// previous client for that provider.
    pub fn register(&mut self, client: Arc<dyn ProviderClient>) {
        self.clients.insert(client.provider(), client);
    }

    pub fn with(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.register(client);
        self
    }

    pub fn is_configured(&self, provider: VerificationProvider) -> bool {
        self.clients.contains_key(&provider)
    }

    pub fn configured(&self) -> Vec<VerificationProvider> {
        VerificationProvider::ALL
            .into_iter()
            .filter(|p| self.is_configured(*p))
            .collect()
    }
}

impl ProviderClientFactory for ProviderRegistry {
    fn client_for(
        &self,
        provider: VerificationProvider,
    ) -> Result<Arc<dyn ProviderClient>, VerificationError> {
        self.clients.get(&provider).cloned().ok_or_else(|| {
            VerificationError::InvalidProviderConfig(format!(
                "no client configured for provider {provider}"
            ))
        })
    }
}
