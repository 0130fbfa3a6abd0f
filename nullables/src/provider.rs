//! Nullable provider client — scripted provider API responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use idv_types::{RawProviderStatus, UserId, VerificationProvider};
use idv_verification::{ExternalSession, ProviderClient, ProviderError};

/// How the next provider calls behave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderBehavior {
    /// Calls succeed.
    Succeed,
    /// Calls fail with this HTTP status.
    Fail(u16),
    /// Calls never complete, so only the caller's timeout ends them.
    Hang,
}

/// A provider client that records calls instead of making them.
///
/// Session ids are `<provider>-<n>` in creation order. The status returned by
/// `fetch_status` is set per session with [`NullProviderClient::set_status`].
pub struct NullProviderClient {
    provider: VerificationProvider,
    behavior: Mutex<ProviderBehavior>,
    statuses: Mutex<HashMap<String, String>>,
    create_calls: AtomicU32,
    fetch_calls: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NullProviderClient {
    pub fn new(provider: VerificationProvider) -> Self {
        Self {
            provider,
            behavior: Mutex::new(ProviderBehavior::Succeed),
            statuses: Mutex::new(HashMap::new()),
            create_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
        }
    }

    pub fn shared(provider: VerificationProvider) -> Arc<Self> {
        Arc::new(Self::new(provider))
    }

    pub fn set_behavior(&self, behavior: ProviderBehavior) {
        *lock(&self.behavior) = behavior;
    }

    /// Script the raw status the provider reports for a session.
    pub fn set_status(&self, external_session_id: &str, raw: &str) {
        lock(&self.statuses).insert(external_session_id.to_string(), raw.to_string());
    }

    /// Number of `create_session` calls, including failed ones.
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<(), ProviderError> {
        let behavior = *lock(&self.behavior);
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;
        match behavior {
            ProviderBehavior::Succeed => Ok(()),
            ProviderBehavior::Fail(code) => Err(ProviderError::Status(code)),
            ProviderBehavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl ProviderClient for NullProviderClient {
    fn provider(&self) -> VerificationProvider {
        self.provider
    }

    async fn create_session(&self, _user: &UserId) -> Result<ExternalSession, ProviderError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.respond().await?;
        Ok(ExternalSession {
            external_session_id: format!("{}-{n}", self.provider),
        })
    }

    async fn fetch_status(
        &self,
        _user: &UserId,
        external_session_id: &str,
    ) -> Result<Option<RawProviderStatus>, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(lock(&self.statuses)
            .get(external_session_id)
            .map(|raw| RawProviderStatus::new(raw.as_str())))
    }
}
