//! Verification session storage.

use crate::StoreError;
use idv_types::{SessionState, Timestamp, UserId, VerificationProvider};
use serde::{Deserialize, Serialize};

/// One provider-hosted verification attempt.
///
/// A user has at most one current session; a retry stores a fresh session
/// in its place rather than reviving the old one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub user_id: UserId,
    pub provider: VerificationProvider,
    /// Link token (Plaid) or inquiry id (Persona).
    pub external_session_id: String,
    pub created_at: Timestamp,
    pub terminal_callback_received: bool,
    pub state: SessionState,
}

impl VerificationSession {
    pub fn new(
        user_id: UserId,
        provider: VerificationProvider,
        external_session_id: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            provider,
            external_session_id,
            created_at,
            terminal_callback_received: false,
            state: SessionState::SessionCreated,
        }
    }

    /// In flight and younger than `ttl_secs`.
    pub fn is_live(&self, ttl_secs: u64, now: Timestamp) -> bool {
        self.state.is_in_flight() && !self.created_at.has_expired(ttl_secs, now)
    }
}

/// Trait for session storage. Holds the current session per user.
pub trait SessionStore: Send + Sync {
    fn get_session(&self, user: &UserId) -> Result<Option<VerificationSession>, StoreError>;

    /// Store `session` as the user's current session, replacing any previous one.
    fn put_session(&self, session: &VerificationSession) -> Result<(), StoreError>;
}
