//! Per-user verification record storage.

use crate::StoreError;
use idv_types::{
    NormalizedVerificationStatus, RawProviderStatus, Timestamp, UserId, VerificationProvider,
};
use serde::{Deserialize, Serialize};

/// The durable verification outcome for one user.
///
/// Written only on a definitive provider callback (or a terminal polled
/// status); read by the access gate and status displays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVerificationRecord {
    pub user_id: UserId,
    /// Sticky provider assignment. `None` until the selector first runs.
    pub provider: Option<VerificationProvider>,
    pub normalized_status: NormalizedVerificationStatus,
    pub last_raw_status: Option<RawProviderStatus>,
    pub last_updated_at: Timestamp,
}

impl UserVerificationRecord {
    /// The record as created at signup: no provider, unverified.
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            provider: None,
            normalized_status: NormalizedVerificationStatus::Unverified,
            last_raw_status: None,
            last_updated_at: now,
        }
    }

    /// Whether the record already holds exactly this outcome.
    pub fn reflects(
        &self,
        status: NormalizedVerificationStatus,
        raw: Option<&RawProviderStatus>,
    ) -> bool {
        self.normalized_status == status && self.last_raw_status.as_ref() == raw
    }
}

/// Trait for verification record storage.
pub trait RecordStore: Send + Sync {
    fn get_record(&self, user: &UserId) -> Result<Option<UserVerificationRecord>, StoreError>;

    fn put_record(&self, record: &UserVerificationRecord) -> Result<(), StoreError>;

    /// Assign `provider` to `user` unless a provider is already stored.
    ///
    /// Must be atomic with respect to concurrent callers. Creates the record
    /// if it does not exist yet. Returns the provider stored after the call,
    /// which is the pre-existing one when the user was already assigned.
    fn assign_provider_if_unset(
        &self,
        user: &UserId,
        provider: VerificationProvider,
        now: Timestamp,
    ) -> Result<VerificationProvider, StoreError>;
}
