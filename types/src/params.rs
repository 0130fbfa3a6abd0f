//! Tunable verification parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::IdvError;

/// Timing parameters for the session controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationParams {
    /// How long an unfinished session blocks a new `start_session` for the same user.
    pub session_ttl_secs: u64,

    /// Upper bound for any single provider call.
    pub provider_timeout_secs: u64,
}

impl VerificationParams {
    pub fn defaults() -> Self {
        Self {
            session_ttl_secs: 300,
            provider_timeout_secs: 5,
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Reject values that would disable the duplicate-session guard or make
    /// provider calls unbounded.
    pub fn validate(&self) -> Result<(), IdvError> {
        if self.session_ttl_secs == 0 {
            return Err(IdvError::InvalidParams("session_ttl_secs must be > 0".into()));
        }
        if self.provider_timeout_secs == 0 || self.provider_timeout_secs > 60 {
            return Err(IdvError::InvalidParams(
                "provider_timeout_secs must be within 1..=60".into(),
            ));
        }
        Ok(())
    }
}

impl Default for VerificationParams {
    fn default() -> Self {
        Self::defaults()
    }
}
