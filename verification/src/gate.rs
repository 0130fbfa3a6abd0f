//! Access gate for protected money-movement features.

use idv_types::{Feature, NormalizedVerificationStatus, VerificationProvider};
use serde::Serialize;

/// Why access was refused. Lets callers tell "under review" from "please verify".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    UnderReview,
    VerificationRequired,
}

/// Outcome of an access check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Granted {
        feature: Feature,
    },
    Denied {
        feature: Feature,
        reason: DenialReason,
        /// A session for this user is currently in flight.
        verifying: bool,
        /// Provider whose start entry point the caller should send the user to.
        /// This is the already-selected provider; the gate never re-selects.
        redirect: Option<VerificationProvider>,
    },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Stateless policy: only `verified` opens a protected feature.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn can_access(&self, _feature: Feature, status: NormalizedVerificationStatus) -> bool {
        // Every gated feature currently shares one policy.
        status.is_verified()
    }

    pub fn check(
        &self,
        feature: Feature,
        status: NormalizedVerificationStatus,
        verifying: bool,
        provider: Option<VerificationProvider>,
    ) -> AccessDecision {
        if self.can_access(feature, status) {
            return AccessDecision::Granted { feature };
        }
        let reason = match status {
            NormalizedVerificationStatus::InReview => DenialReason::UnderReview,
            _ => DenialReason::VerificationRequired,
        };
        AccessDecision::Denied {
            feature,
            reason,
            verifying,
            redirect: provider,
        }
    }
}
