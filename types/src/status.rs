//! Status enums for verification records and sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three-state verification status every provider vocabulary reduces to.
///
/// This is the only status the access gate branches on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedVerificationStatus {
    /// No successful verification on file (initial state).
    #[default]
    Unverified,
    /// The provider is holding the attempt for manual review.
    InReview,
    /// Identity verified.
    Verified,
}

impl NormalizedVerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::InReview => "in_review",
            Self::Verified => "verified",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl fmt::Display for NormalizedVerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status token exactly as a provider reported it.
///
/// Kept verbatim (case included) for auditing; never interpreted outside
/// the normalizer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProviderStatus(String);

impl RawProviderStatus {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RawProviderStatus {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Lifecycle of one verification session.
///
/// `Idle -> SessionCreated -> AwaitingCallback -> {Verified | Unverified | InReview}`.
/// Terminal states only return to `Idle` through an explicit retry, which
/// creates a fresh session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No attempt in flight (cancelled, errored, or never started).
    Idle,
    /// External session created, client flow not yet launched.
    SessionCreated,
    /// Client flow launched; waiting for the terminal callback.
    AwaitingCallback,
    /// Terminal: provider reported a verifying status.
    Verified,
    /// Terminal: provider reported a failing or non-terminal status.
    Unverified,
    /// Terminal: provider is reviewing.
    InReview,
}

impl SessionState {
    /// Whether the session is still waiting on the provider.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::SessionCreated | Self::AwaitingCallback)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Unverified | Self::InReview)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SessionCreated => "session_created",
            Self::AwaitingCallback => "awaiting_callback",
            Self::Verified => "verified",
            Self::Unverified => "unverified",
            Self::InReview => "in_review",
        }
    }
}

impl From<NormalizedVerificationStatus> for SessionState {
    fn from(status: NormalizedVerificationStatus) -> Self {
        match status {
            NormalizedVerificationStatus::Unverified => Self::Unverified,
            NormalizedVerificationStatus::InReview => Self::InReview,
            NormalizedVerificationStatus::Verified => Self::Verified,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
