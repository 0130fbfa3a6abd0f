//! Provider status normalizer.
//!
//! Each provider reports its own status vocabulary; everything downstream
//! only ever sees [`NormalizedVerificationStatus`]. Tokens are matched
//! literally and case-sensitively.

use idv_types::{NormalizedVerificationStatus, VerificationProvider};

use crate::VerificationError;

use NormalizedVerificationStatus::{InReview, Unverified, Verified};

/// Map a provider's raw status token (possibly absent) to the shared model.
pub fn normalize(provider: VerificationProvider, raw: Option<&str>) -> NormalizedVerificationStatus {
    match provider {
        VerificationProvider::Plaid => match raw {
            Some("success" | "approved") => Verified,
            Some("pending_review") => InReview,
            Some("failed") => Unverified,
            _ => Unverified,
        },
        VerificationProvider::Persona => match raw {
            Some("completed" | "approved") => Verified,
            Some("pending_review") => InReview,
            Some("failed" | "declined") => Unverified,
            // Session opened but nothing submitted yet.
            Some("created") => Unverified,
            _ => Unverified,
        },
    }
}

/// Like [`normalize`], for a provider name read from outside the type system.
///
/// An unknown provider means the selector and the normalizer have drifted
/// apart, so it fails instead of defaulting.
pub fn normalize_named(
    provider: &str,
    raw: Option<&str>,
) -> Result<NormalizedVerificationStatus, VerificationError> {
    let provider: VerificationProvider = provider.parse()?;
    Ok(normalize(provider, raw))
}

/// Whether `raw` ends a verification attempt for `provider`.
///
/// Polling uses this to leave records alone while a session is still open.
pub fn is_terminal(provider: VerificationProvider, raw: Option<&str>) -> bool {
    match provider {
        VerificationProvider::Plaid => matches!(
            raw,
            Some("success" | "approved" | "failed" | "pending_review")
        ),
        VerificationProvider::Persona => matches!(
            raw,
            Some("completed" | "approved" | "failed" | "declined" | "pending_review")
        ),
    }
}
