//! Verification provider identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::IdvError;

/// The hosted identity-verification service a user is routed to.
///
/// Assigned once per user and persisted; it decides which client is used
/// and which status vocabulary the normalizer applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationProvider {
    /// Plaid identity verification (link token flow).
    Plaid,
    /// Persona KYC inquiries.
    Persona,
}

impl VerificationProvider {
    pub const ALL: [Self; 2] = [Self::Plaid, Self::Persona];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaid => "plaid",
            Self::Persona => "persona",
        }
    }
}

impl fmt::Display for VerificationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationProvider {
    type Err = IdvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plaid" => Ok(Self::Plaid),
            "persona" => Ok(Self::Persona),
            _ => Err(IdvError::UnknownProvider(s.to_string())),
        }
    }
}
