//! Coarse regions derived from a phone number's calling code.

use serde::{Deserialize, Serialize};

use crate::VerificationProvider;

/// Routing region. Each region has exactly one verification provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    NorthAmerica,
    CentralAmerica,
    SouthAmerica,
    Spain,
    /// Everything not listed, including unknown or missing phone numbers.
    Other,
}

impl Region {
    /// The provider responsible for users in this region.
    pub fn provider(&self) -> VerificationProvider {
        match self {
            Self::CentralAmerica | Self::SouthAmerica | Self::Spain => {
                VerificationProvider::Persona
            }
            Self::NorthAmerica | Self::Other => VerificationProvider::Plaid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NorthAmerica => "north_america",
            Self::CentralAmerica => "central_america",
            Self::SouthAmerica => "south_america",
            Self::Spain => "spain",
            Self::Other => "other",
        }
    }
}
