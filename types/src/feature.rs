//! Protected features behind the access gate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::IdvError;

/// A money-movement feature that requires a verified identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Send money to another user.
    Send,
    /// Request money from another user.
    Request,
    /// Move money to or from a linked bank account.
    BankTransfer,
}

impl Feature {
    pub const ALL: [Self; 3] = [Self::Send, Self::Request, Self::BankTransfer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Request => "request",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = IdvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(Self::Send),
            "request" => Ok(Self::Request),
            "bank_transfer" | "bankTransfer" => Ok(Self::BankTransfer),
            other => Err(IdvError::UnknownFeature(other.to_string())),
        }
    }
}
