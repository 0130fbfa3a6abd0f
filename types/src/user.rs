//! User identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::IdvError;

/// Opaque identifier of an application user, as issued by the identity layer.
///
/// Used as the key for every per-user record, so it is restricted to a
/// conservative character set.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Maximum accepted length in bytes.
    pub const MAX_LEN: usize = 128;

    /// Create a user id, validating its shape.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdvError> {
        let s = raw.into();
        if s.is_empty() || s.len() > Self::MAX_LEN {
            return Err(IdvError::InvalidUserId(s));
        }
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '|' | '.' | '@');
        if !s.chars().all(allowed) {
            return Err(IdvError::InvalidUserId(s));
        }
        Ok(Self(s))
    }

    /// Return the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = IdvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
