//! Fundamental types for identity-verification routing.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! user ids, timestamps and clocks, providers, normalized and raw statuses,
//! session states, gated features, regions, and tunable parameters.

pub mod error;
pub mod feature;
pub mod params;
pub mod provider;
pub mod region;
pub mod status;
pub mod time;
pub mod user;

pub use error::IdvError;
pub use feature::Feature;
pub use params::VerificationParams;
pub use provider::VerificationProvider;
pub use region::Region;
pub use status::{NormalizedVerificationStatus, RawProviderStatus, SessionState};
pub use time::{Clock, SystemClock, Timestamp};
pub use user::UserId;
