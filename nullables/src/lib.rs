//! Nullable infrastructure for deterministic testing.
//!
//! Everything the verification controller reaches outside the process for
//! (clock, storage, provider APIs) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod provider;
pub mod store;

pub use clock::NullClock;
pub use provider::{NullProviderClient, ProviderBehavior};
pub use store::NullStore;
