//! Identity-verification routing and status reconciliation.
//!
//! Four pieces, leaves first:
//! 1. **Normalizer**: maps each provider's raw status vocabulary onto
//!    [`NormalizedVerificationStatus`](idv_types::NormalizedVerificationStatus).
//! 2. **Selector**: picks exactly one provider per user (sticky stored
//!    preference, else derived from the phone calling code) and persists it.
//! 3. **Session controller**: creates provider-hosted sessions, hands out the
//!    terminal callback hooks, and writes the normalized result.
//! 4. **Access gate**: decides whether a protected feature is allowed.
//!
//! Provider SDKs are reached only through the injected
//! [`ProviderClientFactory`], never through process-wide state.

pub mod controller;
pub mod error;
pub mod gate;
pub mod normalizer;
pub mod provider;
pub mod selector;

pub use controller::{
    CallbackOutcome, FlowCallbacks, PollOutcome, VerificationSessionController,
    VerificationStatusView,
};
pub use error::VerificationError;
pub use gate::{AccessDecision, AccessGate, DenialReason};
pub use normalizer::{normalize, normalize_named};
pub use provider::{
    ExternalSession, ProviderClient, ProviderClientFactory, ProviderError, ProviderRegistry,
};
pub use selector::{ProviderSelector, UserProfile};
