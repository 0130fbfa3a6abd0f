//! HTTP clients for the identity-verification providers.
//!
//! Each client implements [`idv_verification::ProviderClient`] on top of a
//! `reqwest::Client` with request and connect timeouts. Provider error text
//! stays inside [`idv_verification::ProviderError`] and is only logged.

mod http;
pub mod persona;
pub mod plaid;
pub mod registry;
pub mod settings;

pub use persona::PersonaClient;
pub use plaid::PlaidClient;
pub use registry::build_registry;
pub use settings::{PersonaSettings, PlaidEnvironment, PlaidSettings};
