//! HTTP gateway for identity-verification routing.
//!
//! Provides endpoints for:
//! - Starting a verification session with the user's routed provider
//! - Terminal callbacks from the provider's client flow
//! - Refreshing status from the provider
//! - Verification status and feature access checks
//! - Service stats and health

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod shutdown;

pub use config::ServiceConfig;
pub use error::RpcError;
pub use server::{router, AppState, RpcServer};
pub use shutdown::ShutdownController;
