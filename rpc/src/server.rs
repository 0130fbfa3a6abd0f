//! Axum-based HTTP server.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use idv_types::VerificationProvider;
use idv_verification::VerificationSessionController;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::error::RpcError;
use crate::handlers;

/// State shared by every handler.
pub struct AppState {
    pub controller: Arc<VerificationSessionController>,
    /// Providers with a registered client, reported by `/health`.
    pub providers: Vec<VerificationProvider>,
    pub started: Instant,
}

impl AppState {
    pub fn new(
        controller: Arc<VerificationSessionController>,
        providers: Vec<VerificationProvider>,
    ) -> Self {
        Self {
            controller,
            providers,
            started: Instant::now(),
        }
    }
}

/// CORS for the web client. `["*"]` (or an empty list) allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let is_wildcard = origins.is_empty() || origins.iter().any(|o| o == "*");
    let allow_origin = if is_wildcard {
        AllowOrigin::any()
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600))
}

/// Build the router with every route.
pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/stats", get(handlers::stats))
        .route(
            "/v1/users/:user_id/verification",
            post(handlers::start_verification).get(handlers::get_status),
        )
        .route(
            "/v1/users/:user_id/verification/callback",
            post(handlers::handle_callback),
        )
        .route(
            "/v1/users/:user_id/verification/refresh",
            post(handlers::refresh_status),
        )
        .route(
            "/v1/users/:user_id/access/:feature",
            get(handlers::check_access),
        )
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: Arc<AppState>,
    pub cors_origins: Vec<String>,
}

impl RpcServer {
    pub fn new(port: u16, state: Arc<AppState>, cors_origins: Vec<String>) -> Self {
        Self {
            port,
            state,
            cors_origins,
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state.clone(), &self.cors_origins);

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        info!(%addr, "verification API listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
