//! HTTP request handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use idv_types::{Feature, SessionState, Timestamp, UserId, VerificationProvider};
use idv_utils::format_duration;
use idv_utils::stats::StatsSnapshot;
use idv_verification::{
    AccessDecision, CallbackOutcome, PollOutcome, UserProfile, VerificationStatusView,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RpcError;
use crate::server::AppState;

fn parse_user(raw: &str) -> Result<UserId, RpcError> {
    Ok(UserId::new(raw)?)
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json")
        || mime.rsplit_once('+').is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case("json"))
}

// ── Start ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StartVerificationRequest {
    /// International phone number used to route first-time users.
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartVerificationResponse {
    pub provider: VerificationProvider,
    /// Link token or inquiry id the client flow opens with.
    pub external_session_id: String,
    pub state: SessionState,
    pub created_at: Timestamp,
}

impl StartVerificationRequest {
    /// An empty body means "no phone number". Anything else must be a
    /// well-formed JSON request, since the phone decides the provider for good.
    fn from_body(headers: &HeaderMap, body: &Bytes) -> Result<Self, RpcError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        if !is_json_content_type(headers) {
            return Err(RpcError::InvalidRequest(
                "request body must be sent as application/json".to_string(),
            ));
        }
        let Json(request) = Json::<Self>::from_bytes(body)
            .map_err(|rejection| RpcError::InvalidRequest(rejection.body_text()))?;
        Ok(request)
    }
}

pub async fn start_verification(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StartVerificationResponse>, RpcError> {
    let user = parse_user(&user)?;
    let request = StartVerificationRequest::from_body(&headers, &body)?;
    let profile = UserProfile::new(user, request.phone_number);

    let session = state.controller.start_session(&profile).await?;
    let flow = match state.controller.launch_client_flow(&session) {
        Ok(flow) => flow,
        Err(err) => {
            if let Err(reset) = state.controller.abandon_session(&session) {
                warn!(user = %session.user_id, error = %reset, "could not release unlaunched session");
            }
            return Err(err.into());
        }
    };

    Ok(Json(StartVerificationResponse {
        provider: flow.provider(),
        external_session_id: flow.external_session_id().to_string(),
        state: SessionState::AwaitingCallback,
        created_at: session.created_at,
    }))
}

// ── Status ───────────────────────────────────────────────────────────────

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<VerificationStatusView>, RpcError> {
    let user = parse_user(&user)?;
    Ok(Json(state.controller.get_status(&user)?))
}

// ── Callback ─────────────────────────────────────────────────────────────

/// A terminal event reported by the provider's client flow.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CallbackRequest {
    Complete {
        external_session_id: String,
        /// Raw provider status, passed through verbatim.
        #[serde(default)]
        status: Option<String>,
    },
    Cancel {
        external_session_id: String,
    },
    Error {
        external_session_id: String,
        #[serde(default)]
        message: String,
    },
}

impl CallbackRequest {
    fn external_session_id(&self) -> &str {
        match self {
            Self::Complete {
                external_session_id,
                ..
            }
            | Self::Cancel {
                external_session_id,
            }
            | Self::Error {
                external_session_id,
                ..
            } => external_session_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    /// Present for `complete` events.
    pub outcome: Option<CallbackOutcome>,
    pub verification: VerificationStatusView,
}

pub async fn handle_callback(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, RpcError> {
    let user = parse_user(&user)?;
    let hooks = state
        .controller
        .callbacks(&user, request.external_session_id())?;

    let outcome = match &request {
        CallbackRequest::Complete { status, .. } => Some(hooks.on_complete(status.as_deref())?),
        CallbackRequest::Cancel { .. } => {
            hooks.on_cancel()?;
            None
        }
        CallbackRequest::Error { message, .. } => {
            hooks.on_error(message)?;
            None
        }
    };
    debug!(%user, ?outcome, "callback handled");

    Ok(Json(CallbackResponse {
        outcome,
        verification: state.controller.get_status(&user)?,
    }))
}

// ── Refresh ──────────────────────────────────────────────────────────────

pub async fn refresh_status(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<PollOutcome>, RpcError> {
    let user = parse_user(&user)?;
    Ok(Json(state.controller.poll_status(&user).await?))
}

// ── Access ───────────────────────────────────────────────────────────────

pub async fn check_access(
    State(state): State<Arc<AppState>>,
    Path((user, feature)): Path<(String, String)>,
) -> Result<Json<AccessDecision>, RpcError> {
    let user = parse_user(&user)?;
    let feature: Feature = feature.parse()?;
    Ok(Json(state.controller.check_access(&user, feature)?))
}

// ── Service ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime: String,
    pub uptime_secs: u64,
    pub counters: StatsSnapshot,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let uptime_secs = state.started.elapsed().as_secs();
    Json(StatsResponse {
        uptime: format_duration(uptime_secs),
        uptime_secs,
        counters: state.controller.stats(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub providers: Vec<VerificationProvider>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        providers: state.providers.clone(),
    })
}
