use super::state::AppState;
use crate::session::ConnectionState;
use crate::startup::{InitializationState, RetryOutcome};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    /// Bot to talk to (defaults to the configured bot)
    pub bot_id: Option<String>,

    pub enable_mic: Option<bool>,

    pub enable_cam: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct InitializationResponse {
    pub state: InitializationState,
    pub ready: bool,
    pub auto_reconnect: Option<RetryOutcome>,
}

#[derive(Debug, Serialize)]
pub struct IntegrationResponse {
    pub enabled: bool,
}

const DEFAULT_MESSAGE_LIMIT: usize = 50;

// ============================================================================
// Handlers
// ============================================================================

/// GET /connection
/// Current realtime connection state
pub async fn get_connection(State(state): State<AppState>) -> Json<ConnectionState> {
    Json(state.orchestrator.current_state())
}

/// POST /connection/connect
/// Start a realtime session; ignored if one is already active
pub async fn connect(
    State(state): State<AppState>,
    body: Option<Json<ConnectRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let mut config = state.session_config.clone();
    if let Some(bot_id) = req.bot_id {
        config.bot_id = Some(bot_id);
    }
    if let Some(enable_mic) = req.enable_mic {
        config.enable_mic = enable_mic;
    }
    if let Some(enable_cam) = req.enable_cam {
        config.enable_cam = enable_cam;
    }

    info!("Connect requested over HTTP");
    state.orchestrator.connect(config).await;

    (StatusCode::ACCEPTED, Json(state.orchestrator.current_state()))
}

/// POST /connection/disconnect
pub async fn disconnect(State(state): State<AppState>) -> Json<ConnectionState> {
    info!("Disconnect requested over HTTP");
    state.orchestrator.disconnect().await;
    Json(state.orchestrator.current_state())
}

/// POST /connection/microphone
pub async fn toggle_microphone(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> StatusCode {
    state.orchestrator.toggle_microphone(req.enabled);
    StatusCode::NO_CONTENT
}

/// POST /connection/camera
pub async fn toggle_camera(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> StatusCode {
    state.orchestrator.toggle_camera(req.enabled);
    StatusCode::NO_CONTENT
}

/// POST /glasses/integration
/// Manually enable or disable the glasses audio path
pub async fn set_glasses_integration(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> Json<IntegrationResponse> {
    state.bridge.set_glasses_integration_enabled(req.enabled).await;
    Json(IntegrationResponse {
        enabled: state.bridge.is_glasses_integration_enabled(),
    })
}

/// GET /glasses/routing
pub async fn get_routing_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.bridge.routing_status())
}

/// GET /initialization
pub async fn get_initialization(State(state): State<AppState>) -> Json<InitializationResponse> {
    Json(InitializationResponse {
        state: state.startup.current_state(),
        ready: state.startup.is_ready(),
        auto_reconnect: state.startup.last_reconnect_outcome(),
    })
}

/// GET /messages?limit=N
/// Latest conversation messages, oldest first
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
    let messages = state
        .messages
        .recent_messages(limit)
        .next()
        .await
        .unwrap_or_default();
    Json(messages)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
