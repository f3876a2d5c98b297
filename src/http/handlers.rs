use super::state::AppState;
use crate::controller::ControllerStatus;
use crate::store::{IncidentPatch, StoredIncident};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub responder_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /voice/start
/// Begin listening for trigger phrases. No-op if already running.
pub async fn start_listening(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start requested over HTTP");

    if let Err(e) = state.controller.start().await {
        error!("Failed to start listening: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to start listening: {}", e),
            }),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(CommandResponse {
            status: "accepted".to_string(),
            message: "Listening for trigger phrases".to_string(),
        }),
    )
        .into_response()
}

/// POST /voice/stop
/// Tear down listening or recording; any in-flight recording is discarded.
pub async fn stop_listening(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested over HTTP");

    if let Err(e) = state.controller.stop().await {
        error!("Failed to stop: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to stop: {}", e),
            }),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(CommandResponse {
            status: "accepted".to_string(),
            message: "Voice pipeline stopped".to_string(),
        }),
    )
        .into_response()
}

/// POST /voice/toggle
/// Start recording immediately while listening, or finish a recording early.
pub async fn toggle_recording(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.controller.manual_toggle().await {
        error!("Failed to toggle recording: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to toggle recording: {}", e),
            }),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(CommandResponse {
            status: "accepted".to_string(),
            message: "Toggle accepted".to_string(),
        }),
    )
        .into_response()
}

/// GET /voice/status
/// Current controller phase plus any surfaced fault
pub async fn voice_status(State(state): State<AppState>) -> Json<ControllerStatus> {
    Json(state.controller.status())
}

/// GET /incidents
/// Stored incidents, newest first
pub async fn list_incidents(State(state): State<AppState>) -> Json<Vec<StoredIncident>> {
    let snapshot = state.store.subscribe().await.borrow().clone();
    Json(snapshot)
}

/// POST /incidents/:incident_id/respond
/// Mark an incident as responded to by a volunteer
pub async fn respond(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> impl IntoResponse {
    info!(
        "Incident {} marked responded by {}",
        incident_id, req.responder_id
    );

    match state
        .store
        .update(&incident_id, IncidentPatch::responded_by(&req.responder_id))
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(CommandResponse {
                status: "ok".to_string(),
                message: format!("Incident {} marked responded", incident_id),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Failed to update incident: {}", e),
            }),
        )
            .into_response(),
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
