use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Voice pipeline control
        .route("/voice/start", post(handlers::start_listening))
        .route("/voice/stop", post(handlers::stop_listening))
        .route("/voice/toggle", post(handlers::toggle_recording))
        .route("/voice/status", get(handlers::voice_status))
        // Incident feed
        .route("/incidents", get(handlers::list_incidents))
        .route("/incidents/:incident_id/respond", post(handlers::respond))
        // Request logging; CORS open for the web dashboard
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
