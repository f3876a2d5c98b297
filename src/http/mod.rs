//! HTTP API for external control of the voice pipeline
//!
//! - POST /voice/start - Begin listening for trigger phrases
//! - POST /voice/stop - Tear everything down
//! - POST /voice/toggle - Skip to recording / force-stop a recording
//! - GET /voice/status - Current phase and any surfaced fault
//! - GET /incidents - Incident feed, newest first
//! - POST /incidents/:id/respond - Mark an incident responded
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
