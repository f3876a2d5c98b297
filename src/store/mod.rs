pub mod local;

pub use local::LocalStore;

use crate::incident::Incident;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// An incident as held by the store, with its assigned document id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIncident {
    pub id: String,
    #[serde(flatten)]
    pub incident: Incident,
}

/// Fields the volunteer dashboard mutates when responding to an incident
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPatch {
    pub responded: bool,
    pub responded_at: Option<DateTime<Utc>>,
    pub responder_id: Option<String>,
}

impl IncidentPatch {
    pub fn responded_by(responder_id: &str) -> Self {
        Self {
            responded: true,
            responded_at: Some(Utc::now()),
            responder_id: Some(responder_id.to_string()),
        }
    }
}

/// Notification store seam
///
/// The capture pipeline only calls `create`; `subscribe` and `update` exist
/// for the volunteer-facing consumers. Delivery guarantees are the store's
/// concern, not the pipeline's.
#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new incident, returning its assigned id
    async fn create(&self, incident: Incident) -> Result<String>;

    /// Watch full snapshots of all incidents, ordered newest-first
    async fn subscribe(&self) -> watch::Receiver<Vec<StoredIncident>>;

    /// Apply a responded-state patch to one incident
    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<()>;
}
